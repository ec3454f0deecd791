mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use planctl::api::HttpApi;
use planctl::config::Config;
use planctl::store::PlanStore;

#[derive(Parser)]
#[command(name = "planctl", about = "Manage insurance plans via a remote plans API")]
pub struct Args {
    #[arg(long, env = "PLANCTL_BASE_URL", help = "API base URL (overrides config)")]
    pub base_url: Option<String>,

    #[arg(long, env = "PLANCTL_TOKEN", help = "Bearer token (overrides config)")]
    pub token: Option<String>,

    #[arg(long, help = "Config file path")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Debug output (log requests to stderr)")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List all plans
    List,
    /// Show a single plan
    Show {
        /// Plan ID
        id: i64,
    },
    /// Create a new plan
    Create {
        /// Plan label
        #[arg(long)]
        plan: String,
        /// Deductible amount
        #[arg(long)]
        deductible: i32,
        /// Co-pay amount
        #[arg(long = "co-pay")]
        co_pay: f64,
        /// User id or login
        #[arg(long)]
        user: String,
    },
    /// Update an existing plan (partial unless every field is given)
    Update {
        /// Plan ID
        id: i64,
        /// Plan label
        #[arg(long)]
        plan: Option<String>,
        /// Deductible amount
        #[arg(long)]
        deductible: Option<i32>,
        /// Co-pay amount
        #[arg(long = "co-pay")]
        co_pay: Option<f64>,
        /// User id or login
        #[arg(long)]
        user: Option<String>,
    },
    /// Delete a plan
    Delete {
        /// Plan ID
        id: i64,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// List selectable users
    Users,
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let filter = if args.debug {
        EnvFilter::new("planctl=debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cfg = if let Some(config_path) = &args.config {
        Config::load_from(config_path)?
    } else {
        Config::load().unwrap_or_default()
    };

    if let Err(errors) = cfg.validate() {
        for e in &errors {
            eprintln!("Config error: {}", e);
        }
        anyhow::bail!("invalid configuration");
    }

    let base_url = args
        .base_url
        .clone()
        .unwrap_or_else(|| cfg.resolve_base_url());
    let token = args.token.clone().or_else(|| cfg.resolve_token());

    let api = HttpApi::new(&base_url, token);
    let mut store = PlanStore::new(api);

    match args.command {
        Command::List => cli::list(&mut store),
        Command::Show { id } => cli::show(&mut store, id),
        Command::Create {
            plan,
            deductible,
            co_pay,
            user,
        } => cli::create(&mut store, plan, deductible, co_pay, &user),
        Command::Update {
            id,
            plan,
            deductible,
            co_pay,
            user,
        } => cli::update(&mut store, id, plan, deductible, co_pay, user),
        Command::Delete { id, yes } => cli::delete(&mut store, id, yes),
        Command::Users => cli::users(&mut store),
    }
}
