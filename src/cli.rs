//! Command handlers: the terminal rendition of the list view, detail view,
//! edit form, and delete-confirmation dialog.

use anyhow::{anyhow, Result};
use std::io::Write;

use planctl::api::PlanApi;
use planctl::model::{Plan, UserRef};
use planctl::store::{PlanStore, SaveOutcome};

pub fn list<A: PlanApi>(store: &mut PlanStore<A>) -> Result<()> {
    let plans = store.fetch_all()?;
    if plans.is_empty() {
        println!("No plans found");
        return Ok(());
    }

    println!(
        "{:<6} {:<20} {:>10} {:>8}  {}",
        "ID", "PLAN", "DEDUCTIBLE", "CO-PAY", "USER"
    );
    for plan in plans {
        println!(
            "{:<6} {:<20} {:>10} {:>8}  {}",
            plan.id.map(|id| id.to_string()).unwrap_or_default(),
            plan.plan.as_deref().unwrap_or(""),
            plan.deductible.map(|d| d.to_string()).unwrap_or_default(),
            plan.co_pay.map(|c| format!("{:.2}", c)).unwrap_or_default(),
            plan.user.as_ref().map(|u| u.display()).unwrap_or_default(),
        );
    }
    Ok(())
}

pub fn show<A: PlanApi>(store: &mut PlanStore<A>, id: i64) -> Result<()> {
    let plan = store.fetch_one(id)?;
    println!("Plan {}", id);
    println!("  Plan:       {}", plan.plan.as_deref().unwrap_or(""));
    println!(
        "  Deductible: {}",
        plan.deductible.map(|d| d.to_string()).unwrap_or_default()
    );
    println!(
        "  Co-Pay:     {}",
        plan.co_pay.map(|c| format!("{:.2}", c)).unwrap_or_default()
    );
    println!(
        "  User:       {}",
        plan.user.as_ref().map(|u| u.display()).unwrap_or_default()
    );
    Ok(())
}

pub fn create<A: PlanApi>(
    store: &mut PlanStore<A>,
    label: String,
    deductible: i32,
    co_pay: f64,
    user_arg: &str,
) -> Result<()> {
    let user = resolve_user(store, user_arg)?;
    let draft = Plan {
        id: None,
        plan: Some(label),
        deductible: Some(deductible),
        co_pay: Some(co_pay),
        user: Some(user),
    };

    match store.create(draft)? {
        SaveOutcome::Created(plan) => {
            println!("Created plan {}", plan.id.unwrap_or_default());
        }
        other => return Err(anyhow!("unexpected save outcome: {:?}", other)),
    }
    Ok(())
}

pub fn update<A: PlanApi>(
    store: &mut PlanStore<A>,
    id: i64,
    label: Option<String>,
    deductible: Option<i32>,
    co_pay: Option<f64>,
    user_arg: Option<String>,
) -> Result<()> {
    if label.is_none() && deductible.is_none() && co_pay.is_none() && user_arg.is_none() {
        return Err(anyhow!(
            "nothing to update: pass at least one of --plan, --deductible, --co-pay, --user"
        ));
    }

    let user = match user_arg {
        Some(arg) => Some(resolve_user(store, &arg)?),
        None => None,
    };
    let record = Plan {
        id: Some(id),
        plan: label,
        deductible,
        co_pay,
        user,
    };

    // All fields present means a full replace; otherwise merge on the server
    let full = record.plan.is_some()
        && record.deductible.is_some()
        && record.co_pay.is_some()
        && record.user.is_some();
    if full {
        store.update(record)?;
    } else {
        store.partial_update(record)?;
    }

    println!("Updated plan {}", id);
    Ok(())
}

pub fn delete<A: PlanApi>(store: &mut PlanStore<A>, id: i64, yes: bool) -> Result<()> {
    if !yes {
        let label = {
            let plan = store.fetch_one(id)?;
            plan.plan.clone().unwrap_or_default()
        };
        print!(
            "Are you sure you want to delete plan {} (\"{}\")? [y/N] ",
            id, label
        );
        std::io::stdout().flush()?;

        let mut line = String::new();
        std::io::stdin().read_line(&mut line)?;
        if !matches!(line.trim().to_lowercase().as_str(), "y" | "yes") {
            println!("Aborted");
            return Ok(());
        }
    }

    store.delete(id)?;
    println!("Deleted plan {}", id);
    Ok(())
}

pub fn users<A: PlanApi>(store: &mut PlanStore<A>) -> Result<()> {
    let users = store.fetch_users()?;
    if users.is_empty() {
        println!("No users found");
        return Ok(());
    }

    println!("{:<6} {}", "ID", "LOGIN");
    for user in users {
        println!("{:<6} {}", user.id, user.login.as_deref().unwrap_or(""));
    }
    Ok(())
}

/// Accepts a numeric user id directly, or looks a login up in the user list
fn resolve_user<A: PlanApi>(store: &mut PlanStore<A>, arg: &str) -> Result<UserRef> {
    if let Ok(id) = arg.parse::<i64>() {
        return Ok(UserRef::by_id(id));
    }

    let users = store.fetch_users()?;
    users
        .iter()
        .find(|u| u.login.as_deref() == Some(arg))
        .cloned()
        .ok_or_else(|| anyhow!("no user with login '{}'", arg))
}
