use anyhow::Result;
use serde::Deserialize;
use std::path::Path;

/// A validation error in the configuration
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// API base URL, e.g. "https://plans.example.com"
    #[serde(default)]
    pub base_url: Option<String>,
    /// Bearer token sent with every request
    #[serde(default)]
    pub token: Option<String>,
    /// Environment variable to read the token from when `token` is unset
    #[serde(default)]
    pub token_env: Option<String>,
}

pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

impl Config {
    /// Load configuration from default paths
    /// Priority: project (.planctl/config.toml) > user (~/.planctl/config.toml)
    pub fn load() -> Result<Self> {
        let mut config = Config::default();

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".planctl").join("config.toml");
            if user_config.exists() {
                let user = Self::load_from(&user_config)?;
                config.merge(user);
            }
        }

        let project_config = Path::new(".planctl").join("config.toml");
        if project_config.exists() {
            let project = Self::load_from(&project_config)?;
            config.merge(project);
        }

        Ok(config)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Config) {
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.token.is_some() {
            self.token = other.token;
        }
        if other.token_env.is_some() {
            self.token_env = other.token_env;
        }
    }

    /// The configured base URL, or the local default
    pub fn resolve_base_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
    }

    /// Resolve the bearer token from config or environment, if any
    pub fn resolve_token(&self) -> Option<String> {
        // Direct token takes priority
        if let Some(token) = &self.token {
            return Some(token.clone());
        }

        if let Some(env_var) = &self.token_env {
            if let Ok(token) = std::env::var(env_var) {
                return Some(token);
            }
        }

        None
    }

    /// Validate configuration and return any errors found
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Some(base_url) = &self.base_url {
            if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
                errors.push(ValidationError {
                    field: "base_url".to_string(),
                    message: format!("Must start with http:// or https://, got '{}'", base_url),
                });
            }
        }

        if let Some(env_var) = &self.token_env {
            if env_var.is_empty() {
                errors.push(ValidationError {
                    field: "token_env".to_string(),
                    message: "Must not be empty".to_string(),
                });
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
