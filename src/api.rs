//! REST client for the plans API.

use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::model::{FieldError, Plan, UserRef};

/// Everything that can go wrong talking to the API, plus client-side
/// validation failures surfaced before a request is ever sent.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request failed: {0}")]
    Network(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("validation failed: {}", format_field_errors(.0))]
    Validation(Vec<FieldError>),

    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Trait for the plans API to allow mocking and abstraction
pub trait PlanApi {
    fn list_plans(&self) -> Result<Vec<Plan>, ApiError>;
    fn get_plan(&self, id: i64) -> Result<Plan, ApiError>;
    fn create_plan(&self, plan: &Plan) -> Result<Plan, ApiError>;
    fn update_plan(&self, plan: &Plan) -> Result<Plan, ApiError>;
    fn patch_plan(&self, plan: &Plan) -> Result<Plan, ApiError>;
    fn delete_plan(&self, id: i64) -> Result<(), ApiError>;
    fn list_users(&self) -> Result<Vec<UserRef>, ApiError>;
}

pub struct HttpApi {
    base_url: String,
    token: Option<String>,
    agent: ureq::Agent,
}

impl HttpApi {
    pub fn new(base_url: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            agent: ureq::Agent::new(),
        }
    }

    fn request(&self, method: &str, path: &str) -> ureq::Request {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.agent.request(method, &url);
        if let Some(token) = &self.token {
            req = req.set("Authorization", &format!("Bearer {}", token));
        }
        req
    }

    fn parse<T: DeserializeOwned>(resp: ureq::Response) -> Result<T, ApiError> {
        resp.into_json()
            .map_err(|e| ApiError::Network(format!("invalid response body: {}", e)))
    }

    fn map_err(what: &str, err: ureq::Error) -> ApiError {
        match err {
            ureq::Error::Status(404, _) => ApiError::NotFound(what.to_string()),
            ureq::Error::Status(code, resp) => ApiError::Server {
                status: code,
                message: resp.into_string().unwrap_or_default(),
            },
            ureq::Error::Transport(t) => ApiError::Network(t.to_string()),
        }
    }
}

impl PlanApi for HttpApi {
    fn list_plans(&self) -> Result<Vec<Plan>, ApiError> {
        debug!("requesting all plans");
        let resp = self
            .request("GET", "/api/plans")
            .call()
            .map_err(|e| Self::map_err("plans", e))?;
        Self::parse(resp)
    }

    fn get_plan(&self, id: i64) -> Result<Plan, ApiError> {
        debug!(id, "requesting plan");
        let resp = self
            .request("GET", &format!("/api/plans/{}", id))
            .call()
            .map_err(|e| Self::map_err(&format!("plan {}", id), e))?;
        Self::parse(resp)
    }

    fn create_plan(&self, plan: &Plan) -> Result<Plan, ApiError> {
        debug!("creating plan");
        let body = serde_json::to_value(plan)
            .map_err(|e| ApiError::Network(format!("failed to encode plan: {}", e)))?;
        let resp = self
            .request("POST", "/api/plans")
            .send_json(body)
            .map_err(|e| Self::map_err("plans", e))?;
        Self::parse(resp)
    }

    fn update_plan(&self, plan: &Plan) -> Result<Plan, ApiError> {
        let id = plan.id.unwrap_or_default();
        debug!(id, "updating plan");
        let body = serde_json::to_value(plan)
            .map_err(|e| ApiError::Network(format!("failed to encode plan: {}", e)))?;
        let resp = self
            .request("PUT", &format!("/api/plans/{}", id))
            .send_json(body)
            .map_err(|e| Self::map_err(&format!("plan {}", id), e))?;
        Self::parse(resp)
    }

    fn patch_plan(&self, plan: &Plan) -> Result<Plan, ApiError> {
        let id = plan.id.unwrap_or_default();
        debug!(id, "partially updating plan");
        let body = serde_json::to_string(plan)
            .map_err(|e| ApiError::Network(format!("failed to encode plan: {}", e)))?;
        // JHipster-style servers expect merge-patch for partial updates
        let resp = self
            .request("PATCH", &format!("/api/plans/{}", id))
            .set("Content-Type", "application/merge-patch+json")
            .send_string(&body)
            .map_err(|e| Self::map_err(&format!("plan {}", id), e))?;
        Self::parse(resp)
    }

    fn delete_plan(&self, id: i64) -> Result<(), ApiError> {
        debug!(id, "deleting plan");
        self.request("DELETE", &format!("/api/plans/{}", id))
            .call()
            .map_err(|e| Self::map_err(&format!("plan {}", id), e))?;
        Ok(())
    }

    fn list_users(&self) -> Result<Vec<UserRef>, ApiError> {
        debug!("requesting users");
        let resp = self
            .request("GET", "/api/users")
            .call()
            .map_err(|e| Self::map_err("users", e))?;
        Self::parse(resp)
    }
}
