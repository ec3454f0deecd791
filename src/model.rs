//! Domain records exchanged with the plans API.

use serde::{Deserialize, Serialize};

/// A problem with a single field, reported before any request is sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]: {}", self.field, self.message)
    }
}

/// Reference to a user, resolved to a display login when the server sends one
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct UserRef {
    pub id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login: Option<String>,
}

impl UserRef {
    pub fn by_id(id: i64) -> Self {
        Self { id, login: None }
    }

    /// Display login, falling back to the numeric id
    pub fn display(&self) -> String {
        match &self.login {
            Some(login) => login.clone(),
            None => self.id.to_string(),
        }
    }
}

/// An insurance plan.
///
/// Every field is optional on the wire; a record without an `id` is an
/// unsaved draft. `Plan::default()` is the empty draft the detail slot of
/// the store holds between edits.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Plan {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deductible: Option<i32>,
    #[serde(default, rename = "coPay", skip_serializing_if = "Option::is_none")]
    pub co_pay: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserRef>,
}

impl Plan {
    /// True if this record has never been persisted
    pub fn is_draft(&self) -> bool {
        self.id.is_none()
    }

    /// Check that every field required for a full save is present.
    /// Returns one error per missing field so a form can annotate inline.
    pub fn validate(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        match &self.plan {
            None => errors.push(FieldError::new("plan", "This field is required.")),
            Some(label) if label.trim().is_empty() => {
                errors.push(FieldError::new("plan", "This field is required."))
            }
            Some(_) => {}
        }

        if self.deductible.is_none() {
            errors.push(FieldError::new("deductible", "This field is required."));
        }

        if self.co_pay.is_none() {
            errors.push(FieldError::new("coPay", "This field is required."));
        }

        if self.user.is_none() {
            errors.push(FieldError::new("user", "This field is required."));
        }

        errors
    }

    /// Check a partial update: only the fields that are present are sent,
    /// but a present label must still be non-empty.
    pub fn validate_partial(&self) -> Vec<FieldError> {
        let mut errors = Vec::new();

        if let Some(label) = &self.plan {
            if label.trim().is_empty() {
                errors.push(FieldError::new("plan", "This field is required."));
            }
        }

        errors
    }
}
