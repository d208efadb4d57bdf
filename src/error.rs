// Error types for stores and external collaborators

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

/// One violated config rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub field: String,
    pub message: String,
}

impl Violation {
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

fn format_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(|v| format!("{}: {}", v.field, v.message))
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    /// Every violated rule, not just the first.
    #[error("validation failed: {}", format_violations(.0))]
    Validation(Vec<Violation>),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub fn violations(&self) -> &[Violation] {
        match self {
            StoreError::Validation(v) => v,
            _ => &[],
        }
    }
}

/// Failure talking to the actuator, silencer, fleet inventory or provisioner.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("not configured: {0}")]
    Unconfigured(String),

    #[error("{0}")]
    Other(String),
}

/// Failure to refresh a service's switch from its fleet size.
#[derive(Debug, Error)]
pub enum ObserveError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("fleet size unavailable: {0}")]
    Fleet(#[from] CollaboratorError),
}
