//! Relay outcomes and their diagnostics.

use std::fmt;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Relay errors
#[derive(Error, Debug)]
pub enum RelayError {
    #[error("Failed to build HTTP client: {source}")]
    ClientBuild { source: reqwest::Error },

    #[error("Relay request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Relay request failed: {source}")]
    Transport { source: reqwest::Error },
}

/// Why no request was sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// No relay configured at all
    Disabled,
    /// Required settings are missing; every missing name is listed
    MissingConfig { fields: Vec<&'static str> },
    /// The project id is not purely numeric
    InvalidProjectId { value: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Disabled => f.write_str("relay disabled"),
            SkipReason::MissingConfig { fields } => {
                write!(f, "missing configuration: {}", fields.join(", "))
            }
            SkipReason::InvalidProjectId { value } => {
                write!(f, "project id '{}' must contain only digits", value)
            }
        }
    }
}

/// A response from the remote that was not the expected success status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// 401 from the pipeline trigger API
    AuthFailed { body: String },
    /// 403 from the pipeline trigger API
    Forbidden { body: String },
    /// 404 from the pipeline trigger API
    NotFound { body: String },
    /// Any other unexpected status
    Status { status: u16, body: String },
}

impl Rejection {
    pub fn status(&self) -> u16 {
        match self {
            Rejection::AuthFailed { .. } => 401,
            Rejection::Forbidden { .. } => 403,
            Rejection::NotFound { .. } => 404,
            Rejection::Status { status, .. } => *status,
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Rejection::AuthFailed { body }
            | Rejection::Forbidden { body }
            | Rejection::NotFound { body }
            | Rejection::Status { body, .. } => body,
        }
    }

    /// What an operator should look at.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Rejection::AuthFailed { .. } => {
                Some("authentication failed: check that the trigger token is valid and has not been revoked")
            }
            Rejection::Forbidden { .. } => {
                Some("forbidden: check that the trigger token is allowed to trigger pipelines on this project")
            }
            Rejection::NotFound { .. } => {
                Some("not found: check the project id and the GitLab base URL")
            }
            Rejection::Status { .. } => None,
        }
    }
}

/// Outcome of one dispatch.
#[derive(Debug)]
pub enum RelayResult {
    /// Remote answered with the expected success status
    Delivered { status: u16 },
    /// No request was made
    Skipped(SkipReason),
    /// Remote answered with another status
    Rejected(Rejection),
    /// The request never got a response
    Failed(RelayError),
}

impl RelayResult {
    pub fn is_delivered(&self) -> bool {
        matches!(self, RelayResult::Delivered { .. })
    }

    /// Record the outcome on the diagnostic stream.
    pub fn log(&self, mode: &'static str) {
        match self {
            RelayResult::Delivered { status } => {
                info!(mode, status, "Relay delivered");
            }
            RelayResult::Skipped(SkipReason::Disabled) => {
                debug!(mode, "Relay disabled, nothing forwarded");
            }
            RelayResult::Skipped(reason) => {
                warn!(mode, reason = %reason, "Relay skipped: {}", reason);
            }
            RelayResult::Rejected(rejection) => match rejection.hint() {
                Some(hint) => error!(
                    mode,
                    status = rejection.status(),
                    body = rejection.body(),
                    "Relay rejected: {}",
                    hint
                ),
                None => error!(
                    mode,
                    status = rejection.status(),
                    body = rejection.body(),
                    "Relay rejected with unexpected status {}",
                    rejection.status()
                ),
            },
            RelayResult::Failed(e) => {
                error!(mode, error = %e, "Relay failed");
            }
        }
    }
}
