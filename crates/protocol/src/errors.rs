//! Protocol errors module

use thiserror::Error;

/// Reasons an inbound webhook body is refused before any relay happens.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("No JSON payload")]
    EmptyPayload,

    #[error("Invalid JSON payload: {source}")]
    MalformedPayload { source: serde_json::Error },

    #[error("Invalid JSON payload: expected an object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("No issue data found")]
    MissingIssueData,
}

impl ProtocolError {
    /// Message returned to the webhook caller in the `error` field.
    ///
    /// Parser details stay in the logs; callers only see a fixed string.
    pub fn client_message(&self) -> &'static str {
        match self {
            ProtocolError::EmptyPayload => "No JSON payload",
            ProtocolError::MalformedPayload { .. } | ProtocolError::NotAnObject { .. } => {
                "Invalid JSON payload"
            }
            ProtocolError::MissingIssueData => "No issue data found",
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::MalformedPayload { source: err }
    }
}
