//! Inbound webhook event definitions and extraction.
//!
//! The inbound document is kept as an untyped JSON tree; only the handful of
//! fields the relay cares about are read, each through a defaulting accessor.

use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::errors::ProtocolError;
use crate::issue::NormalizedIssue;
use crate::Result;

/// `object_kind` value of issue events.
pub const ISSUE_KIND: &str = "issue";

/// A decoded webhook body.
#[derive(Debug, Clone)]
pub struct InboundEvent {
    root: Map<String, Value>,
}

impl InboundEvent {
    /// Decode a raw request body.
    ///
    /// Empty bodies, `null` and `{}` count as "no payload"; anything that
    /// is not a JSON object is malformed.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        if raw.iter().all(u8::is_ascii_whitespace) {
            return Err(ProtocolError::EmptyPayload);
        }

        match serde_json::from_slice::<Value>(raw)? {
            Value::Null => Err(ProtocolError::EmptyPayload),
            Value::Object(root) if root.is_empty() => Err(ProtocolError::EmptyPayload),
            Value::Object(root) => Ok(Self { root }),
            other => Err(ProtocolError::NotAnObject {
                found: json_type_name(&other),
            }),
        }
    }

    /// Event category as sent. A missing field reads as `""`; an explicit
    /// `null` or a non-string value is kept as is.
    pub fn kind(&self) -> Value {
        self.root
            .get("object_kind")
            .cloned()
            .unwrap_or_else(|| Value::String(String::new()))
    }

    /// Whether this is an issue event.
    pub fn is_issue(&self) -> bool {
        matches!(self.root.get("object_kind"), Some(Value::String(kind)) if kind == ISSUE_KIND)
    }

    /// The `object_attributes` bag, if present as a non-empty object.
    pub fn attributes(&self) -> Option<&Map<String, Value>> {
        self.root
            .get("object_attributes")
            .and_then(Value::as_object)
            .filter(|attributes| !attributes.is_empty())
    }

    /// Normalize an issue event; fails when the attribute bag is missing.
    pub fn to_issue(&self) -> Result<NormalizedIssue> {
        let attributes = self.attributes().ok_or(ProtocolError::MissingIssueData)?;
        Ok(NormalizedIssue::from_parts(&self.root, attributes))
    }
}

/// Result of running the extractor over one request body.
#[derive(Debug)]
pub enum ExtractOutcome {
    /// Refused; answered with a client error
    Rejected(ProtocolError),
    /// Not an issue event; acknowledged with the observed kind
    Ignored(Value),
    /// Issue event ready for relay
    Accepted(NormalizedIssue),
}

/// Run the extractor over a raw request body.
pub fn extract(raw: &[u8]) -> ExtractOutcome {
    let event = match InboundEvent::parse(raw) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "Rejected webhook payload");
            return ExtractOutcome::Rejected(e);
        }
    };

    if !event.is_issue() {
        let kind = event.kind();
        let label = match &kind {
            Value::String(kind) => kind.clone(),
            other => other.to_string(),
        };
        info!(kind = %label, "Received webhook of type: {}", label);
        return ExtractOutcome::Ignored(kind);
    }

    match event.to_issue() {
        Ok(issue) => {
            info!(
                number = %issue.number,
                title = %issue.title,
                action = %issue.action,
                assignee = %issue.assignee,
                description = %issue.description,
                "Issue #{} {}: {}",
                issue.number,
                issue.action,
                issue.title
            );
            ExtractOutcome::Accepted(issue)
        }
        Err(e) => {
            warn!(error = %e, "Issue event without object_attributes");
            ExtractOutcome::Rejected(e)
        }
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
