//! Issue relay protocol types and event extraction
//!
//! This crate defines the inbound GitLab webhook document, the normalized
//! issue record derived from it, and the extractor that decides whether a
//! request is rejected, ignored or accepted for relay.

pub mod errors;
pub mod events;
pub mod issue;

pub use errors::ProtocolError;
pub use events::{extract, ExtractOutcome, InboundEvent, ISSUE_KIND};
pub use issue::{IssueNumber, NormalizedIssue};

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;
