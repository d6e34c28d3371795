//! Issue relay dispatcher
//!
//! This crate forwards normalized issues to a secondary system: a generic
//! JSON endpoint or the GitLab pipeline trigger API. Configuration is
//! resolved once and injected; dispatch never fails the caller.

pub mod config;
pub mod dispatch;
pub mod outcome;
pub mod pipeline;

// Re-export key types for easy access
pub use config::{
    GenericRelayConfig, PipelineRelayConfig, RelayConfig, RelaySettings, Secret, RELAY_TIMEOUT,
};
pub use dispatch::RelayDispatcher;
pub use outcome::{Rejection, RelayError, RelayResult, SkipReason};
pub use pipeline::{trigger_url, TriggerTarget};
