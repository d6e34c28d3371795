//! Relay configuration
//!
//! Settings arrive once at startup (CLI flags with environment fallbacks)
//! and are resolved into a [`RelayConfig`], which never changes afterwards.

use std::fmt;
use std::time::Duration;

/// Hard bound on every outbound relay call.
pub const RELAY_TIMEOUT: Duration = Duration::from_secs(10);

/// Environment variable holding the generic relay endpoint.
pub const ENV_TARGET_URL: &str = "RELAY_TARGET_URL";
/// Environment variable holding the numeric GitLab project id.
pub const ENV_PROJECT_ID: &str = "GITLAB_PROJECT_ID";
/// Environment variable holding the pipeline trigger token.
pub const ENV_TRIGGER_TOKEN: &str = "GITLAB_TRIGGER_TOKEN";
/// Environment variable holding the ref the pipeline runs on.
pub const ENV_REF: &str = "GITLAB_REF";
/// Environment variable holding the GitLab base URL.
pub const ENV_BASE_URL: &str = "GITLAB_BASE_URL";
/// Environment variable disabling certificate validation for the trigger call.
pub const ENV_INSECURE_SKIP_TLS_VERIFY: &str = "GITLAB_INSECURE_SKIP_TLS_VERIFY";

/// A value that must never end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The raw value, for putting on the wire.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Raw relay settings as collected by the CLI.
#[derive(Debug, Clone, Default)]
pub struct RelaySettings {
    /// Generic relay endpoint
    pub target_url: Option<String>,
    /// GitLab project id (digits only)
    pub project_id: Option<String>,
    /// Pipeline trigger token
    pub trigger_token: Option<String>,
    /// Branch or tag the pipeline runs on
    pub ref_name: Option<String>,
    /// GitLab instance base URL
    pub base_url: Option<String>,
    /// Accept self-signed or otherwise invalid certificates on the trigger call
    pub insecure_skip_tls_verify: bool,
}

/// Generic JSON relay settings.
///
/// [`RelayConfig::resolve`] only builds this with a target set; an empty
/// target only comes from configs built by hand.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GenericRelayConfig {
    pub target_url: Option<String>,
}

/// GitLab pipeline trigger settings.
///
/// Fields stay optional here; they are checked on every dispatch so that a
/// misconfigured deployment keeps answering webhooks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PipelineRelayConfig {
    pub project_id: Option<String>,
    pub token: Option<Secret>,
    pub ref_name: Option<String>,
    pub base_url: Option<String>,
    pub accept_invalid_certs: bool,
}

/// Relay mode, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RelayConfig {
    /// Nothing configured; events are only acknowledged
    #[default]
    Disabled,
    /// POST the issue as JSON to a fixed endpoint
    Generic(GenericRelayConfig),
    /// Trigger a GitLab CI pipeline with the issue as variables
    Pipeline(PipelineRelayConfig),
}

impl RelayConfig {
    /// Pick the relay mode from raw settings.
    ///
    /// Blank values count as unset. Any pipeline setting selects the
    /// pipeline mode, even when a generic target is also present. With no
    /// pipeline setting and no target URL the result is `Disabled`, never
    /// `Generic` without a target, so an unset `RELAY_TARGET_URL` skips the
    /// relay as disabled rather than as missing configuration.
    pub fn resolve(settings: RelaySettings) -> Self {
        let project_id = non_blank(settings.project_id);
        let token = non_blank(settings.trigger_token).map(Secret::new);
        let ref_name = non_blank(settings.ref_name);
        let base_url = non_blank(settings.base_url);

        if project_id.is_some() || token.is_some() || ref_name.is_some() || base_url.is_some() {
            return RelayConfig::Pipeline(PipelineRelayConfig {
                project_id,
                token,
                ref_name,
                base_url,
                accept_invalid_certs: settings.insecure_skip_tls_verify,
            });
        }

        match non_blank(settings.target_url) {
            Some(target_url) => RelayConfig::Generic(GenericRelayConfig {
                target_url: Some(target_url),
            }),
            None => RelayConfig::Disabled,
        }
    }

    /// Short name of the mode for logs.
    pub fn mode(&self) -> &'static str {
        match self {
            RelayConfig::Disabled => "disabled",
            RelayConfig::Generic(_) => "generic",
            RelayConfig::Pipeline(_) => "pipeline",
        }
    }

    /// Whether certificate validation is turned off for outbound calls.
    pub fn accepts_invalid_certs(&self) -> bool {
        matches!(self, RelayConfig::Pipeline(pipeline) if pipeline.accept_invalid_certs)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
