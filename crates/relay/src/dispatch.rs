//! Relay Dispatcher
//!
//! Forwards one normalized issue per accepted webhook, either as JSON to a
//! generic endpoint or as a GitLab pipeline trigger. Every outcome is
//! logged; none of them is an error for the caller.

use std::time::Duration;

use issue_relay_protocol::NormalizedIssue;
use reqwest::{Client, Response};

use crate::config::{GenericRelayConfig, PipelineRelayConfig, RelayConfig, ENV_TARGET_URL, RELAY_TIMEOUT};
use crate::outcome::{Rejection, RelayError, RelayResult, SkipReason};
use crate::pipeline::{classify_response, trigger_form};

/// Owns the relay configuration and the HTTP client built from it.
#[derive(Debug, Clone)]
pub struct RelayDispatcher {
    config: RelayConfig,
    client: Client,
    timeout: Duration,
}

impl RelayDispatcher {
    /// Build the dispatcher. The client is created once and reused.
    pub fn new(config: RelayConfig) -> Result<Self, RelayError> {
        Self::with_timeout(config, RELAY_TIMEOUT)
    }

    pub(crate) fn with_timeout(config: RelayConfig, timeout: Duration) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(config.accepts_invalid_certs())
            .build()
            .map_err(|source| RelayError::ClientBuild { source })?;

        Ok(Self {
            config,
            client,
            timeout,
        })
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Forward the issue according to the configured mode and log the outcome.
    pub async fn dispatch(&self, issue: &NormalizedIssue) -> RelayResult {
        let result = match &self.config {
            RelayConfig::Disabled => RelayResult::Skipped(SkipReason::Disabled),
            RelayConfig::Generic(generic) => self.send_generic(generic, issue).await,
            RelayConfig::Pipeline(pipeline) => self.send_pipeline(pipeline, issue).await,
        };

        result.log(self.config.mode());
        result
    }

    async fn send_generic(&self, config: &GenericRelayConfig, issue: &NormalizedIssue) -> RelayResult {
        let Some(target_url) = config.target_url.as_deref() else {
            return RelayResult::Skipped(SkipReason::MissingConfig {
                fields: vec![ENV_TARGET_URL],
            });
        };

        tracing::debug!(url = target_url, number = %issue.number, "Relaying issue as JSON");

        match self.client.post(target_url).json(issue).send().await {
            Ok(response) => {
                let (status, body) = read_response(response).await;
                if status == 200 {
                    RelayResult::Delivered { status }
                } else {
                    RelayResult::Rejected(Rejection::Status { status, body })
                }
            }
            Err(e) => RelayResult::Failed(self.transport_error(e)),
        }
    }

    async fn send_pipeline(&self, config: &PipelineRelayConfig, issue: &NormalizedIssue) -> RelayResult {
        let target = match config.target() {
            Ok(target) => target,
            Err(reason) => return RelayResult::Skipped(reason),
        };

        tracing::debug!(url = %target.url, ref_name = target.ref_name, number = %issue.number, "Triggering pipeline");

        let form = trigger_form(&target, issue);
        match self.client.post(&target.url).form(&form).send().await {
            Ok(response) => {
                let (status, body) = read_response(response).await;
                classify_response(status, body)
            }
            Err(e) => RelayResult::Failed(self.transport_error(e)),
        }
    }

    fn transport_error(&self, source: reqwest::Error) -> RelayError {
        if source.is_timeout() {
            RelayError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            RelayError::Transport { source }
        }
    }
}

async fn read_response(response: Response) -> (u16, String) {
    let status = response.status().as_u16();
    let body = match response.text().await {
        Ok(body) => body,
        Err(e) => {
            tracing::debug!(status, error = %e, "Failed to read relay response body");
            String::new()
        }
    };
    (status, body)
}
