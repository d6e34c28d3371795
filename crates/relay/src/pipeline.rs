//! GitLab pipeline trigger requests.
//!
//! Builds the trigger endpoint and form body from a [`PipelineRelayConfig`]
//! and maps the API's status codes onto [`RelayResult`]s.

use issue_relay_protocol::NormalizedIssue;

use crate::config::{
    PipelineRelayConfig, Secret, ENV_BASE_URL, ENV_PROJECT_ID, ENV_REF, ENV_TRIGGER_TOKEN,
};
use crate::outcome::{Rejection, RelayResult, SkipReason};

/// Pipeline variable carrying the issue number.
pub const VAR_ISSUE_NUMBER: &str = "variables[ISSUE_NUMBER]";
/// Pipeline variable carrying the issue description.
pub const VAR_ISSUE_DESCRIPTION: &str = "variables[ISSUE_DESCRIPTION]";
/// Pipeline variable carrying the issue title.
pub const VAR_ISSUE_TITLE: &str = "variables[ISSUE_TITLE]";
/// Pipeline variable carrying the issue action.
pub const VAR_ISSUE_ACTION: &str = "variables[ISSUE_ACTION]";
/// Pipeline variable carrying the assignee username.
pub const VAR_ASSIGNEE_USERNAME: &str = "variables[ASSIGNEE_USERNAME]";

/// A fully validated trigger destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerTarget<'a> {
    /// Complete trigger endpoint URL
    pub url: String,
    /// Trigger token
    pub token: &'a Secret,
    /// Ref the pipeline runs on
    pub ref_name: &'a str,
}

impl PipelineRelayConfig {
    /// Check the settings and build the trigger endpoint.
    ///
    /// Missing values are reported together; the project id format is only
    /// checked once everything is present.
    pub fn target(&self) -> Result<TriggerTarget<'_>, SkipReason> {
        let (project_id, token, ref_name, base_url) = match (
            self.project_id.as_deref(),
            self.token.as_ref(),
            self.ref_name.as_deref(),
            self.base_url.as_deref(),
        ) {
            (Some(project_id), Some(token), Some(ref_name), Some(base_url)) => {
                (project_id, token, ref_name, base_url)
            }
            _ => {
                return Err(SkipReason::MissingConfig {
                    fields: self.missing_fields(),
                })
            }
        };

        if project_id.is_empty() || !project_id.bytes().all(|b| b.is_ascii_digit()) {
            return Err(SkipReason::InvalidProjectId {
                value: project_id.to_string(),
            });
        }

        Ok(TriggerTarget {
            url: trigger_url(base_url, project_id),
            token,
            ref_name,
        })
    }

    fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.project_id.is_none() {
            missing.push(ENV_PROJECT_ID);
        }
        if self.token.is_none() {
            missing.push(ENV_TRIGGER_TOKEN);
        }
        if self.ref_name.is_none() {
            missing.push(ENV_REF);
        }
        if self.base_url.is_none() {
            missing.push(ENV_BASE_URL);
        }
        missing
    }
}

/// `{base_url}/api/v4/projects/{project_id}/trigger/pipeline`, without a doubled slash.
pub fn trigger_url(base_url: &str, project_id: &str) -> String {
    format!(
        "{}/api/v4/projects/{}/trigger/pipeline",
        base_url.trim_end_matches('/'),
        project_id
    )
}

/// Form fields for the trigger request.
pub fn trigger_form(target: &TriggerTarget<'_>, issue: &NormalizedIssue) -> Vec<(&'static str, String)> {
    vec![
        ("token", target.token.expose().to_string()),
        ("ref", target.ref_name.to_string()),
        (VAR_ISSUE_NUMBER, issue.number.to_string()),
        (VAR_ISSUE_DESCRIPTION, issue.description.clone()),
        (VAR_ISSUE_TITLE, issue.title.clone()),
        (VAR_ISSUE_ACTION, issue.action.clone()),
        (VAR_ASSIGNEE_USERNAME, issue.assignee.clone()),
    ]
}

/// Map a trigger API response onto a relay result.
pub fn classify_response(status: u16, body: String) -> RelayResult {
    match status {
        201 => RelayResult::Delivered { status },
        401 => RelayResult::Rejected(Rejection::AuthFailed { body }),
        403 => RelayResult::Rejected(Rejection::Forbidden { body }),
        404 => RelayResult::Rejected(Rejection::NotFound { body }),
        _ => RelayResult::Rejected(Rejection::Status { status, body }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use issue_relay_protocol::IssueNumber;

    fn full_config() -> PipelineRelayConfig {
        PipelineRelayConfig {
            project_id: Some("123".to_string()),
            token: Some(Secret::new("glptt-secret")),
            ref_name: Some("main".to_string()),
            base_url: Some("https://gitlab.example.com/".to_string()),
            accept_invalid_certs: false,
        }
    }

    #[test]
    fn test_trigger_url_strips_trailing_slash() {
        let config = full_config();
        let target = config.target().unwrap();
        assert_eq!(
            target.url,
            "https://gitlab.example.com/api/v4/projects/123/trigger/pipeline"
        );
        assert_eq!(target.ref_name, "main");

        assert_eq!(
            trigger_url("https://gitlab.example.com", "9"),
            "https://gitlab.example.com/api/v4/projects/9/trigger/pipeline"
        );
    }

    #[test]
    fn test_missing_values_reported_together() {
        let config = PipelineRelayConfig {
            project_id: Some("123".to_string()),
            ..Default::default()
        };

        assert_eq!(
            config.target().unwrap_err(),
            SkipReason::MissingConfig {
                fields: vec![ENV_TRIGGER_TOKEN, ENV_REF, ENV_BASE_URL],
            }
        );
    }

    #[test]
    fn test_non_numeric_project_id() {
        let config = PipelineRelayConfig {
            project_id: Some("abc".to_string()),
            ..full_config()
        };
        assert_eq!(
            config.target().unwrap_err(),
            SkipReason::InvalidProjectId {
                value: "abc".to_string()
            }
        );

        let namespaced = PipelineRelayConfig {
            project_id: Some("group/project".to_string()),
            ..full_config()
        };
        assert!(matches!(
            namespaced.target(),
            Err(SkipReason::InvalidProjectId { .. })
        ));
    }

    #[test]
    fn test_missing_takes_precedence_over_invalid_id() {
        let config = PipelineRelayConfig {
            project_id: Some("abc".to_string()),
            base_url: None,
            ..full_config()
        };
        assert_eq!(
            config.target().unwrap_err(),
            SkipReason::MissingConfig {
                fields: vec![ENV_BASE_URL],
            }
        );
    }

    #[test]
    fn test_form_carries_all_issue_fields() {
        let config = full_config();
        let target = config.target().unwrap();
        let issue = NormalizedIssue {
            number: IssueNumber::Iid(42),
            description: "Steps to reproduce".to_string(),
            title: "Crash on save".to_string(),
            action: "open".to_string(),
            assignee: "alice".to_string(),
        };

        let form = trigger_form(&target, &issue);
        let get = |key: &str| {
            form.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
        };

        assert_eq!(get("token"), Some("glptt-secret"));
        assert_eq!(get("ref"), Some("main"));
        assert_eq!(get(VAR_ISSUE_NUMBER), Some("42"));
        assert_eq!(get(VAR_ISSUE_DESCRIPTION), Some("Steps to reproduce"));
        assert_eq!(get(VAR_ISSUE_TITLE), Some("Crash on save"));
        assert_eq!(get(VAR_ISSUE_ACTION), Some("open"));
        assert_eq!(get(VAR_ASSIGNEE_USERNAME), Some("alice"));
    }

    #[test]
    fn test_classify_response() {
        assert!(classify_response(201, String::new()).is_delivered());
        assert!(matches!(
            classify_response(200, String::new()),
            RelayResult::Rejected(Rejection::Status { status: 200, .. })
        ));
        assert!(matches!(
            classify_response(401, String::new()),
            RelayResult::Rejected(Rejection::AuthFailed { .. })
        ));
        assert!(matches!(
            classify_response(403, String::new()),
            RelayResult::Rejected(Rejection::Forbidden { .. })
        ));
        assert!(matches!(
            classify_response(404, String::new()),
            RelayResult::Rejected(Rejection::NotFound { .. })
        ));
        match classify_response(500, "boom".to_string()) {
            RelayResult::Rejected(Rejection::Status { status, body }) => {
                assert_eq!(status, 500);
                assert_eq!(body, "boom");
            }
            other => panic!("unexpected result {other:?}"),
        }
    }
}
