//! Normalized issue record.
//!
//! A [`NormalizedIssue`] is the fixed set of fields pulled out of a GitLab
//! issue hook. Every field has a named default so a sparse payload still
//! produces a complete record.

use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::fmt;

/// Default for a missing issue number.
pub const DEFAULT_NUMBER: &str = "N/A";
/// Default for a missing description.
pub const DEFAULT_DESCRIPTION: &str = "No description";
/// Default for a missing title.
pub const DEFAULT_TITLE: &str = "No title";
/// Default for a missing action.
pub const DEFAULT_ACTION: &str = "unknown";
/// Default when nobody is assigned.
pub const DEFAULT_ASSIGNEE: &str = "No assignee";

/// Project-scoped issue number (`iid`), or the `N/A` sentinel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueNumber {
    /// Number reported by the payload
    Iid(i64),
    /// No usable number in the payload
    Missing,
}

impl IssueNumber {
    fn from_value(value: Option<&Value>) -> Self {
        value
            .and_then(Value::as_i64)
            .map(IssueNumber::Iid)
            .unwrap_or(IssueNumber::Missing)
    }
}

impl fmt::Display for IssueNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IssueNumber::Iid(iid) => write!(f, "{}", iid),
            IssueNumber::Missing => f.write_str(DEFAULT_NUMBER),
        }
    }
}

impl Serialize for IssueNumber {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            IssueNumber::Iid(iid) => serializer.serialize_i64(*iid),
            IssueNumber::Missing => serializer.serialize_str(DEFAULT_NUMBER),
        }
    }
}

/// Fields extracted from an issue event.
///
/// Serializes to the JSON body used by the generic relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedIssue {
    /// Issue number within its project
    #[serde(rename = "issue_number")]
    pub number: IssueNumber,
    /// Issue body text
    pub description: String,
    /// Issue title
    pub title: String,
    /// What happened (`open`, `close`, `update`, ...)
    pub action: String,
    /// Username of the first assignee
    pub assignee: String,
}

impl NormalizedIssue {
    /// Build the record from the payload root and its `object_attributes`.
    pub fn from_parts(root: &Map<String, Value>, attributes: &Map<String, Value>) -> Self {
        Self {
            number: IssueNumber::from_value(attributes.get("iid")),
            description: string_or(attributes, "description", DEFAULT_DESCRIPTION),
            title: string_or(attributes, "title", DEFAULT_TITLE),
            action: string_or(attributes, "action", DEFAULT_ACTION),
            assignee: resolve_assignee(root),
        }
    }
}

fn string_or(map: &Map<String, Value>, key: &str, default: &str) -> String {
    map.get(key)
        .and_then(Value::as_str)
        .unwrap_or(default)
        .to_string()
}

/// `assignees[0].username` wins over `assignee.username`.
///
/// GitLab has shipped both shapes; which one is authoritative is not
/// documented, so the list is preferred when it is non-empty.
fn resolve_assignee(root: &Map<String, Value>) -> String {
    let from_list = root
        .get("assignees")
        .and_then(Value::as_array)
        .and_then(|list| list.first());

    let candidate = match from_list {
        Some(first) => Some(first),
        None => root.get("assignee").filter(|value| value.is_object()),
    };

    candidate
        .and_then(|assignee| assignee.get("username"))
        .and_then(Value::as_str)
        .unwrap_or(DEFAULT_ASSIGNEE)
        .to_string()
}
