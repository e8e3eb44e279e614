use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Jira cloud timestamps come back as `2024-01-15T10:30:00.000+0000`,
/// which is close to but not quite RFC 3339.
pub fn parse_jira_datetime(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.3f%z")
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraIssue {
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub fields: IssueFields,
    #[serde(default)]
    pub changelog: Option<Changelog>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IssueFields {
    pub summary: Option<String>,
    pub status: Option<NameRef>,
    pub assignee: Option<UserRef>,
    #[serde(rename = "resolutiondate")]
    pub resolution_date: Option<String>,
    pub created: Option<String>,
    #[serde(rename = "issuetype")]
    pub issue_type: Option<NameRef>,
    pub parent: Option<ParentRef>,
    #[serde(default)]
    pub subtasks: Vec<SubtaskRef>,
    /// Custom fields keep their raw JSON here; typed access goes through
    /// [`crate::fields::FieldMap`].
    #[serde(flatten)]
    pub custom: serde_json::Map<String, serde_json::Value>,
}

impl IssueFields {
    pub fn status_name(&self) -> Option<&str> {
        self.status.as_ref().map(|s| s.name.as_str())
    }

    pub fn assignee_name(&self) -> Option<&str> {
        self.assignee.as_ref().map(|a| a.display_name.as_str())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created.as_deref().and_then(parse_jira_datetime)
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolution_date
            .as_deref()
            .and_then(parse_jira_datetime)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NameRef {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRef {
    #[serde(default)]
    pub account_id: Option<String>,
    pub display_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ParentRef {
    pub key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubtaskRef {
    pub id: String,
    pub key: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Changelog {
    #[serde(default)]
    pub histories: Vec<History>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct History {
    pub created: String,
    #[serde(default)]
    pub author: Option<HistoryAuthor>,
    #[serde(default)]
    pub items: Vec<HistoryItem>,
}

impl History {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_jira_datetime(&self.created)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryAuthor {
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HistoryItem {
    pub field: String,
    #[serde(default)]
    pub from: Option<String>,
    #[serde(rename = "fromString", default)]
    pub from_display: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(rename = "toString", default)]
    pub to_display: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    #[serde(default)]
    pub complete_date: Option<String>,
}

impl Sprint {
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.start_date.as_deref().and_then(parse_jira_datetime)
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        self.end_date.as_deref().and_then(parse_jira_datetime)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Project {
    pub id: String,
    pub key: String,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraUser {
    pub account_id: String,
    pub display_name: String,
    #[serde(default)]
    pub active: bool,
}

// ---- wire envelopes ----

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub issues: Vec<JiraIssue>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SprintPage {
    #[serde(default)]
    pub values: Vec<Sprint>,
    #[serde(default)]
    pub is_last: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SprintIssuePage {
    #[serde(default)]
    pub issues: Vec<JiraIssue>,
    #[serde(default)]
    pub start_at: u64,
    #[serde(default)]
    pub max_results: u64,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DevStatusResponse {
    #[serde(default)]
    pub detail: Vec<DevStatusDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct DevStatusDetail {
    #[serde(default)]
    pub pull_requests: Vec<DevStatusPr>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DevStatusPr {
    pub url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_jira_offset_timestamp() {
        let dt = parse_jira_datetime("2024-01-15T10:30:00.000+0000").unwrap();
        assert_eq!(dt.hour(), 10);
    }

    #[test]
    fn parses_rfc3339_timestamp() {
        assert!(parse_jira_datetime("2024-01-15T10:30:00Z").is_some());
    }

    #[test]
    fn rejects_garbage_timestamp() {
        assert!(parse_jira_datetime("yesterday").is_none());
    }

    #[test]
    fn custom_fields_land_in_the_flattened_bag() {
        let raw = serde_json::json!({
            "id": "10001",
            "key": "PROJ-1",
            "fields": {
                "summary": "Widget",
                "status": {"name": "In Progress"},
                "customfield_10016": 5.0
            }
        });
        let issue: JiraIssue = serde_json::from_value(raw).unwrap();
        assert_eq!(issue.fields.status_name(), Some("In Progress"));
        assert_eq!(
            issue.fields.custom.get("customfield_10016"),
            Some(&serde_json::json!(5.0))
        );
    }
}
