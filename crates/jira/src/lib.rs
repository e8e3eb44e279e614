pub mod client;
pub mod fields;
pub mod metrics;
pub mod models;

pub use client::{JiraApiError, JiraClient, RestJiraClient};
pub use fields::FieldMap;
pub use models::{
    parse_jira_datetime, Changelog, History, HistoryItem, IssueFields, JiraIssue, JiraUser,
    Project, Sprint,
};
