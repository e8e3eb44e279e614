use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use common::config::JiraConfig;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::metrics;
use crate::models::{
    DevStatusResponse, JiraIssue, JiraUser, Project, SearchResponse, Sprint, SprintIssuePage,
    SprintPage,
};

#[derive(Debug, Error)]
pub enum JiraApiError {
    #[error("jira api error: {status} for {endpoint}")]
    Http {
        status: StatusCode,
        endpoint: String,
    },
    #[error("jira is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait JiraClient: Send + Sync {
    /// Enhanced JQL search, paginated via continuation token.
    async fn search_issues(&self, jql: &str, expand_changelog: bool) -> Result<Vec<JiraIssue>>;

    /// One issue with its full changelog attached.
    async fn issue_with_changelog(&self, key: &str) -> Result<JiraIssue>;

    async fn list_projects(&self) -> Result<Vec<Project>>;
    async fn list_users(&self) -> Result<Vec<JiraUser>>;

    async fn board_sprints(&self, board_id: u64) -> Result<Vec<Sprint>>;
    async fn sprint(&self, sprint_id: u64) -> Result<Sprint>;
    async fn sprint_issues(&self, sprint_id: u64) -> Result<Vec<JiraIssue>>;

    /// PR URLs listed in the issue's dev-status panel.
    async fn dev_status_pull_requests(&self, issue_id: &str) -> Result<Vec<String>>;

    /// Subtasks of the given parent issues.
    async fn subtasks_of(&self, parent_keys: &[String]) -> Result<Vec<JiraIssue>>;
}

pub struct RestJiraClient {
    http: reqwest::Client,
    config: JiraConfig,
}

impl RestJiraClient {
    pub fn new(config: JiraConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    fn credentials(&self) -> Option<(&str, &str, &str)> {
        let base = self.config.base_url.as_deref()?;
        let token = self.config.api_token.as_deref()?;
        Some((base, self.config.email.as_str(), token))
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, op: &str, path: &str) -> Result<T> {
        let (base, email, token) = self
            .credentials()
            .ok_or(JiraApiError::NotConfigured)?;
        let url = format!("{}/{}", base.trim_end_matches('/'), path);
        debug!(url = %url, "jira GET");
        let result = async {
            let response = self
                .http
                .get(&url)
                .basic_auth(email, Some(token))
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(JiraApiError::Http {
                    status,
                    endpoint: path.to_string(),
                }
                .into());
            }
            Ok::<T, anyhow::Error>(response.json().await?)
        }
        .await;
        metrics::observe(op, result.is_ok());
        result
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        op: &str,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T> {
        let (base, email, token) = self
            .credentials()
            .ok_or(JiraApiError::NotConfigured)?;
        let url = format!("{}/{}", base.trim_end_matches('/'), path);
        debug!(url = %url, "jira POST");
        let result = async {
            let response = self
                .http
                .post(&url)
                .basic_auth(email, Some(token))
                .json(body)
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Err(JiraApiError::Http {
                    status,
                    endpoint: path.to_string(),
                }
                .into());
            }
            Ok::<T, anyhow::Error>(response.json().await?)
        }
        .await;
        metrics::observe(op, result.is_ok());
        result
    }

    fn configured(&self) -> bool {
        self.credentials().is_some()
    }
}

const ISSUE_FIELDS: &str = "summary,status,assignee,resolutiondate,created,updated,issuetype,parent,description,subtasks,*navigable";

#[async_trait]
impl JiraClient for RestJiraClient {
    async fn search_issues(&self, jql: &str, expand_changelog: bool) -> Result<Vec<JiraIssue>> {
        if !self.configured() {
            warn!("jira not configured, returning no issues");
            return Ok(Vec::new());
        }

        let mut issues = Vec::new();
        let mut next_page_token: Option<String> = None;
        loop {
            let mut body = json!({
                "jql": jql,
                "maxResults": 100,
                "fields": ["*navigable"],
            });
            if expand_changelog {
                body["expand"] = json!("changelog");
            }
            if let Some(token) = &next_page_token {
                body["nextPageToken"] = json!(token);
            }
            let page: SearchResponse = self
                .post_json("search_issues", "rest/api/3/search/jql", &body)
                .await?;
            issues.extend(page.issues);
            match page.next_page_token {
                Some(token) => next_page_token = Some(token),
                None => break,
            }
        }
        Ok(issues)
    }

    async fn issue_with_changelog(&self, key: &str) -> Result<JiraIssue> {
        let path = format!("rest/api/3/issue/{key}?expand=changelog&fields={ISSUE_FIELDS}");
        self.get_json("issue_changelog", &path).await
    }

    async fn list_projects(&self) -> Result<Vec<Project>> {
        if !self.configured() {
            return Ok(Vec::new());
        }
        #[derive(Deserialize)]
        struct ProjectPage {
            #[serde(default)]
            values: Vec<Project>,
            #[serde(rename = "isLast", default)]
            is_last: bool,
        }
        let mut projects = Vec::new();
        let mut start_at = 0u64;
        loop {
            let path = format!("rest/api/3/project/search?startAt={start_at}&maxResults=50");
            let page: ProjectPage = self.get_json("list_projects", &path).await?;
            let len = page.values.len() as u64;
            projects.extend(page.values);
            if page.is_last || len == 0 {
                break;
            }
            start_at += len;
        }
        Ok(projects)
    }

    async fn list_users(&self) -> Result<Vec<JiraUser>> {
        if !self.configured() {
            return Ok(Vec::new());
        }
        let max_results = 50usize;
        let mut start_at = 0usize;
        let mut users = Vec::new();
        loop {
            let path =
                format!("rest/api/3/users/search?startAt={start_at}&maxResults={max_results}");
            let page: Vec<JiraUser> = self.get_json("list_users", &path).await?;
            let len = page.len();
            users.extend(page);
            if len < max_results {
                break;
            }
            start_at += max_results;
        }
        Ok(users)
    }

    async fn board_sprints(&self, board_id: u64) -> Result<Vec<Sprint>> {
        if !self.configured() {
            return Ok(Vec::new());
        }
        let mut sprints = Vec::new();
        let mut start_at = 0u64;
        loop {
            let path = format!(
                "rest/agile/1.0/board/{board_id}/sprint?startAt={start_at}&maxResults=50"
            );
            let page: SprintPage = self.get_json("board_sprints", &path).await?;
            let len = page.values.len() as u64;
            sprints.extend(page.values);
            if page.is_last || len == 0 {
                break;
            }
            start_at += len;
        }
        Ok(sprints)
    }

    async fn sprint(&self, sprint_id: u64) -> Result<Sprint> {
        let path = format!("rest/agile/1.0/sprint/{sprint_id}");
        self.get_json("sprint", &path).await
    }

    async fn sprint_issues(&self, sprint_id: u64) -> Result<Vec<JiraIssue>> {
        if !self.configured() {
            return Ok(Vec::new());
        }
        let mut issues = Vec::new();
        let mut start_at = 0u64;
        loop {
            let path = format!(
                "rest/agile/1.0/sprint/{sprint_id}/issue?startAt={start_at}&maxResults=50&fields={ISSUE_FIELDS}"
            );
            let page: SprintIssuePage = self.get_json("sprint_issues", &path).await?;
            let len = page.issues.len() as u64;
            issues.extend(page.issues);
            if page.start_at + len >= page.total || len == 0 {
                break;
            }
            start_at = page.start_at + len;
        }
        Ok(issues)
    }

    async fn dev_status_pull_requests(&self, issue_id: &str) -> Result<Vec<String>> {
        let path = format!(
            "rest/dev-status/latest/issue/detail?issueId={issue_id}&applicationType=GitHub&dataType=pullrequest"
        );
        let response: DevStatusResponse = self.get_json("dev_status", &path).await?;
        Ok(response
            .detail
            .into_iter()
            .flat_map(|d| d.pull_requests)
            .map(|pr| pr.url)
            .collect())
    }

    async fn subtasks_of(&self, parent_keys: &[String]) -> Result<Vec<JiraIssue>> {
        if parent_keys.is_empty() || !self.configured() {
            return Ok(Vec::new());
        }
        let jql = format!("parent in ({})", parent_keys.join(","));
        self.search_issues(&jql, false).await
    }
}
