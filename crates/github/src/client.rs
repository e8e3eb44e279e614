use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use common::config::GithubConfig;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};

use crate::metrics;
use crate::models::{GraphqlResponse, PrStats, PullRequest};

#[derive(Debug, Error)]
pub enum GithubApiError {
    #[error("github api error: {status} for {endpoint}")]
    Http {
        status: StatusCode,
        endpoint: String,
    },
    #[error("github graphql error: {0}")]
    Graphql(String),
}

impl GithubApiError {
    pub fn status(status: StatusCode, endpoint: impl Into<String>) -> Self {
        Self::Http {
            status,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
pub trait GithubClient: Send + Sync {
    /// Search merged/open/closed PRs authored by `author` and created in
    /// the inclusive `[from, to]` date range.
    async fn search_prs(&self, author: &str, from: NaiveDate, to: NaiveDate)
        -> Result<Vec<PullRequest>>;

    /// Line-count and review-comment totals for one PR.
    async fn pr_stats(&self, owner: &str, repo: &str, number: u64) -> Result<PrStats>;

    /// Logins of the configured org's members.
    async fn org_members(&self) -> Result<Vec<String>>;
}

pub struct RestGithubClient {
    http: reqwest::Client,
    config: GithubConfig,
}

impl RestGithubClient {
    pub fn new(config: GithubConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { http, config })
    }

    fn token(&self) -> Option<&str> {
        self.config.token.as_deref()
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str, token: &str) -> Result<T> {
        let url = format!("{}/{}", self.config.api_base.trim_end_matches('/'), path);
        debug!(url = %url, "github GET");
        let response = self
            .http
            .get(&url)
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GithubApiError::status(status, path.to_string()).into());
        }
        Ok(response.json().await?)
    }

    async fn graphql(&self, query: &str, variables: serde_json::Value, token: &str) -> Result<GraphqlResponse> {
        let url = format!("{}/graphql", self.config.api_base.trim_end_matches('/'));
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(GithubApiError::status(status, "graphql").into());
        }
        let body: GraphqlResponse = response.json().await?;
        if !body.errors.is_empty() {
            return Err(GithubApiError::Graphql(
                serde_json::to_string(&body.errors).unwrap_or_default(),
            )
            .into());
        }
        Ok(body)
    }
}

const PR_SEARCH_QUERY: &str = r#"
query($q: String!, $cursor: String) {
  search(query: $q, type: ISSUE, first: 50, after: $cursor) {
    pageInfo { hasNextPage endCursor }
    nodes {
      ... on PullRequest {
        id
        number
        title
        url
        headRefName
        createdAt
        mergedAt
        closedAt
        state
        isDraft
        additions
        deletions
        repository { name owner { login } }
        reviews(first: 1) { nodes { submittedAt } }
        timelineItems(itemTypes: [READY_FOR_REVIEW_EVENT], first: 1) {
          nodes { ... on ReadyForReviewEvent { createdAt } }
        }
      }
    }
  }
}
"#;

#[derive(Debug, Deserialize)]
struct PullDetail {
    #[serde(default)]
    additions: i64,
    #[serde(default)]
    deletions: i64,
    #[serde(default)]
    review_comments: i64,
}

#[derive(Debug, Deserialize)]
struct MemberEntry {
    login: String,
}

#[async_trait]
impl GithubClient for RestGithubClient {
    async fn search_prs(
        &self,
        author: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<PullRequest>> {
        // Missing configuration degrades to empty data, not an error.
        let Some(token) = self.token() else {
            warn!("github token not configured, returning no pull requests");
            return Ok(Vec::new());
        };

        let search = format!("is:pr author:{author} created:{from}..{to}");
        let mut prs = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let variables = json!({ "q": search, "cursor": cursor });
            let result = self.graphql(PR_SEARCH_QUERY, variables, token).await;
            metrics::observe("search_prs", result.is_ok());
            let page = result?
                .data
                .ok_or_else(|| anyhow!("graphql response without data"))?
                .search;
            prs.extend(page.nodes.into_iter().map(PullRequest::from));
            if page.page_info.has_next_page {
                cursor = page.page_info.end_cursor;
            } else {
                break;
            }
        }
        Ok(prs)
    }

    async fn pr_stats(&self, owner: &str, repo: &str, number: u64) -> Result<PrStats> {
        let Some(token) = self.token() else {
            return Ok(PrStats::default());
        };
        let path = format!("repos/{owner}/{repo}/pulls/{number}");
        let result: Result<PullDetail> = self.get_json(&path, token).await;
        metrics::observe("pr_stats", result.is_ok());
        let detail = result?;
        Ok(PrStats {
            additions: detail.additions,
            deletions: detail.deletions,
            review_comments: detail.review_comments,
        })
    }

    async fn org_members(&self) -> Result<Vec<String>> {
        let (Some(token), Some(org)) = (self.token(), self.config.org.as_deref()) else {
            return Ok(Vec::new());
        };
        let mut members = Vec::new();
        let mut page = 1u32;
        loop {
            let path = format!("orgs/{org}/members?per_page=100&page={page}");
            let result: Result<Vec<MemberEntry>> = self.get_json(&path, token).await;
            metrics::observe("org_members", result.is_ok());
            let entries = result?;
            let len = entries.len();
            members.extend(entries.into_iter().map(|m| m.login));
            if len < 100 {
                break;
            }
            page += 1;
        }
        Ok(members)
    }
}
