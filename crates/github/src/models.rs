use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrState {
    Open,
    Closed,
    Merged,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepoRef {
    pub owner: String,
    pub name: String,
}

/// A pull request as fetched from the search API. Immutable once fetched;
/// lives for one request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub id: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    pub head_ref: String,
    pub created_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub state: PrState,
    pub is_draft: bool,
    pub additions: i64,
    pub deletions: i64,
    pub repo: RepoRef,
    pub first_review_at: Option<DateTime<Utc>>,
    pub ready_for_review_at: Option<DateTime<Utc>>,
    /// Issue keys matched against the PR title, filled in by the linker.
    #[serde(default)]
    pub issue_keys: Vec<String>,
}

/// Line-count and review-comment totals for a single PR.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct PrStats {
    pub additions: i64,
    pub deletions: i64,
    pub review_comments: i64,
}

/// Parse `owner`, `repo` and PR number out of a GitHub PR html URL,
/// e.g. `https://github.com/acme/widgets/pull/42`.
pub fn parse_pr_url(url: &str) -> Option<(String, String, u64)> {
    let parsed = url::Url::parse(url).ok()?;
    let mut segments = parsed.path_segments()?;
    let owner = segments.next()?.to_string();
    let repo = segments.next()?.to_string();
    if segments.next()? != "pull" {
        return None;
    }
    let number = segments.next()?.parse().ok()?;
    if owner.is_empty() || repo.is_empty() {
        return None;
    }
    Some((owner, repo, number))
}

// ---- GraphQL search payloads ----

#[derive(Debug, Deserialize)]
pub(crate) struct GraphqlResponse {
    pub data: Option<SearchData>,
    #[serde(default)]
    pub errors: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchData {
    pub search: SearchPage,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SearchPage {
    pub page_info: PageInfo,
    #[serde(default)]
    pub nodes: Vec<PrNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfo {
    pub has_next_page: bool,
    pub end_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PrNode {
    pub id: String,
    pub number: u64,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub head_ref_name: String,
    pub created_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub state: PrState,
    pub is_draft: bool,
    #[serde(default)]
    pub additions: i64,
    #[serde(default)]
    pub deletions: i64,
    pub repository: RepoNode,
    pub reviews: Option<ReviewNodes>,
    pub timeline_items: Option<TimelineNodes>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RepoNode {
    pub name: String,
    pub owner: OwnerNode,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OwnerNode {
    pub login: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReviewNodes {
    #[serde(default)]
    pub nodes: Vec<ReviewNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ReviewNode {
    pub submitted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TimelineNodes {
    #[serde(default)]
    pub nodes: Vec<TimelineNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TimelineNode {
    pub created_at: Option<DateTime<Utc>>,
}

impl From<PrNode> for PullRequest {
    fn from(node: PrNode) -> Self {
        let first_review_at = node
            .reviews
            .as_ref()
            .and_then(|r| r.nodes.first())
            .and_then(|r| r.submitted_at);
        let ready_for_review_at = node
            .timeline_items
            .as_ref()
            .and_then(|t| t.nodes.first())
            .and_then(|t| t.created_at);
        Self {
            id: node.id,
            number: node.number,
            title: node.title,
            url: node.url,
            head_ref: node.head_ref_name,
            created_at: node.created_at,
            merged_at: node.merged_at,
            closed_at: node.closed_at,
            state: node.state,
            is_draft: node.is_draft,
            additions: node.additions,
            deletions: node.deletions,
            repo: RepoRef {
                owner: node.repository.owner.login,
                name: node.repository.name,
            },
            first_review_at,
            ready_for_review_at,
            issue_keys: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pr_url() {
        let (owner, repo, number) =
            parse_pr_url("https://github.com/acme/widgets/pull/42").unwrap();
        assert_eq!(owner, "acme");
        assert_eq!(repo, "widgets");
        assert_eq!(number, 42);
    }

    #[test]
    fn rejects_non_pr_urls() {
        assert!(parse_pr_url("https://github.com/acme/widgets/issues/42").is_none());
        assert!(parse_pr_url("https://github.com/acme").is_none());
        assert!(parse_pr_url("not a url").is_none());
    }

    #[test]
    fn pr_node_converts_with_nested_timestamps() {
        let raw = serde_json::json!({
            "id": "PR_1",
            "number": 7,
            "title": "PROJ-12 fix the widget",
            "url": "https://github.com/acme/widgets/pull/7",
            "headRefName": "fix/widget",
            "createdAt": "2024-05-01T10:00:00Z",
            "mergedAt": null,
            "closedAt": null,
            "state": "OPEN",
            "isDraft": false,
            "additions": 10,
            "deletions": 2,
            "repository": {"name": "widgets", "owner": {"login": "acme"}},
            "reviews": {"nodes": [{"submittedAt": "2024-05-01T12:00:00Z"}]},
            "timelineItems": {"nodes": []}
        });
        let node: PrNode = serde_json::from_value(raw).unwrap();
        let pr = PullRequest::from(node);
        assert_eq!(pr.repo.owner, "acme");
        assert!(pr.first_review_at.is_some());
        assert!(pr.ready_for_review_at.is_none());
    }
}
