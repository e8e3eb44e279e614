use std::collections::{HashMap, HashSet};

use common::fanout::bounded_map;
use github::models::{parse_pr_url, PrStats, PullRequest};
use github::GithubClient;
use jira::models::JiraIssue;
use jira::JiraClient;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::debug;

static KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z][A-Z0-9]+-\d+\b").expect("invalid key regex"));

/// Issue-key-looking tokens in a PR title, uppercased and deduped.
pub fn candidate_keys(title: &str) -> Vec<String> {
    let upper = title.to_uppercase();
    let mut seen = HashSet::new();
    KEY_RE
        .find_iter(&upper)
        .map(|m| m.as_str().to_string())
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Keys from `known` that occur in the PR title. `known` holds uppercase
/// keys. Matching is deliberately whole-token, not substring: PROJ-1
/// must never link a title that only mentions PROJ-12.
pub fn match_title_keys(title: &str, known: &HashSet<String>) -> Vec<String> {
    candidate_keys(title)
        .into_iter()
        .filter(|key| known.contains(key))
        .collect()
}

/// Title-matching linker pass: attach every known issue key found in each
/// PR's title.
pub fn attach_issue_keys(prs: &mut [PullRequest], known: &HashSet<String>) {
    for pr in prs {
        pr.issue_keys = match_title_keys(&pr.title, known);
    }
}

/// PR URLs and aggregated line/comment totals folded onto a parent issue
/// (subtask PRs included).
#[derive(Debug, Clone, Default, Serialize)]
pub struct LinkedPrStats {
    pub urls: Vec<String>,
    pub additions: i64,
    pub deletions: i64,
    pub review_comments: i64,
}

/// Dev-status linker pass: collect linked PR URLs for each parent issue
/// and its subtasks, then batch-fetch line counts for the URL union with a
/// bounded fan-out. Lookups that fail degrade to zero contributions and a
/// warning, never a hard failure.
pub async fn link_dev_status_prs(
    jira: &dyn JiraClient,
    github: &dyn GithubClient,
    parents: &[JiraIssue],
    batch: usize,
) -> (HashMap<String, LinkedPrStats>, Vec<String>) {
    let mut warnings = Vec::new();

    let parent_keys: Vec<String> = parents.iter().map(|i| i.key.clone()).collect();
    let subtasks = match jira.subtasks_of(&parent_keys).await {
        Ok(subtasks) => subtasks,
        Err(err) => {
            warnings.push(format!("subtask lookup failed: {err}"));
            Vec::new()
        }
    };

    // issue id -> parent key, covering both parents and their subtasks
    let mut id_to_parent: Vec<(String, String)> = parents
        .iter()
        .map(|i| (i.id.clone(), i.key.clone()))
        .collect();
    for subtask in &subtasks {
        if let Some(parent) = subtask.fields.parent.as_ref() {
            if parent_keys.contains(&parent.key) {
                id_to_parent.push((subtask.id.clone(), parent.key.clone()));
            }
        }
    }

    let mut linked: HashMap<String, LinkedPrStats> = HashMap::new();
    for (issue_id, parent_key) in &id_to_parent {
        match jira.dev_status_pull_requests(issue_id).await {
            Ok(urls) => {
                let entry = linked.entry(parent_key.clone()).or_default();
                for url in urls {
                    if !entry.urls.contains(&url) {
                        entry.urls.push(url);
                    }
                }
            }
            Err(err) => {
                debug!(issue_id = %issue_id, error = %err, "dev-status lookup failed");
                warnings.push(format!("dev-status lookup failed for issue {issue_id}: {err}"));
            }
        }
    }

    // One stats fetch per distinct URL across all parents.
    let mut unique_urls: Vec<String> = Vec::new();
    for stats in linked.values() {
        for url in &stats.urls {
            if !unique_urls.contains(url) {
                unique_urls.push(url.clone());
            }
        }
    }

    let mut stats_by_url: HashMap<String, PrStats> = HashMap::new();
    let mut fetchable = Vec::new();
    for url in unique_urls {
        match parse_pr_url(&url) {
            Some(parsed) => fetchable.push((url, parsed)),
            None => warnings.push(format!("unrecognised pull request URL: {url}")),
        }
    }

    let results = bounded_map(fetchable, batch, |(url, (owner, repo, number))| async move {
        let stats = github.pr_stats(&owner, &repo, number).await?;
        Ok((url, stats))
    })
    .await;

    for result in results {
        match result {
            Ok((url, stats)) => {
                stats_by_url.insert(url, stats);
            }
            Err(err) => {
                warnings.push(format!("pull request stats fetch failed: {err}"));
            }
        }
    }

    for linked_stats in linked.values_mut() {
        for url in &linked_stats.urls {
            if let Some(stats) = stats_by_url.get(url) {
                linked_stats.additions += stats.additions;
                linked_stats.deletions += stats.deletions;
                linked_stats.review_comments += stats.review_comments;
            }
        }
    }

    (linked, warnings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_candidate_keys_case_insensitively() {
        assert_eq!(
            candidate_keys("proj-12: fix the widget (see OPS-3)"),
            vec!["PROJ-12", "OPS-3"]
        );
    }

    #[test]
    fn whole_key_matching_avoids_prefix_collisions() {
        let known: HashSet<String> = ["PROJ-1".to_string()].into_iter().collect();
        assert!(match_title_keys("PROJ-12 something", &known).is_empty());
        assert_eq!(match_title_keys("PROJ-1 something", &known), vec!["PROJ-1"]);
    }

    #[test]
    fn attaches_all_matches() {
        let known: HashSet<String> = ["PROJ-1".to_string(), "PROJ-2".to_string()]
            .into_iter()
            .collect();
        assert_eq!(
            match_title_keys("PROJ-1 and PROJ-2 together", &known),
            vec!["PROJ-1", "PROJ-2"]
        );
    }

    #[test]
    fn duplicate_keys_collapse() {
        assert_eq!(candidate_keys("PROJ-7 PROJ-7"), vec!["PROJ-7"]);
    }
}
