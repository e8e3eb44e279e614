use std::collections::HashMap;
use std::path::Path;

use config::{Config, Environment, File};
use serde::Deserialize;

use crate::errors::Result;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub github: GithubConfig,
    pub jira: JiraConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        Self::load_from_path(".")
    }

    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/default")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(
                File::with_name(
                    path.as_ref()
                        .join("config/local")
                        .to_string_lossy()
                        .as_ref(),
                )
                .required(false),
            )
            .add_source(Environment::default().separator("__"))
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "ApiConfig::default_bind")]
    pub bind: String,
}

impl ApiConfig {
    fn default_bind() -> String {
        "0.0.0.0:8080".to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub cookie_secret: String,
    /// Shared credential list, `user:password` pairs separated by commas.
    #[serde(default)]
    pub users: String,
}

impl AuthConfig {
    pub fn credential_map(&self) -> HashMap<String, String> {
        self.users
            .split(',')
            .filter_map(|pair| {
                let (user, password) = pair.split_once(':')?;
                let user = user.trim();
                if user.is_empty() {
                    return None;
                }
                Some((user.to_string(), password.trim().to_string()))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GithubConfig {
    /// Absent token means GitHub-backed features resolve to empty data.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default = "GithubConfig::default_user_agent")]
    pub user_agent: String,
    #[serde(default = "GithubConfig::default_api_base")]
    pub api_base: String,
    #[serde(default = "GithubConfig::default_timeout_secs")]
    pub timeout_secs: u64,
}

impl GithubConfig {
    fn default_user_agent() -> String {
        "devpulse".to_string()
    }

    fn default_api_base() -> String {
        "https://api.github.com".to_string()
    }

    const fn default_timeout_secs() -> u64 {
        30
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JiraConfig {
    /// Absent base URL means Jira-backed features resolve to empty data.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default = "JiraConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub fields: FieldIds,
    #[serde(default)]
    pub status_groups: StatusGroupNames,
}

impl JiraConfig {
    const fn default_timeout_secs() -> u64 {
        30
    }
}

/// Jira custom-field IDs, resolved once at configuration time. Typed
/// accessors in the jira crate do the lookup-and-cast in one place.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldIds {
    #[serde(default = "FieldIds::default_story_points")]
    pub story_points: String,
    #[serde(default = "FieldIds::default_epic_link")]
    pub epic_link: String,
    #[serde(default)]
    pub qa_assignee: Option<String>,
}

impl FieldIds {
    fn default_story_points() -> String {
        "customfield_10016".to_string()
    }

    fn default_epic_link() -> String {
        "customfield_10014".to_string()
    }
}

impl Default for FieldIds {
    fn default() -> Self {
        Self {
            story_points: Self::default_story_points(),
            epic_link: Self::default_epic_link(),
            qa_assignee: None,
        }
    }
}

/// Status names that make up each semantic phase group, matched
/// case-insensitively against changelog target statuses.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusGroupNames {
    #[serde(default = "StatusGroupNames::default_todo")]
    pub todo: Vec<String>,
    #[serde(default = "StatusGroupNames::default_in_progress")]
    pub in_progress: Vec<String>,
    #[serde(default = "StatusGroupNames::default_review")]
    pub review: Vec<String>,
    #[serde(default = "StatusGroupNames::default_complete")]
    pub complete: Vec<String>,
}

impl StatusGroupNames {
    fn default_todo() -> Vec<String> {
        vec!["To Do".into(), "Open".into(), "Backlog".into()]
    }

    fn default_in_progress() -> Vec<String> {
        vec!["In Progress".into()]
    }

    fn default_review() -> Vec<String> {
        vec!["In Review".into(), "Review".into(), "Code Review".into()]
    }

    fn default_complete() -> Vec<String> {
        vec!["Done".into(), "Closed".into(), "Resolved".into(), "Approved".into()]
    }
}

impl Default for StatusGroupNames {
    fn default() -> Self {
        Self {
            todo: Self::default_todo(),
            in_progress: Self::default_in_progress(),
            review: Self::default_review(),
            complete: Self::default_complete(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Concurrency bound for the PR-statistics batch fetch.
    #[serde(default = "FetchConfig::default_pr_stats_batch")]
    pub pr_stats_batch: usize,
}

impl FetchConfig {
    const fn default_pr_stats_batch() -> usize {
        10
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            pr_stats_batch: Self::default_pr_stats_batch(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_map_parses_pairs() {
        let auth = AuthConfig {
            cookie_secret: "s".into(),
            users: "alice:pw1, bob:pw2".into(),
        };
        let map = auth.credential_map();
        assert_eq!(map.get("alice").map(String::as_str), Some("pw1"));
        assert_eq!(map.get("bob").map(String::as_str), Some("pw2"));
    }

    #[test]
    fn credential_map_skips_malformed_entries() {
        let auth = AuthConfig {
            cookie_secret: "s".into(),
            users: "nopassword,:orphan,ok:yes".into(),
        };
        let map = auth.credential_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("ok").map(String::as_str), Some("yes"));
    }

    #[test]
    fn status_groups_have_defaults() {
        let groups = StatusGroupNames::default();
        assert!(groups.todo.iter().any(|s| s == "To Do"));
        assert!(groups.complete.iter().any(|s| s == "Done"));
    }
}
