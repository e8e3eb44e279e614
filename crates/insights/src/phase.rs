use std::collections::HashMap;

use chrono::{DateTime, Utc};
use common::config::StatusGroupNames;
use jira::models::Changelog;
use jira::JiraClient;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Todo,
    InProgress,
    Review,
    Complete,
}

/// Status names per phase group, lowercased once for case-insensitive
/// matching against changelog targets.
#[derive(Debug, Clone)]
pub struct StatusGroups {
    todo: Vec<String>,
    in_progress: Vec<String>,
    review: Vec<String>,
    complete: Vec<String>,
}

impl StatusGroups {
    pub fn new(names: &StatusGroupNames) -> Self {
        let lower = |v: &[String]| v.iter().map(|s| s.to_lowercase()).collect();
        Self {
            todo: lower(&names.todo),
            in_progress: lower(&names.in_progress),
            review: lower(&names.review),
            complete: lower(&names.complete),
        }
    }

    pub fn phase_of(&self, status: &str) -> Option<Phase> {
        let status = status.to_lowercase();
        if self.todo.iter().any(|s| *s == status) {
            Some(Phase::Todo)
        } else if self.in_progress.iter().any(|s| *s == status) {
            Some(Phase::InProgress)
        } else if self.review.iter().any(|s| *s == status) {
            Some(Phase::Review)
        } else if self.complete.iter().any(|s| *s == status) {
            Some(Phase::Complete)
        } else {
            None
        }
    }

    pub fn is_review(&self, status: &str) -> bool {
        self.phase_of(status) == Some(Phase::Review)
    }
}

/// First time an issue entered each phase group. First occurrence only:
/// a re-opened issue can legitimately show `review_at` before
/// `in_progress_at`, and callers tolerate that.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct PhaseTimes {
    pub todo_at: Option<DateTime<Utc>>,
    pub in_progress_at: Option<DateTime<Utc>>,
    pub review_at: Option<DateTime<Utc>>,
    pub complete_at: Option<DateTime<Utc>>,
    /// Whether the requested actor produced any changelog entry inside the
    /// requested window. Used to surface tickets touched but not yet
    /// linked to a PR.
    pub touched_in_window: bool,
}

pub fn phase_times_from_changelog(
    created: Option<DateTime<Utc>>,
    changelog: &Changelog,
    groups: &StatusGroups,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    actor: Option<&str>,
) -> PhaseTimes {
    let mut times = PhaseTimes::default();

    for history in &changelog.histories {
        let Some(at) = history.created_at() else {
            continue;
        };

        if let (Some((from, to)), Some(actor)) = (window, actor) {
            if at >= from && at <= to {
                let by_actor = history
                    .author
                    .as_ref()
                    .and_then(|a| a.account_id.as_deref())
                    .map_or(false, |id| id == actor);
                if by_actor {
                    times.touched_in_window = true;
                }
            }
        }

        for item in &history.items {
            if !item.field.eq_ignore_ascii_case("status") {
                continue;
            }
            let Some(target) = item.to_display.as_deref() else {
                continue;
            };
            match groups.phase_of(target) {
                Some(Phase::Todo) => times.todo_at.get_or_insert(at),
                Some(Phase::InProgress) => times.in_progress_at.get_or_insert(at),
                Some(Phase::Review) => times.review_at.get_or_insert(at),
                Some(Phase::Complete) => times.complete_at.get_or_insert(at),
                None => continue,
            };
        }
    }

    // An issue born in the backlog never transitions into a todo status.
    if times.todo_at.is_none() {
        times.todo_at = created;
    }

    times
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedIssue {
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Default)]
pub struct PhaseExtraction {
    pub times: HashMap<String, PhaseTimes>,
    pub skipped: Vec<SkippedIssue>,
}

/// Fetch each issue's changelog and extract its phase times. Fetches run
/// one issue at a time to bound remote load. A failed fetch skips that
/// issue and the partial result is still returned.
pub async fn extract_phase_times(
    jira: &dyn JiraClient,
    keys: &[String],
    groups: &StatusGroups,
    window: Option<(DateTime<Utc>, DateTime<Utc>)>,
    actor: Option<&str>,
) -> PhaseExtraction {
    let mut extraction = PhaseExtraction::default();
    for key in keys {
        match jira.issue_with_changelog(key).await {
            Ok(issue) => {
                let changelog = issue.changelog.clone().unwrap_or_default();
                let times = phase_times_from_changelog(
                    issue.fields.created_at(),
                    &changelog,
                    groups,
                    window,
                    actor,
                );
                extraction.times.insert(key.clone(), times);
            }
            Err(err) => {
                debug!(key = %key, error = %err, "skipping issue changelog");
                extraction.skipped.push(SkippedIssue {
                    key: key.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }
    extraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use common::config::StatusGroupNames;
    use jira::models::{Changelog, History, HistoryItem};

    fn groups() -> StatusGroups {
        StatusGroups::new(&StatusGroupNames {
            todo: vec!["To Do".into()],
            in_progress: vec!["In Progress".into()],
            review: vec!["Review".into()],
            complete: vec!["Done".into()],
        })
    }

    fn transition(ts: &str, to: &str) -> History {
        History {
            created: ts.to_string(),
            author: None,
            items: vec![HistoryItem {
                field: "status".into(),
                from: None,
                from_display: None,
                to: None,
                to_display: Some(to.to_string()),
            }],
        }
    }

    #[test]
    fn extracts_first_entry_per_group() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let changelog = Changelog {
            histories: vec![
                transition("2024-05-01T09:00:00.000+0000", "To Do"),
                transition("2024-05-02T09:00:00.000+0000", "In Progress"),
                transition("2024-05-03T09:00:00.000+0000", "Review"),
                transition("2024-05-04T09:00:00.000+0000", "Done"),
            ],
        };
        let times = phase_times_from_changelog(Some(created), &changelog, &groups(), None, None);
        assert_eq!(times.todo_at.unwrap().to_rfc3339(), "2024-05-01T09:00:00+00:00");
        assert_eq!(times.in_progress_at.unwrap().to_rfc3339(), "2024-05-02T09:00:00+00:00");
        assert_eq!(times.review_at.unwrap().to_rfc3339(), "2024-05-03T09:00:00+00:00");
        assert_eq!(times.complete_at.unwrap().to_rfc3339(), "2024-05-04T09:00:00+00:00");
    }

    #[test]
    fn todo_defaults_to_creation_time() {
        let created = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let changelog = Changelog {
            histories: vec![transition("2024-05-02T09:00:00.000+0000", "In Progress")],
        };
        let times = phase_times_from_changelog(Some(created), &changelog, &groups(), None, None);
        assert_eq!(times.todo_at, Some(created));
    }

    #[test]
    fn first_occurrence_wins_on_repeated_transitions() {
        let changelog = Changelog {
            histories: vec![
                transition("2024-05-02T09:00:00.000+0000", "In Progress"),
                transition("2024-05-05T09:00:00.000+0000", "In Progress"),
            ],
        };
        let times = phase_times_from_changelog(None, &changelog, &groups(), None, None);
        assert_eq!(
            times.in_progress_at.unwrap().to_rfc3339(),
            "2024-05-02T09:00:00+00:00"
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        let changelog = Changelog {
            histories: vec![transition("2024-05-02T09:00:00.000+0000", "IN PROGRESS")],
        };
        let times = phase_times_from_changelog(None, &changelog, &groups(), None, None);
        assert!(times.in_progress_at.is_some());
    }

    #[test]
    fn review_before_in_progress_is_tolerated() {
        // Mis-transitioned issue: straight to review, reopened later.
        let changelog = Changelog {
            histories: vec![
                transition("2024-05-02T09:00:00.000+0000", "Review"),
                transition("2024-05-03T09:00:00.000+0000", "In Progress"),
            ],
        };
        let times = phase_times_from_changelog(None, &changelog, &groups(), None, None);
        assert!(times.review_at.unwrap() < times.in_progress_at.unwrap());
    }

    #[test]
    fn actor_window_flags_touched() {
        let mut history = transition("2024-05-02T09:00:00.000+0000", "In Progress");
        history.author = Some(jira::models::HistoryAuthor {
            account_id: Some("acct-1".into()),
            display_name: None,
        });
        let changelog = Changelog {
            histories: vec![history],
        };
        let window = (
            Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 5, 10, 0, 0, 0).unwrap(),
        );
        let touched =
            phase_times_from_changelog(None, &changelog, &groups(), Some(window), Some("acct-1"));
        assert!(touched.touched_in_window);

        let other =
            phase_times_from_changelog(None, &changelog, &groups(), Some(window), Some("acct-2"));
        assert!(!other.touched_in_window);
    }
}
