use chrono::{DateTime, Utc};
use jira::models::Changelog;
use serde::Serialize;

/// Whether an issue was planned into the sprint or pulled in after start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeClass {
    Committed,
    Added,
}

/// A Sprint-field changelog value encodes sprint ids as a comma-separated
/// list, e.g. `"41, 42"`.
fn encodes_sprint(value: Option<&str>, sprint_id: u64) -> bool {
    let Some(value) = value else {
        return false;
    };
    value
        .split(',')
        .filter_map(|part| part.trim().parse::<u64>().ok())
        .any(|id| id == sprint_id)
}

/// Classify one issue from its changelog. The latest matching in/out
/// signal in scan order wins; anything ambiguous stays `Committed` so the
/// "scope added" number never inflates.
pub fn classify_from_changelog(
    sprint_id: u64,
    sprint_start: DateTime<Utc>,
    changelog: &Changelog,
) -> ScopeClass {
    let mut class = ScopeClass::Committed;

    for history in &changelog.histories {
        let Some(at) = history.created_at() else {
            continue;
        };
        for item in &history.items {
            if !item.field.eq_ignore_ascii_case("sprint") {
                continue;
            }
            let into = encodes_sprint(item.to.as_deref(), sprint_id);
            let out_of = encodes_sprint(item.from.as_deref(), sprint_id);
            if into && !out_of {
                class = if at > sprint_start {
                    ScopeClass::Added
                } else {
                    ScopeClass::Committed
                };
            } else if out_of && !into && at <= sprint_start {
                class = ScopeClass::Committed;
            }
        }
    }

    class
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use jira::models::{Changelog, History, HistoryItem};

    fn sprint_change(ts: &str, from: Option<&str>, to: Option<&str>) -> History {
        History {
            created: ts.to_string(),
            author: None,
            items: vec![HistoryItem {
                field: "Sprint".into(),
                from: from.map(str::to_string),
                from_display: None,
                to: to.map(str::to_string),
                to_display: None,
            }],
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 9, 0, 0).unwrap()
    }

    #[test]
    fn entry_after_start_is_added() {
        let changelog = Changelog {
            histories: vec![sprint_change("2024-05-07T09:00:00.000+0000", None, Some("42"))],
        };
        assert_eq!(
            classify_from_changelog(42, start(), &changelog),
            ScopeClass::Added
        );
    }

    #[test]
    fn entry_before_start_is_committed() {
        let changelog = Changelog {
            histories: vec![sprint_change("2024-05-01T09:00:00.000+0000", None, Some("42"))],
        };
        assert_eq!(
            classify_from_changelog(42, start(), &changelog),
            ScopeClass::Committed
        );
    }

    #[test]
    fn no_sprint_entries_defaults_to_committed() {
        assert_eq!(
            classify_from_changelog(42, start(), &Changelog::default()),
            ScopeClass::Committed
        );
    }

    #[test]
    fn multi_sprint_value_matches_the_target_id() {
        let changelog = Changelog {
            histories: vec![sprint_change(
                "2024-05-07T09:00:00.000+0000",
                Some("41"),
                Some("41, 42"),
            )],
        };
        assert_eq!(
            classify_from_changelog(42, start(), &changelog),
            ScopeClass::Added
        );
    }

    #[test]
    fn removal_on_or_before_start_stays_committed() {
        let changelog = Changelog {
            histories: vec![sprint_change("2024-05-06T09:00:00.000+0000", Some("42"), None)],
        };
        assert_eq!(
            classify_from_changelog(42, start(), &changelog),
            ScopeClass::Committed
        );
    }

    #[test]
    fn latest_signal_wins_on_rejoin() {
        // Left and rejoined after start: the rejoin is the latest signal.
        let changelog = Changelog {
            histories: vec![
                sprint_change("2024-05-01T09:00:00.000+0000", None, Some("42")),
                sprint_change("2024-05-07T09:00:00.000+0000", Some("42"), None),
                sprint_change("2024-05-08T09:00:00.000+0000", None, Some("42")),
            ],
        };
        assert_eq!(
            classify_from_changelog(42, start(), &changelog),
            ScopeClass::Added
        );
    }

    #[test]
    fn unrelated_sprint_ids_are_ignored() {
        let changelog = Changelog {
            histories: vec![sprint_change("2024-05-07T09:00:00.000+0000", None, Some("7"))],
        };
        assert_eq!(
            classify_from_changelog(42, start(), &changelog),
            ScopeClass::Committed
        );
    }
}
