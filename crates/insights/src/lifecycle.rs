use std::collections::HashMap;

use chrono::{DateTime, Utc};
use github::models::PullRequest;
use serde::Serialize;

use crate::stats::{hours_between, median};

/// Display metadata for the issue a PR was linked to.
#[derive(Debug, Clone, Serialize)]
pub struct LinkedIssueMeta {
    pub key: String,
    pub summary: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PrLifecycle {
    pub pr: PullRequest,
    pub ready_for_review_at: Option<DateTime<Utc>>,
    pub time_to_ready_hours: Option<f64>,
    pub time_to_first_review_hours: Option<f64>,
    pub review_to_merge_hours: Option<f64>,
    pub cycle_time_hours: Option<f64>,
    pub in_progress_to_created_hours: Option<f64>,
    pub linked_issue: Option<LinkedIssueMeta>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LifecycleStats {
    pub sample_size: usize,
    pub median_time_to_ready_hours: Option<f64>,
    pub median_time_to_first_review_hours: Option<f64>,
    pub median_review_to_merge_hours: Option<f64>,
    pub median_cycle_time_hours: Option<f64>,
    pub median_in_progress_to_created_hours: Option<f64>,
}

#[derive(Debug, Default)]
pub struct LifecycleReport {
    pub prs: Vec<PrLifecycle>,
    pub stats: LifecycleStats,
}

fn lifecycle_for_pr(
    pr: PullRequest,
    work_started: Option<DateTime<Utc>>,
    linked_issue: Option<LinkedIssueMeta>,
) -> PrLifecycle {
    // Explicit ready event, or creation for PRs that never were drafts.
    let ready_for_review_at = pr.ready_for_review_at.or(if pr.is_draft {
        None
    } else {
        pr.created_at
    });

    let review_anchor = pr
        .first_review_at
        .or(ready_for_review_at)
        .or(pr.created_at);

    let closed_or_merged = pr.merged_at.or(pr.closed_at);

    PrLifecycle {
        ready_for_review_at,
        time_to_ready_hours: hours_between(pr.created_at, ready_for_review_at),
        time_to_first_review_hours: hours_between(pr.created_at, pr.first_review_at),
        review_to_merge_hours: hours_between(review_anchor, pr.merged_at),
        cycle_time_hours: hours_between(pr.created_at, closed_or_merged),
        in_progress_to_created_hours: hours_between(work_started, pr.created_at),
        linked_issue,
        pr,
    }
}

/// Per-PR duration metrics plus population medians. A PR missing a given
/// duration drops out of that duration's median only.
pub fn aggregate_lifecycle(
    prs: Vec<PullRequest>,
    work_started_by_url: &HashMap<String, DateTime<Utc>>,
    issue_meta_by_url: &HashMap<String, LinkedIssueMeta>,
) -> LifecycleReport {
    let records: Vec<PrLifecycle> = prs
        .into_iter()
        .map(|pr| {
            let work_started = work_started_by_url.get(&pr.url).copied();
            let meta = issue_meta_by_url.get(&pr.url).cloned();
            lifecycle_for_pr(pr, work_started, meta)
        })
        .collect();

    let collect = |f: fn(&PrLifecycle) -> Option<f64>| -> Vec<f64> {
        records.iter().filter_map(f).collect()
    };

    let stats = LifecycleStats {
        sample_size: records.len(),
        median_time_to_ready_hours: median(&collect(|r| r.time_to_ready_hours)),
        median_time_to_first_review_hours: median(&collect(|r| r.time_to_first_review_hours)),
        median_review_to_merge_hours: median(&collect(|r| r.review_to_merge_hours)),
        median_cycle_time_hours: median(&collect(|r| r.cycle_time_hours)),
        median_in_progress_to_created_hours: median(
            &collect(|r| r.in_progress_to_created_hours),
        ),
    };

    LifecycleReport { prs: records, stats }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use github::models::{PrState, RepoRef};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    fn pr(url: &str) -> PullRequest {
        PullRequest {
            id: url.to_string(),
            number: 1,
            title: "PROJ-1 change".into(),
            url: url.to_string(),
            head_ref: "feature".into(),
            created_at: Some(at(1, 9)),
            merged_at: None,
            closed_at: None,
            state: PrState::Open,
            is_draft: false,
            additions: 0,
            deletions: 0,
            repo: RepoRef {
                owner: "acme".into(),
                name: "widgets".into(),
            },
            first_review_at: None,
            ready_for_review_at: None,
            issue_keys: vec![],
        }
    }

    #[test]
    fn never_draft_pr_is_ready_at_creation() {
        let record = lifecycle_for_pr(pr("u"), None, None);
        assert_eq!(record.ready_for_review_at, Some(at(1, 9)));
        assert_eq!(record.time_to_ready_hours, Some(0.0));
    }

    #[test]
    fn draft_without_ready_event_has_no_ready_time() {
        let mut draft = pr("u");
        draft.is_draft = true;
        let record = lifecycle_for_pr(draft, None, None);
        assert_eq!(record.ready_for_review_at, None);
        assert_eq!(record.time_to_ready_hours, None);
    }

    #[test]
    fn review_to_merge_uses_first_review_when_present() {
        let mut merged = pr("u");
        merged.first_review_at = Some(at(2, 9));
        merged.merged_at = Some(at(3, 9));
        merged.state = PrState::Merged;
        let record = lifecycle_for_pr(merged, None, None);
        assert_eq!(record.review_to_merge_hours, Some(24.0));
    }

    #[test]
    fn review_to_merge_falls_back_to_creation() {
        let mut merged = pr("u");
        merged.merged_at = Some(at(2, 9));
        let record = lifecycle_for_pr(merged, None, None);
        assert_eq!(record.review_to_merge_hours, Some(24.0));
    }

    #[test]
    fn unmerged_pr_has_no_review_to_merge() {
        let record = lifecycle_for_pr(pr("u"), None, None);
        assert_eq!(record.review_to_merge_hours, None);
        assert_eq!(record.cycle_time_hours, None);
    }

    #[test]
    fn cycle_time_uses_close_when_unmerged() {
        let mut closed = pr("u");
        closed.closed_at = Some(at(4, 9));
        closed.state = PrState::Closed;
        let record = lifecycle_for_pr(closed, None, None);
        assert_eq!(record.cycle_time_hours, Some(72.0));
    }

    #[test]
    fn work_started_after_creation_clamps_to_zero() {
        let record = lifecycle_for_pr(pr("u"), Some(at(2, 9)), None);
        assert_eq!(record.in_progress_to_created_hours, Some(0.0));
    }

    #[test]
    fn medians_skip_prs_missing_that_duration_only() {
        let mut merged = pr("a");
        merged.merged_at = Some(at(2, 9));
        let open = pr("b");

        let report = aggregate_lifecycle(vec![merged, open], &HashMap::new(), &HashMap::new());
        assert_eq!(report.stats.sample_size, 2);
        // Only the merged PR contributes a cycle time.
        assert_eq!(report.stats.median_cycle_time_hours, Some(24.0));
        // Both contribute time-to-ready.
        assert_eq!(report.stats.median_time_to_ready_hours, Some(0.0));
    }

    #[test]
    fn work_started_map_keys_by_url() {
        let report = aggregate_lifecycle(
            vec![pr("https://github.com/acme/widgets/pull/1")],
            &HashMap::from([(
                "https://github.com/acme/widgets/pull/1".to_string(),
                at(1, 3),
            )]),
            &HashMap::new(),
        );
        assert_eq!(report.prs[0].in_progress_to_created_hours, Some(6.0));
    }
}
