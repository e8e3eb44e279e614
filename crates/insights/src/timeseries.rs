use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use github::models::PullRequest;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DailyBucket {
    pub date: NaiveDate,
    pub pr_count: u64,
    pub additions: i64,
    pub deletions: i64,
    pub tickets: u64,
    pub story_points: f64,
}

/// Issue view needed for the daily aggregation: when it was resolved and
/// how many points it carried.
#[derive(Debug, Clone, Copy)]
pub struct ResolvedIssue {
    pub resolved_at: Option<DateTime<Utc>>,
    pub story_points: Option<f64>,
}

/// Bucket PRs by creation day and issues by resolution day over the
/// inclusive `[from, to]` range. Items outside the range are ignored, not
/// clamped. Output is sorted ascending by date.
pub fn aggregate_daily(
    from: NaiveDate,
    to: NaiveDate,
    prs: &[PullRequest],
    issues: &[ResolvedIssue],
) -> Vec<DailyBucket> {
    let mut buckets: BTreeMap<NaiveDate, DailyBucket> = BTreeMap::new();
    let mut day = from;
    while day <= to {
        buckets.insert(
            day,
            DailyBucket {
                date: day,
                ..DailyBucket::default()
            },
        );
        day += Duration::days(1);
    }

    for pr in prs {
        let Some(created) = pr.created_at else {
            continue;
        };
        if let Some(bucket) = buckets.get_mut(&created.date_naive()) {
            bucket.pr_count += 1;
            bucket.additions += pr.additions;
            bucket.deletions += pr.deletions;
        }
    }

    for issue in issues {
        let Some(resolved) = issue.resolved_at else {
            continue;
        };
        if let Some(bucket) = buckets.get_mut(&resolved.date_naive()) {
            bucket.tickets += 1;
            bucket.story_points += issue.story_points.unwrap_or(0.0);
        }
    }

    buckets.into_values().collect()
}
