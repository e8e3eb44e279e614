use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

use crate::scope::ScopeClass;
use crate::stats::round1;

/// Per-issue view the burn engine works from. `dev_done_at` is the review
/// timestamp with the complete-timestamp fallback already applied by the
/// sprint report path; the general stats path never applies that fallback.
#[derive(Debug, Clone)]
pub struct IssueBurnInput {
    pub key: String,
    pub assignee: Option<String>,
    pub story_points: f64,
    pub dev_done_at: Option<DateTime<Utc>>,
    pub complete_at: Option<DateTime<Utc>>,
    pub scope: ScopeClass,
    pub in_review_now: bool,
    pub additions: i64,
    pub deletions: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ScopeTotals {
    pub committed_sp: f64,
    pub added_sp: f64,
    pub removed_sp: f64,
}

impl ScopeTotals {
    pub fn from_issues(issues: &[IssueBurnInput]) -> Self {
        let mut totals = Self::default();
        for issue in issues {
            match issue.scope {
                ScopeClass::Committed => totals.committed_sp += issue.story_points,
                ScopeClass::Added => totals.added_sp += issue.story_points,
            }
        }
        totals
    }

    /// Total planned scope, floored at zero.
    pub fn total(&self) -> f64 {
        (self.committed_sp + self.added_sp - self.removed_sp).max(0.0)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BurnPoint {
    pub date: NaiveDate,
    pub scope: f64,
    pub dev_completed: Option<f64>,
    pub dev_remaining: Option<f64>,
    pub complete_completed: Option<f64>,
    pub complete_remaining: Option<f64>,
    pub forecast_dev_completed: Option<f64>,
    pub forecast_dev_remaining: Option<f64>,
    pub forecast_complete_completed: Option<f64>,
    pub forecast_complete_remaining: Option<f64>,
}

impl BurnPoint {
    fn empty(date: NaiveDate, scope: f64) -> Self {
        Self {
            date,
            scope,
            dev_completed: None,
            dev_remaining: None,
            complete_completed: None,
            complete_remaining: None,
            forecast_dev_completed: None,
            forecast_dev_remaining: None,
            forecast_complete_completed: None,
            forecast_complete_remaining: None,
        }
    }
}

fn completed_by(issues: &[IssueBurnInput], day: NaiveDate, track: Track) -> f64 {
    issues
        .iter()
        .filter(|issue| {
            let at = match track {
                Track::Dev => issue.dev_done_at,
                Track::Complete => issue.complete_at,
            };
            at.map_or(false, |at| at.date_naive() <= day)
        })
        .map(|issue| issue.story_points)
        .sum()
}

#[derive(Clone, Copy)]
enum Track {
    Dev,
    Complete,
}

/// Day-by-day cumulative burn from sprint start to the actual end date if
/// the sprint already ended, else today.
pub fn build_burn_series(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    scope: f64,
    issues: &[IssueBurnInput],
) -> Vec<BurnPoint> {
    let last = end.min(today.max(start));
    let mut series = Vec::new();
    let mut day = start;
    while day <= last {
        let mut point = BurnPoint::empty(day, scope);
        let dev = completed_by(issues, day, Track::Dev);
        let complete = completed_by(issues, day, Track::Complete);
        point.dev_completed = Some(dev);
        point.dev_remaining = Some((scope - dev).max(0.0));
        point.complete_completed = Some(complete);
        point.complete_remaining = Some((scope - complete).max(0.0));
        series.push(point);
        day += Duration::days(1);
    }
    series
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TrackForecast {
    pub velocity_per_day: f64,
    pub completion_date: NaiveDate,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SprintForecast {
    pub dev: Option<TrackForecast>,
    pub complete: Option<TrackForecast>,
}

/// Trailing average over the last up-to-five daily increments. Downward
/// moves (scope recalculation) contribute zero, not negative.
fn trailing_velocity(completed: &[f64]) -> f64 {
    if completed.len() < 2 {
        return 0.0;
    }
    let deltas: Vec<f64> = completed
        .windows(2)
        .map(|w| (w[1] - w[0]).max(0.0))
        .collect();
    let window = deltas.len().min(5);
    let recent = &deltas[deltas.len() - window..];
    recent.iter().sum::<f64>() / window as f64
}

/// Linear projection from today's position in the series. Future points
/// (up to the sprint end) get forecast values per track when that track's
/// velocity is positive; a zero-velocity track produces no forecast and no
/// completion date.
pub fn apply_forecast(
    series: &mut Vec<BurnPoint>,
    sprint_end: NaiveDate,
    today: NaiveDate,
    scope: f64,
) -> SprintForecast {
    if series.is_empty() {
        return SprintForecast::default();
    }

    // Today's index, or the last constructed point when today is not a
    // series point.
    let today_idx = series
        .iter()
        .position(|p| p.date == today)
        .unwrap_or(series.len() - 1);
    let anchor_date = series[today_idx].date;

    let dev_values: Vec<f64> = series[..=today_idx]
        .iter()
        .filter_map(|p| p.dev_completed)
        .collect();
    let complete_values: Vec<f64> = series[..=today_idx]
        .iter()
        .filter_map(|p| p.complete_completed)
        .collect();

    let dev_velocity = trailing_velocity(&dev_values);
    let complete_velocity = trailing_velocity(&complete_values);
    let dev_now = dev_values.last().copied().unwrap_or(0.0);
    let complete_now = complete_values.last().copied().unwrap_or(0.0);

    let completion = |velocity: f64, now: f64| -> Option<TrackForecast> {
        if velocity <= 0.0 {
            return None;
        }
        let remaining = (scope - now).max(0.0);
        let days = (remaining / velocity).ceil() as i64;
        Some(TrackForecast {
            velocity_per_day: velocity,
            completion_date: anchor_date + Duration::days(days),
        })
    };

    let forecast = SprintForecast {
        dev: completion(dev_velocity, dev_now),
        complete: completion(complete_velocity, complete_now),
    };

    // Extend the series across the sprint's remaining days.
    let mut day = anchor_date + Duration::days(1);
    let mut offset = 1i64;
    while day <= sprint_end {
        let mut point = BurnPoint::empty(day, scope);
        if dev_velocity > 0.0 {
            let projected = (dev_now + dev_velocity * offset as f64).min(scope);
            point.forecast_dev_completed = Some(projected);
            point.forecast_dev_remaining = Some((scope - projected).max(0.0));
        }
        if complete_velocity > 0.0 {
            let projected = (complete_now + complete_velocity * offset as f64).min(scope);
            point.forecast_complete_completed = Some(projected);
            point.forecast_complete_remaining = Some((scope - projected).max(0.0));
        }
        series.push(point);
        day += Duration::days(1);
        offset += 1;
    }

    forecast
}

#[derive(Debug, Clone, Serialize)]
pub struct AssigneeCompletion {
    pub assignee: String,
    pub dev_sp: f64,
    pub complete_sp: f64,
}

pub fn completed_by_assignee(issues: &[IssueBurnInput]) -> Vec<AssigneeCompletion> {
    let mut by_assignee: Vec<AssigneeCompletion> = Vec::new();
    for issue in issues {
        let name = issue.assignee.clone().unwrap_or_else(|| "Unassigned".into());
        let entry = match by_assignee.iter_mut().find(|a| a.assignee == name) {
            Some(entry) => entry,
            None => {
                by_assignee.push(AssigneeCompletion {
                    assignee: name,
                    dev_sp: 0.0,
                    complete_sp: 0.0,
                });
                by_assignee.last_mut().expect("just pushed")
            }
        };
        if issue.dev_done_at.is_some() {
            entry.dev_sp += issue.story_points;
        }
        if issue.complete_at.is_some() {
            entry.complete_sp += issue.story_points;
        }
    }
    by_assignee.retain(|a| a.dev_sp > 0.0 || a.complete_sp > 0.0);
    by_assignee.sort_by(|a, b| {
        b.complete_sp
            .partial_cmp(&a.complete_sp)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.assignee.cmp(&b.assignee))
    });
    by_assignee
}

#[derive(Debug, Clone, Serialize)]
pub struct SprintKpis {
    pub committed_sp: f64,
    pub added_sp: f64,
    pub removed_sp: f64,
    pub total_scope: f64,
    pub dev_completed_sp: f64,
    pub dev_remaining_sp: f64,
    pub dev_completed_pct: f64,
    pub complete_completed_sp: f64,
    pub complete_remaining_sp: f64,
    pub complete_completed_pct: f64,
    pub total_additions: i64,
    pub total_deletions: i64,
    pub tickets_in_qa: u64,
}

pub fn sprint_kpis(totals: ScopeTotals, issues: &[IssueBurnInput]) -> SprintKpis {
    let scope = totals.total();
    let dev_completed: f64 = issues
        .iter()
        .filter(|i| i.dev_done_at.is_some())
        .map(|i| i.story_points)
        .sum();
    let complete_completed: f64 = issues
        .iter()
        .filter(|i| i.complete_at.is_some())
        .map(|i| i.story_points)
        .sum();

    let pct = |completed: f64| {
        if scope == 0.0 {
            0.0
        } else {
            round1(completed / scope * 100.0)
        }
    };

    SprintKpis {
        committed_sp: totals.committed_sp,
        added_sp: totals.added_sp,
        removed_sp: totals.removed_sp,
        total_scope: scope,
        dev_completed_sp: dev_completed,
        dev_remaining_sp: (scope - dev_completed).max(0.0),
        dev_completed_pct: pct(dev_completed),
        complete_completed_sp: complete_completed,
        complete_remaining_sp: (scope - complete_completed).max(0.0),
        complete_completed_pct: pct(complete_completed),
        total_additions: issues.iter().map(|i| i.additions).sum(),
        total_deletions: issues.iter().map(|i| i.deletions).sum(),
        tickets_in_qa: issues.iter().filter(|i| i.in_review_now).count() as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn at(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, d, 12, 0, 0).unwrap()
    }

    fn issue(key: &str, sp: f64, dev: Option<u32>, complete: Option<u32>) -> IssueBurnInput {
        IssueBurnInput {
            key: key.to_string(),
            assignee: None,
            story_points: sp,
            dev_done_at: dev.map(at),
            complete_at: complete.map(at),
            scope: ScopeClass::Committed,
            in_review_now: false,
            additions: 0,
            deletions: 0,
        }
    }

    #[test]
    fn remaining_is_scope_minus_completed_floored() {
        let issues = vec![issue("A", 30.0, Some(2), Some(2))];
        let series = build_burn_series(day(1), day(10), day(3), 20.0, &issues);
        for point in &series {
            let completed = point.dev_completed.unwrap();
            assert_eq!(point.dev_remaining.unwrap(), (20.0 - completed).max(0.0));
            assert!(point.dev_remaining.unwrap() >= 0.0);
        }
        // Over-delivery still floors remaining at zero.
        assert_eq!(series[2].dev_remaining.unwrap(), 0.0);
    }

    #[test]
    fn series_ends_today_for_running_sprint() {
        let series = build_burn_series(day(1), day(10), day(4), 10.0, &[]);
        assert_eq!(series.len(), 4);
        assert_eq!(series.last().unwrap().date, day(4));
    }

    #[test]
    fn series_ends_at_end_date_for_finished_sprint() {
        let series = build_burn_series(day(1), day(5), day(20), 10.0, &[]);
        assert_eq!(series.last().unwrap().date, day(5));
    }

    #[test]
    fn completed_is_cumulative_and_non_decreasing() {
        let issues = vec![
            issue("A", 5.0, Some(3), Some(4)),
            issue("B", 5.0, Some(6), None),
        ];
        let series = build_burn_series(day(1), day(14), day(8), 20.0, &issues);
        let mut prev = 0.0;
        for point in &series {
            let completed = point.dev_completed.unwrap();
            assert!(completed >= prev);
            prev = completed;
        }
        assert_eq!(series.last().unwrap().dev_completed.unwrap(), 10.0);
        assert_eq!(series.last().unwrap().complete_completed.unwrap(), 5.0);
    }

    #[test]
    fn zero_velocity_produces_no_forecast() {
        let mut series = build_burn_series(day(1), day(10), day(5), 10.0, &[]);
        let forecast = apply_forecast(&mut series, day(10), day(5), 10.0);
        assert!(forecast.dev.is_none());
        assert!(forecast.complete.is_none());
        assert!(series
            .iter()
            .all(|p| p.forecast_dev_completed.is_none()));
    }

    #[test]
    fn forecast_never_exceeds_scope() {
        let issues = vec![
            issue("A", 8.0, Some(2), Some(2)),
            issue("B", 8.0, Some(4), Some(4)),
        ];
        let mut series = build_burn_series(day(1), day(14), day(5), 20.0, &issues);
        let forecast = apply_forecast(&mut series, day(14), day(5), 20.0);
        assert!(forecast.dev.is_some());
        for point in &series {
            if let Some(projected) = point.forecast_dev_completed {
                assert!(projected <= 20.0);
            }
        }
    }

    #[test]
    fn downward_moves_contribute_zero_velocity() {
        assert_eq!(trailing_velocity(&[5.0, 3.0, 3.0]), 0.0);
        // Only the upward delta counts: (2 + 0) / 2.
        assert_eq!(trailing_velocity(&[3.0, 5.0, 3.0]), 1.0);
    }

    #[test]
    fn trailing_window_is_at_most_five_deltas() {
        // Seven points, six deltas; only the last five count.
        let values = [100.0, 0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(trailing_velocity(&values), 1.0);
    }

    #[test]
    fn forecast_projects_completion_from_remaining_over_velocity() {
        // 20 SP scope, 5 SP done by day 3 and 5 more by day 6.
        let issues = vec![
            issue("A", 5.0, Some(3), Some(3)),
            issue("B", 5.0, Some(6), Some(6)),
        ];
        let mut series = build_burn_series(day(1), day(14), day(6), 20.0, &issues);
        let forecast = apply_forecast(&mut series, day(14), day(6), 20.0);
        let dev = forecast.dev.unwrap();
        // Last five deltas cover days 2..=6 and carry the two +5 jumps.
        assert_eq!(dev.velocity_per_day, 2.0);
        // remaining 10 / 2 per day = 5 days out from day 6.
        assert_eq!(dev.completion_date, day(11));
        assert!(dev.completion_date > day(6));
    }

    #[test]
    fn future_points_carry_forecast_values_only() {
        let issues = vec![issue("A", 5.0, Some(3), Some(3))];
        let mut series = build_burn_series(day(1), day(10), day(5), 20.0, &issues);
        apply_forecast(&mut series, day(10), day(5), 20.0);
        assert_eq!(series.last().unwrap().date, day(10));
        let future = &series[5..];
        assert!(future.iter().all(|p| p.dev_completed.is_none()));
        assert!(future.iter().any(|p| p.forecast_dev_completed.is_some()));
    }

    #[test]
    fn scope_totals_floor_at_zero() {
        let totals = ScopeTotals {
            committed_sp: 3.0,
            added_sp: 1.0,
            removed_sp: 10.0,
        };
        assert_eq!(totals.total(), 0.0);
    }

    #[test]
    fn kpi_percentages_round_to_one_decimal_and_handle_zero_scope() {
        let issues = vec![issue("A", 1.0, Some(2), None)];
        let kpis = sprint_kpis(
            ScopeTotals {
                committed_sp: 3.0,
                added_sp: 0.0,
                removed_sp: 0.0,
            },
            &issues,
        );
        assert_eq!(kpis.dev_completed_pct, 33.3);

        let empty = sprint_kpis(ScopeTotals::default(), &issues);
        assert_eq!(empty.dev_completed_pct, 0.0);
    }

    #[test]
    fn assignee_breakdown_covers_both_tracks() {
        let mut a = issue("A", 3.0, Some(2), Some(3));
        a.assignee = Some("Ada".into());
        let mut b = issue("B", 5.0, Some(2), None);
        b.assignee = Some("Grace".into());
        let c = issue("C", 2.0, None, None);

        let breakdown = completed_by_assignee(&[a, b, c]);
        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].assignee, "Ada");
        assert_eq!(breakdown[0].complete_sp, 3.0);
        assert_eq!(breakdown[1].assignee, "Grace");
        assert_eq!(breakdown[1].dev_sp, 5.0);
        assert_eq!(breakdown[1].complete_sp, 0.0);
    }
}
