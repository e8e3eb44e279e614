use std::collections::{HashMap, HashSet};

use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Utc};
use github::GithubClient;
use jira::fields::FieldMap;
use jira::JiraClient;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::lifecycle::{aggregate_lifecycle, LifecycleReport, LinkedIssueMeta};
use crate::linker::{attach_issue_keys, candidate_keys, link_dev_status_prs};
use crate::phase::{
    extract_phase_times, phase_times_from_changelog, PhaseTimes, SkippedIssue, StatusGroups,
};
use crate::scope::{classify_from_changelog, ScopeClass};
use crate::stats::hours_between;
use crate::sprint::{
    apply_forecast, build_burn_series, completed_by_assignee, sprint_kpis, AssigneeCompletion,
    BurnPoint, IssueBurnInput, ScopeTotals, SprintForecast, SprintKpis,
};
use crate::timeseries::{aggregate_daily, DailyBucket, ResolvedIssue};

#[derive(Debug, Clone, Serialize)]
pub struct SprintIssue {
    pub key: String,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub story_points: f64,
    pub scope: ScopeClass,
    pub epic_key: Option<String>,
    pub qa_assignees: Vec<String>,
    pub todo_at: Option<DateTime<Utc>>,
    pub in_progress_at: Option<DateTime<Utc>>,
    pub review_at: Option<DateTime<Utc>>,
    pub dev_done_at: Option<DateTime<Utc>>,
    pub complete_at: Option<DateTime<Utc>>,
    pub in_progress_to_review_hours: Option<f64>,
    pub review_to_complete_hours: Option<f64>,
    pub pr_urls: Vec<String>,
    pub additions: i64,
    pub deletions: i64,
    pub review_comments: i64,
}

#[derive(Debug, Serialize)]
pub struct SprintReport {
    pub sprint_id: u64,
    pub sprint_name: String,
    pub state: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub kpis: SprintKpis,
    pub burn: Vec<BurnPoint>,
    pub forecast: SprintForecast,
    pub completed_by_assignee: Vec<AssigneeCompletion>,
    pub issues: Vec<SprintIssue>,
    pub skipped: Vec<SkippedIssue>,
    pub warnings: Vec<String>,
}

/// Full sprint payload: metadata, per-issue scope and phase times, linked
/// PR totals, KPIs, burn series and forecast. Sprint and issue-list
/// fetches fail the request; everything downstream degrades into
/// `warnings` or `skipped` entries instead.
pub async fn build_sprint_report(
    jira: &dyn JiraClient,
    github: &dyn GithubClient,
    field_map: &FieldMap,
    groups: &StatusGroups,
    batch: usize,
    sprint_id: u64,
    now: DateTime<Utc>,
) -> Result<SprintReport> {
    let sprint = jira.sprint(sprint_id).await?;
    let raw_issues = jira.sprint_issues(sprint_id).await?;
    info!(sprint_id, issues = raw_issues.len(), "building sprint report");

    let mut warnings = Vec::new();
    let mut skipped = Vec::new();

    let sprint_start = sprint.started_at();
    if sprint_start.is_none() {
        warnings.push("sprint has no start date; every issue counts as committed scope".into());
    }

    // One changelog fetch per issue covers both phase times and scope.
    let mut times: HashMap<String, PhaseTimes> = HashMap::new();
    let mut classes: HashMap<String, ScopeClass> = HashMap::new();
    for issue in &raw_issues {
        match jira.issue_with_changelog(&issue.key).await {
            Ok(detailed) => {
                let changelog = detailed.changelog.clone().unwrap_or_default();
                times.insert(
                    issue.key.clone(),
                    phase_times_from_changelog(
                        detailed.fields.created_at(),
                        &changelog,
                        groups,
                        None,
                        None,
                    ),
                );
                let class = match sprint_start {
                    Some(start) => classify_from_changelog(sprint_id, start, &changelog),
                    None => ScopeClass::Committed,
                };
                classes.insert(issue.key.clone(), class);
            }
            Err(err) => {
                debug!(key = %issue.key, error = %err, "skipping issue changelog");
                skipped.push(SkippedIssue {
                    key: issue.key.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    let (linked, link_warnings) = link_dev_status_prs(jira, github, &raw_issues, batch).await;
    warnings.extend(link_warnings);

    let mut issues = Vec::with_capacity(raw_issues.len());
    for raw in &raw_issues {
        let phase = times.get(&raw.key).copied().unwrap_or_default();
        let linked_stats = linked.get(&raw.key).cloned().unwrap_or_default();
        issues.push(SprintIssue {
            key: raw.key.clone(),
            summary: raw.fields.summary.clone(),
            status: raw.fields.status_name().map(str::to_string),
            assignee: raw.fields.assignee_name().map(str::to_string),
            story_points: field_map.story_points(&raw.fields).unwrap_or(0.0),
            scope: classes
                .get(&raw.key)
                .copied()
                .unwrap_or(ScopeClass::Committed),
            epic_key: field_map.epic_key(&raw.fields),
            qa_assignees: field_map.qa_assignees(&raw.fields),
            todo_at: phase.todo_at,
            in_progress_at: phase.in_progress_at,
            review_at: phase.review_at,
            // Issues merged without a review transition count as dev-done
            // at completion. This fallback exists only in the sprint path.
            dev_done_at: phase.review_at.or(phase.complete_at),
            complete_at: phase.complete_at,
            in_progress_to_review_hours: hours_between(phase.in_progress_at, phase.review_at),
            review_to_complete_hours: hours_between(phase.review_at, phase.complete_at),
            pr_urls: linked_stats.urls,
            additions: linked_stats.additions,
            deletions: linked_stats.deletions,
            review_comments: linked_stats.review_comments,
        });
    }

    let burn_inputs: Vec<IssueBurnInput> = issues
        .iter()
        .map(|issue| IssueBurnInput {
            key: issue.key.clone(),
            assignee: issue.assignee.clone(),
            story_points: issue.story_points,
            dev_done_at: issue.dev_done_at,
            complete_at: issue.complete_at,
            scope: issue.scope,
            in_review_now: issue
                .status
                .as_deref()
                .map_or(false, |s| groups.is_review(s)),
            additions: issue.additions,
            deletions: issue.deletions,
        })
        .collect();

    let totals = ScopeTotals::from_issues(&burn_inputs);
    let scope = totals.total();
    let kpis = sprint_kpis(totals, &burn_inputs);
    let completed = completed_by_assignee(&burn_inputs);

    let today = now.date_naive();
    let (burn, forecast) = match (sprint_start, sprint.ends_at()) {
        (Some(start), Some(end)) => {
            let mut series = build_burn_series(
                start.date_naive(),
                end.date_naive(),
                today,
                scope,
                &burn_inputs,
            );
            let forecast = apply_forecast(&mut series, end.date_naive(), today, scope);
            (series, forecast)
        }
        _ => {
            warnings.push("sprint dates incomplete; burn-down series unavailable".into());
            (Vec::new(), SprintForecast::default())
        }
    };

    Ok(SprintReport {
        sprint_id: sprint.id,
        sprint_name: sprint.name.clone(),
        state: sprint.state.clone(),
        start_date: sprint_start.map(|dt| dt.date_naive()),
        end_date: sprint.ends_at().map(|dt| dt.date_naive()),
        kpis,
        burn,
        forecast,
        completed_by_assignee: completed,
        issues,
        skipped,
        warnings,
    })
}

#[derive(Debug, Default)]
pub struct LifecycleView {
    pub report: LifecycleReport,
    /// Keys the requested Jira actor touched inside the window without a
    /// matching PR. Empty unless an actor was given.
    pub touched_issues: Vec<String>,
    pub warnings: Vec<String>,
}

/// Per-PR lifecycle metrics for one author over a date range. Issue keys
/// found in PR titles pull in Jira context (work-started time and display
/// metadata); candidate keys that do not resolve are simply not linked.
pub async fn build_lifecycle_report(
    github: &dyn GithubClient,
    jira: &dyn JiraClient,
    groups: &StatusGroups,
    author: &str,
    jira_actor: Option<&str>,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<LifecycleView> {
    let mut prs = github.search_prs(author, from, to).await?;
    let mut warnings = Vec::new();

    let mut keys: Vec<String> = Vec::new();
    for pr in &prs {
        for key in candidate_keys(&pr.title) {
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
    }

    let window = jira_actor.map(|_| {
        let start = from.and_time(NaiveTime::MIN).and_utc();
        let end =
            (to.and_time(NaiveTime::MIN) + Duration::days(1) - Duration::seconds(1)).and_utc();
        (start, end)
    });

    // PR titles only surface keys that made it into a PR. The actor's
    // recently-updated issues widen the candidate set so work without a
    // PR can still show up as touched.
    if let Some(actor) = jira_actor {
        let jql = format!(
            "assignee = \"{actor}\" AND updated >= \"{from}\" AND updated <= \"{to} 23:59\""
        );
        match jira.search_issues(&jql, false).await {
            Ok(issues) => {
                for issue in issues {
                    if !keys.contains(&issue.key) {
                        keys.push(issue.key);
                    }
                }
            }
            Err(err) => {
                warn!(error = %err, "touched-issue search failed");
                warnings.push(format!("touched-issue search failed: {err}"));
            }
        }
    }

    let mut known: HashSet<String> = HashSet::new();
    let mut work_started_by_key: HashMap<String, DateTime<Utc>> = HashMap::new();
    let mut meta_by_key: HashMap<String, LinkedIssueMeta> = HashMap::new();
    let extraction = extract_phase_times(jira, &keys, groups, window, jira_actor).await;
    for skip in &extraction.skipped {
        // Title tokens are heuristic; a miss is expected, not a warning.
        debug!(key = %skip.key, reason = %skip.reason, "candidate key did not resolve");
    }
    for (key, phase) in &extraction.times {
        known.insert(key.clone());
        if let Some(started) = phase.in_progress_at {
            work_started_by_key.insert(key.clone(), started);
        }
    }
    for key in &known {
        match jira.issue_with_changelog(key).await {
            Ok(issue) => {
                meta_by_key.insert(
                    key.clone(),
                    LinkedIssueMeta {
                        key: key.clone(),
                        summary: issue.fields.summary.clone(),
                        status: issue.fields.status_name().map(str::to_string),
                    },
                );
            }
            Err(err) => {
                warn!(key = %key, error = %err, "issue metadata fetch failed");
                warnings.push(format!("issue metadata fetch failed for {key}: {err}"));
            }
        }
    }

    attach_issue_keys(&mut prs, &known);

    let linked_keys: HashSet<&String> = prs.iter().flat_map(|pr| pr.issue_keys.iter()).collect();
    let mut touched_issues: Vec<String> = extraction
        .times
        .iter()
        .filter(|(key, phase)| phase.touched_in_window && !linked_keys.contains(key))
        .map(|(key, _)| key.clone())
        .collect();
    touched_issues.sort();
    drop(linked_keys);

    let mut work_started_by_url: HashMap<String, DateTime<Utc>> = HashMap::new();
    let mut meta_by_url: HashMap<String, LinkedIssueMeta> = HashMap::new();
    for pr in &prs {
        let Some(key) = pr.issue_keys.first() else {
            continue;
        };
        if let Some(started) = work_started_by_key.get(key) {
            work_started_by_url.insert(pr.url.clone(), *started);
        }
        if let Some(meta) = meta_by_key.get(key) {
            meta_by_url.insert(pr.url.clone(), meta.clone());
        }
    }

    let report = aggregate_lifecycle(prs, &work_started_by_url, &meta_by_url);
    Ok(LifecycleView {
        report,
        touched_issues,
        warnings,
    })
}

#[derive(Debug, Default)]
pub struct DailyView {
    pub buckets: Vec<DailyBucket>,
    pub warnings: Vec<String>,
}

/// Daily PR and resolved-ticket counts for one author over a date range.
/// A Jira-side failure degrades to a PR-only timeseries plus a warning.
pub async fn build_daily_report(
    github: &dyn GithubClient,
    jira: &dyn JiraClient,
    field_map: &FieldMap,
    author: &str,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<DailyView> {
    let prs = github.search_prs(author, from, to).await?;
    let mut warnings = Vec::new();

    let jql = format!(
        "assignee = \"{author}\" AND resolutiondate >= \"{from}\" AND resolutiondate <= \"{to} 23:59\""
    );
    let issues: Vec<ResolvedIssue> = match jira.search_issues(&jql, false).await {
        Ok(issues) => issues
            .iter()
            .map(|issue| ResolvedIssue {
                resolved_at: issue.fields.resolved_at(),
                story_points: field_map.story_points(&issue.fields),
            })
            .collect(),
        Err(err) => {
            warn!(error = %err, "resolved-issue search failed");
            warnings.push(format!("resolved-issue search failed: {err}"));
            Vec::new()
        }
    };

    Ok(DailyView {
        buckets: aggregate_daily(from, to, &prs, &issues),
        warnings,
    })
}
