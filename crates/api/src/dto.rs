use chrono::{DateTime, NaiveDate, Utc};
use insights::lifecycle::{LifecycleStats, PrLifecycle};
use insights::report::{SprintIssue, SprintReport};
use insights::sprint::{
    AssigneeCompletion, BurnPoint, SprintForecast, SprintKpis, TrackForecast,
};
use insights::timeseries::DailyBucket;
use jira::models::{JiraUser, Project, Sprint};
use serde::Serialize;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPointDto {
    pub date: NaiveDate,
    pub pr_count: u64,
    pub additions: i64,
    pub deletions: i64,
    pub tickets: u64,
    pub story_points: f64,
}

impl From<DailyBucket> for DailyPointDto {
    fn from(bucket: DailyBucket) -> Self {
        Self {
            date: bucket.date,
            pr_count: bucket.pr_count,
            additions: bucket.additions,
            deletions: bucket.deletions,
            tickets: bucket.tickets,
            story_points: bucket.story_points,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedIssueDto {
    pub key: String,
    pub summary: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrLifecycleDto {
    pub number: u64,
    pub title: String,
    pub url: String,
    pub repo: String,
    pub state: github::models::PrState,
    pub is_draft: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub merged_at: Option<DateTime<Utc>>,
    pub closed_at: Option<DateTime<Utc>>,
    pub additions: i64,
    pub deletions: i64,
    pub time_to_ready_hours: Option<f64>,
    pub time_to_first_review_hours: Option<f64>,
    pub review_to_merge_hours: Option<f64>,
    pub cycle_time_hours: Option<f64>,
    pub in_progress_to_created_hours: Option<f64>,
    pub issue: Option<LinkedIssueDto>,
}

impl From<PrLifecycle> for PrLifecycleDto {
    fn from(record: PrLifecycle) -> Self {
        Self {
            number: record.pr.number,
            title: record.pr.title.clone(),
            url: record.pr.url.clone(),
            repo: format!("{}/{}", record.pr.repo.owner, record.pr.repo.name),
            state: record.pr.state,
            is_draft: record.pr.is_draft,
            created_at: record.pr.created_at,
            merged_at: record.pr.merged_at,
            closed_at: record.pr.closed_at,
            additions: record.pr.additions,
            deletions: record.pr.deletions,
            time_to_ready_hours: record.time_to_ready_hours,
            time_to_first_review_hours: record.time_to_first_review_hours,
            review_to_merge_hours: record.review_to_merge_hours,
            cycle_time_hours: record.cycle_time_hours,
            in_progress_to_created_hours: record.in_progress_to_created_hours,
            issue: record.linked_issue.map(|meta| LinkedIssueDto {
                key: meta.key,
                summary: meta.summary,
                status: meta.status,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifecycleStatsDto {
    pub sample_size: usize,
    pub median_time_to_ready_hours: Option<f64>,
    pub median_time_to_first_review_hours: Option<f64>,
    pub median_review_to_merge_hours: Option<f64>,
    pub median_cycle_time_hours: Option<f64>,
    pub median_in_progress_to_created_hours: Option<f64>,
}

impl From<LifecycleStats> for LifecycleStatsDto {
    fn from(stats: LifecycleStats) -> Self {
        Self {
            sample_size: stats.sample_size,
            median_time_to_ready_hours: stats.median_time_to_ready_hours,
            median_time_to_first_review_hours: stats.median_time_to_first_review_hours,
            median_review_to_merge_hours: stats.median_review_to_merge_hours,
            median_cycle_time_hours: stats.median_cycle_time_hours,
            median_in_progress_to_created_hours: stats.median_in_progress_to_created_hours,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProjectDto {
    pub id: String,
    pub key: String,
    pub name: String,
}

impl From<Project> for ProjectDto {
    fn from(project: Project) -> Self {
        Self {
            id: project.id,
            key: project.key,
            name: project.name,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JiraUserDto {
    pub account_id: String,
    pub display_name: String,
    pub active: bool,
}

impl From<JiraUser> for JiraUserDto {
    fn from(user: JiraUser) -> Self {
        Self {
            account_id: user.account_id,
            display_name: user.display_name,
            active: user.active,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintDto {
    pub id: u64,
    pub name: String,
    pub state: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<Sprint> for SprintDto {
    fn from(sprint: Sprint) -> Self {
        Self {
            start_date: sprint.started_at().map(|dt| dt.date_naive()),
            end_date: sprint.ends_at().map(|dt| dt.date_naive()),
            id: sprint.id,
            name: sprint.name,
            state: sprint.state,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BurnPointDto {
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

impl From<BurnPoint> for BurnPointDto {
    fn from(point: BurnPoint) -> Self {
        Self {
            date: point.date,
            scope: point.scope,
            dev_completed: point.dev_completed,
            dev_remaining: point.dev_remaining,
            complete_completed: point.complete_completed,
            complete_remaining: point.complete_remaining,
            forecast_dev_completed: point.forecast_dev_completed,
            forecast_dev_remaining: point.forecast_dev_remaining,
            forecast_complete_completed: point.forecast_complete_completed,
            forecast_complete_remaining: point.forecast_complete_remaining,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackForecastDto {
    pub velocity_per_day: f64,
    pub completion_date: NaiveDate,
}

impl From<TrackForecast> for TrackForecastDto {
    fn from(track: TrackForecast) -> Self {
        Self {
            velocity_per_day: track.velocity_per_day,
            completion_date: track.completion_date,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ForecastDto {
    pub dev: Option<TrackForecastDto>,
    pub complete: Option<TrackForecastDto>,
}

impl ForecastDto {
    fn from_forecast(forecast: SprintForecast) -> Option<Self> {
        if forecast.dev.is_none() && forecast.complete.is_none() {
            return None;
        }
        Some(Self {
            dev: forecast.dev.map(TrackForecastDto::from),
            complete: forecast.complete.map(TrackForecastDto::from),
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintKpisDto {
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
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssigneeCompletionDto {
    pub assignee: String,
    pub dev_sp: f64,
    pub complete_sp: f64,
}

impl From<AssigneeCompletion> for AssigneeCompletionDto {
    fn from(entry: AssigneeCompletion) -> Self {
        Self {
            assignee: entry.assignee,
            dev_sp: entry.dev_sp,
            complete_sp: entry.complete_sp,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintIssueDto {
    pub key: String,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub assignee: Option<String>,
    pub story_points: f64,
    pub scope: insights::scope::ScopeClass,
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

impl From<SprintIssue> for SprintIssueDto {
    fn from(issue: SprintIssue) -> Self {
        Self {
            key: issue.key,
            summary: issue.summary,
            status: issue.status,
            assignee: issue.assignee,
            story_points: issue.story_points,
            scope: issue.scope,
            epic_key: issue.epic_key,
            qa_assignees: issue.qa_assignees,
            todo_at: issue.todo_at,
            in_progress_at: issue.in_progress_at,
            review_at: issue.review_at,
            dev_done_at: issue.dev_done_at,
            complete_at: issue.complete_at,
            in_progress_to_review_hours: issue.in_progress_to_review_hours,
            review_to_complete_hours: issue.review_to_complete_hours,
            pr_urls: issue.pr_urls,
            additions: issue.additions,
            deletions: issue.deletions,
            review_comments: issue.review_comments,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintStatsDto {
    pub sprint_id: u64,
    pub sprint_name: String,
    pub state: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub kpis: SprintKpisDto,
    pub burn: Vec<BurnPointDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<ForecastDto>,
    pub completed_by_assignee: Vec<AssigneeCompletionDto>,
    #[serde(rename = "ticketsInQA")]
    pub tickets_in_qa: u64,
    pub issues: Vec<SprintIssueDto>,
    pub skipped: Vec<String>,
    pub warnings: Vec<String>,
}

fn kpis_dto(kpis: &SprintKpis) -> SprintKpisDto {
    SprintKpisDto {
        committed_sp: kpis.committed_sp,
        added_sp: kpis.added_sp,
        removed_sp: kpis.removed_sp,
        total_scope: kpis.total_scope,
        dev_completed_sp: kpis.dev_completed_sp,
        dev_remaining_sp: kpis.dev_remaining_sp,
        dev_completed_pct: kpis.dev_completed_pct,
        complete_completed_sp: kpis.complete_completed_sp,
        complete_remaining_sp: kpis.complete_remaining_sp,
        complete_completed_pct: kpis.complete_completed_pct,
        total_additions: kpis.total_additions,
        total_deletions: kpis.total_deletions,
    }
}

impl From<SprintReport> for SprintStatsDto {
    fn from(report: SprintReport) -> Self {
        Self {
            sprint_id: report.sprint_id,
            sprint_name: report.sprint_name,
            state: report.state,
            start_date: report.start_date,
            end_date: report.end_date,
            kpis: kpis_dto(&report.kpis),
            burn: report.burn.into_iter().map(BurnPointDto::from).collect(),
            forecast: ForecastDto::from_forecast(report.forecast),
            completed_by_assignee: report
                .completed_by_assignee
                .into_iter()
                .map(AssigneeCompletionDto::from)
                .collect(),
            tickets_in_qa: report.kpis.tickets_in_qa,
            issues: report.issues.into_iter().map(SprintIssueDto::from).collect(),
            skipped: report
                .skipped
                .into_iter()
                .map(|skip| format!("{}: {}", skip.key, skip.reason))
                .collect(),
            warnings: report.warnings,
        }
    }
}
