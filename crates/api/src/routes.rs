use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use chrono::{NaiveDate, Utc};
use github::GithubClient;
use insights::phase::StatusGroups;
use insights::{build_daily_report, build_lifecycle_report, build_sprint_report};
use jira::fields::FieldMap;
use jira::JiraClient;
use prometheus::Encoder;
use serde::Deserialize;
use serde_json::json;
use tracing::{instrument, warn};

use crate::auth::{login, logout, require_auth};
use crate::dto::{
    DailyPointDto, JiraUserDto, LifecycleStatsDto, PrLifecycleDto, ProjectDto, SprintDto,
    SprintStatsDto,
};
use crate::error::{ApiError, ApiResult};
use crate::{metrics, stream};

pub struct ApiState {
    pub github: Arc<dyn GithubClient>,
    pub jira: Arc<dyn JiraClient>,
    pub field_map: FieldMap,
    pub groups: StatusGroups,
    pub credentials: HashMap<String, String>,
    pub cookie_secret: String,
    pub pr_stats_batch: usize,
}

pub fn build_router(state: Arc<ApiState>) -> Router {
    let protected = Router::new()
        .route("/api/logout", post(logout))
        .route("/api/stats/daily", get(stats_daily))
        .route("/api/stats/lifecycle", get(stats_lifecycle))
        .route("/api/jira/projects", get(jira_projects))
        .route("/api/jira/users", get(jira_users))
        .route("/api/github/members", get(github_members))
        .route("/api/sprints", get(list_sprints))
        .route("/api/sprint/stats", get(sprint_stats))
        .route("/api/sprint/stats/stream", get(stream::sprint_stats_stream))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(serve_metrics))
        .route("/api/login", post(login))
        .merge(protected)
        .layer(middleware::from_fn(metrics::track_http))
        .with_state(state)
}

async fn healthz() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

async fn serve_metrics() -> ApiResult<impl IntoResponse> {
    let encoder = prometheus::TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    let content_type = encoder.format_type().to_string();
    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok((
        axum::http::StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, content_type)],
        buffer,
    ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    from: Option<String>,
    to: Option<String>,
    author: Option<String>,
    jira_user: Option<String>,
}

struct Range {
    from: NaiveDate,
    to: NaiveDate,
    author: String,
    jira_user: Option<String>,
}

fn parse_date(value: &str, name: &str) -> ApiResult<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| ApiError::bad_request(format!("invalid {name} date: {value}")))
}

fn parse_range(query: RangeQuery) -> ApiResult<Range> {
    let from = query
        .from
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("missing from parameter"))?;
    let to = query
        .to
        .as_deref()
        .ok_or_else(|| ApiError::bad_request("missing to parameter"))?;
    let author = query
        .author
        .filter(|a| !a.is_empty())
        .ok_or_else(|| ApiError::bad_request("missing author parameter"))?;
    let from = parse_date(from, "from")?;
    let to = parse_date(to, "to")?;
    if from > to {
        return Err(ApiError::bad_request("from must not be after to"));
    }
    let jira_user = query.jira_user.filter(|u| !u.is_empty());
    Ok(Range {
        from,
        to,
        author,
        jira_user,
    })
}

#[instrument(skip(state, query))]
async fn stats_daily(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<Vec<DailyPointDto>>> {
    let range = parse_range(query)?;
    let view = build_daily_report(
        state.github.as_ref(),
        state.jira.as_ref(),
        &state.field_map,
        &range.author,
        range.from,
        range.to,
    )
    .await?;
    for warning in &view.warnings {
        warn!(warning = %warning, "daily stats degraded");
    }
    Ok(Json(view.buckets.into_iter().map(DailyPointDto::from).collect()))
}

#[instrument(skip(state, query))]
async fn stats_lifecycle(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<RangeQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    let range = parse_range(query)?;
    let view = build_lifecycle_report(
        state.github.as_ref(),
        state.jira.as_ref(),
        &state.groups,
        &range.author,
        range.jira_user.as_deref(),
        range.from,
        range.to,
    )
    .await?;
    let prs: Vec<PrLifecycleDto> = view.report.prs.into_iter().map(PrLifecycleDto::from).collect();
    let stats = LifecycleStatsDto::from(view.report.stats);
    Ok(Json(json!({
        "prs": prs,
        "stats": stats,
        "touchedIssues": view.touched_issues,
        "warnings": view.warnings,
    })))
}

#[instrument(skip(state))]
async fn jira_projects(State(state): State<Arc<ApiState>>) -> ApiResult<Json<Vec<ProjectDto>>> {
    let projects = state.jira.list_projects().await?;
    Ok(Json(projects.into_iter().map(ProjectDto::from).collect()))
}

#[instrument(skip(state))]
async fn jira_users(State(state): State<Arc<ApiState>>) -> ApiResult<Json<Vec<JiraUserDto>>> {
    let users = state.jira.list_users().await?;
    Ok(Json(users.into_iter().map(JiraUserDto::from).collect()))
}

#[instrument(skip(state))]
async fn github_members(State(state): State<Arc<ApiState>>) -> ApiResult<Json<Vec<String>>> {
    Ok(Json(state.github.org_members().await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintsQuery {
    board_id: Option<u64>,
}

#[instrument(skip(state, query))]
async fn list_sprints(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<SprintsQuery>,
) -> ApiResult<Json<Vec<SprintDto>>> {
    let board_id = query
        .board_id
        .ok_or_else(|| ApiError::bad_request("missing boardId parameter"))?;
    let sprints = state.jira.board_sprints(board_id).await?;
    Ok(Json(sprints.into_iter().map(SprintDto::from).collect()))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintStatsQuery {
    pub sprint_id: Option<u64>,
    #[allow(dead_code)]
    pub board_id: Option<u64>,
}

#[instrument(skip(state, query))]
async fn sprint_stats(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<SprintStatsQuery>,
) -> ApiResult<Json<SprintStatsDto>> {
    let sprint_id = query
        .sprint_id
        .ok_or_else(|| ApiError::bad_request("missing sprintId parameter"))?;
    let report = build_sprint_report(
        state.jira.as_ref(),
        state.github.as_ref(),
        &state.field_map,
        &state.groups,
        state.pr_stats_batch,
        sprint_id,
        Utc::now(),
    )
    .await?;
    Ok(Json(SprintStatsDto::from(report)))
}
