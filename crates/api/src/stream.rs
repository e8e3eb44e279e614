use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use chrono::Utc;
use insights::build_sprint_report;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, instrument};

use crate::dto::SprintStatsDto;
use crate::error::{ApiError, ApiResult};
use crate::routes::{ApiState, SprintStatsQuery};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(2);

/// Same computation as the plain sprint-stats route, wrapped in an SSE
/// stream: `progress` events while it runs, then one `result` (or `error`)
/// event. The computation runs in its own task, so a client closing the
/// connection stops the events but not the work.
#[instrument(skip(state, query))]
pub async fn sprint_stats_stream(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<SprintStatsQuery>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    let sprint_id = query
        .sprint_id
        .ok_or_else(|| ApiError::bad_request("missing sprintId parameter"))?;

    let (tx, rx) = mpsc::channel::<Event>(8);
    tokio::spawn(async move {
        let work = build_sprint_report(
            state.jira.as_ref(),
            state.github.as_ref(),
            &state.field_map,
            &state.groups,
            state.pr_stats_batch,
            sprint_id,
            Utc::now(),
        );
        tokio::pin!(work);

        let mut ticker = tokio::time::interval(PROGRESS_INTERVAL);
        ticker.tick().await;
        loop {
            tokio::select! {
                result = &mut work => {
                    let event = match result {
                        Ok(report) => Event::default()
                            .event("result")
                            .json_data(SprintStatsDto::from(report))
                            .unwrap_or_else(|err| {
                                Event::default().event("error").data(err.to_string())
                            }),
                        Err(err) => Event::default().event("error").data(err.to_string()),
                    };
                    if tx.send(event).await.is_err() {
                        debug!(sprint_id, "sse client went away before the result");
                    }
                    break;
                }
                _ = ticker.tick() => {
                    // A closed receiver only silences progress; the report
                    // still computes to completion.
                    let _ = tx.send(Event::default().event("progress").data("computing")).await;
                }
            }
        }
    });

    let stream = ReceiverStream::new(rx).map(Ok::<_, Infallible>);
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}
