use std::sync::Arc;

use anyhow::Result;
use api::{build_router, ApiState};
use axum::Router;
use common::{config::AppConfig, logging};
use github::{GithubClient, RestGithubClient};
use insights::StatusGroups;
use jira::{FieldMap, JiraClient, RestJiraClient};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_logging();
    let config = AppConfig::load()?;

    let github: Arc<dyn GithubClient> = Arc::new(RestGithubClient::new(config.github.clone())?);
    let jira: Arc<dyn JiraClient> = Arc::new(RestJiraClient::new(config.jira.clone())?);
    let state = Arc::new(ApiState {
        github,
        jira,
        field_map: FieldMap::new(config.jira.fields.clone()),
        groups: StatusGroups::new(&config.jira.status_groups),
        credentials: config.auth.credential_map(),
        cookie_secret: config.auth.cookie_secret.clone(),
        pr_stats_batch: config.fetch.pr_stats_batch,
    });
    let app: Router = build_router(state);

    let addr: std::net::SocketAddr = config.api.bind.parse()?;
    info!("api listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
