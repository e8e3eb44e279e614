pub mod client;
pub mod metrics;
pub mod models;

pub use client::{GithubApiError, GithubClient, RestGithubClient};
pub use models::{parse_pr_url, PrState, PrStats, PullRequest, RepoRef};
