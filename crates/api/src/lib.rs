pub mod auth;
pub mod dto;
pub mod error;
pub mod metrics;
pub mod routes;
pub mod stream;

pub use routes::{build_router, ApiState};
