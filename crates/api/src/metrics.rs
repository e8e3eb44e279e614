use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, IntCounterVec};

static HTTP_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "http_requests_total",
        "HTTP requests served, by path and status",
        &["path", "status"]
    )
    .expect("http_requests counter")
});

pub async fn track_http(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let response = next.run(request).await;
    HTTP_REQUESTS
        .with_label_values(&[&path, response.status().as_str()])
        .inc();
    response
}
