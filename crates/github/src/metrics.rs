use once_cell::sync::Lazy;
use prometheus::{register_int_counter_vec, IntCounterVec};

pub static REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    register_int_counter_vec!(
        "github_requests_total",
        "GitHub API requests by operation and outcome",
        &["op", "outcome"]
    )
    .expect("github requests total")
});

pub fn observe(op: &str, ok: bool) {
    let outcome = if ok { "success" } else { "error" };
    REQUESTS_TOTAL.with_label_values(&[op, outcome]).inc();
}
