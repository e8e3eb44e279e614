use tracing_subscriber::{fmt, EnvFilter};

/// Baseline directives when `RUST_LOG` is unset. The HTTP stack logs every
/// connection at info, which drowns the per-request spans this service
/// actually cares about.
const DEFAULT_DIRECTIVES: &str = "info,hyper=warn,reqwest=warn";

pub fn init_logging() {
    if tracing::dispatcher::has_been_set() {
        return;
    }

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_a_no_op() {
        init_logging();
        init_logging();
        assert!(tracing::dispatcher::has_been_set());
    }
}
