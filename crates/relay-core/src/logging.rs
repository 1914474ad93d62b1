//! `tracing` subscriber bootstrap.
//!
//! Both binaries log to stderr. `RUST_LOG` wins over the configured level when
//! set. Per-session context (session id, stream shape) travels in spans.

use tracing_subscriber::EnvFilter;

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install a compact human-readable subscriber.
///
/// Call once at startup. Later calls are no-ops.
pub fn init_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // no-op if a global subscriber is already set
    let _ = subscriber.try_init();
}

/// Install a newline-delimited JSON subscriber for log shippers.
pub fn init_json_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .json()
        .with_current_span(true);

    let _ = subscriber.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_init_is_harmless() {
        init_subscriber("warn");
        init_subscriber("debug");
        init_json_subscriber("info");
    }

    #[test]
    fn invalid_level_falls_back_without_panic() {
        let _ = filter("not-a-level");
    }
}
