//! `/healthz` and `/readyz` endpoints.

use std::time::Instant;

use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `"ok"`, or `"shutting_down"` once shutdown started.
    pub status: String,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Bridged sessions currently running.
    pub active_sessions: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, active_sessions: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        uptime_secs: start_time.elapsed().as_secs(),
        active_sessions,
    }
}

/// Readiness: healthy until shutdown starts.
pub fn readiness(start_time: Instant, active_sessions: usize, shutting_down: bool) -> HealthResponse {
    let mut resp = health_check(start_time, active_sessions);
    if shutting_down {
        resp.status = "shutting_down".into();
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_ok() {
        let resp = health_check(Instant::now(), 0);
        assert_eq!(resp.status, "ok");
        assert!(resp.uptime_secs < 2);
    }

    #[test]
    fn uptime_increases() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        assert!(health_check(start, 0).uptime_secs >= 59);
    }

    #[test]
    fn readiness_reports_shutdown() {
        assert_eq!(readiness(Instant::now(), 1, false).status, "ok");
        let resp = readiness(Instant::now(), 1, true);
        assert_eq!(resp.status, "shutting_down");
        assert_eq!(resp.active_sessions, 1);
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_value(health_check(Instant::now(), 3)).unwrap();
        assert_eq!(json["active_sessions"], 3);
        assert!(json["uptime_secs"].is_u64());
    }
}
