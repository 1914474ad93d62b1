//! Gateway configuration.
//!
//! Everything the upgrade path and the bridges need is carried here and
//! injected through router state.

use std::time::Duration;

use relay_settings::GatewaySettings;
use serde::{Deserialize, Serialize};

use crate::liveness::Liveness;

/// Configuration for the gateway server.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Read window refreshed by each pong, in milliseconds.
    pub pong_wait_ms: u64,
    /// Per-write deadline, in milliseconds.
    pub write_wait_ms: u64,
    /// Bidirectional drain bound after half-close, in milliseconds.
    pub drain_timeout_ms: u64,
    /// WebSocket read buffer size in bytes.
    pub read_buffer_size: usize,
    /// WebSocket write buffer size in bytes.
    pub write_buffer_size: usize,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Accepted `Origin` values. Empty accepts every origin.
    pub allowed_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            pong_wait_ms: 30_000,
            write_wait_ms: 10_000,
            drain_timeout_ms: 30_000,
            read_buffer_size: 1024,
            write_buffer_size: 1024,
            max_message_size: 16 * 1024 * 1024, // 16 MB
            allowed_origins: Vec::new(),
        }
    }
}

impl GatewayConfig {
    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Read window refreshed by each pong.
    pub fn pong_wait(&self) -> Duration {
        Duration::from_millis(self.pong_wait_ms)
    }

    /// Per-write deadline.
    pub fn write_wait(&self) -> Duration {
        Duration::from_millis(self.write_wait_ms)
    }

    /// Bidirectional drain bound.
    pub fn drain_timeout(&self) -> Duration {
        Duration::from_millis(self.drain_timeout_ms)
    }

    /// Liveness timings for one session.
    pub fn liveness(&self) -> Liveness {
        Liveness::new(self.pong_wait(), self.write_wait())
    }

    /// Whether an upgrade carrying `origin` may proceed.
    ///
    /// Requests without an `Origin` header are not from browsers and are
    /// always accepted.
    pub fn origin_allowed(&self, origin: Option<&str>) -> bool {
        match origin {
            Some(origin) if !self.allowed_origins.is_empty() => {
                self.allowed_origins.iter().any(|o| o == origin)
            }
            _ => true,
        }
    }
}

impl From<&GatewaySettings> for GatewayConfig {
    fn from(settings: &GatewaySettings) -> Self {
        Self {
            host: settings.http_host.clone(),
            port: settings.http_port,
            pong_wait_ms: settings.pong_wait_secs.saturating_mul(1000),
            write_wait_ms: settings.write_wait_secs.saturating_mul(1000),
            drain_timeout_ms: settings.drain_timeout_secs.saturating_mul(1000),
            max_message_size: settings.max_message_size,
            allowed_origins: settings.allowed_origins.clone(),
            ..Self::default()
        }
    }
}
