use serde::{Deserialize, Serialize};

/// WebSocket gateway settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GatewaySettings {
    /// HTTP bind address.
    pub http_host: String,
    /// HTTP listen port.
    pub http_port: u16,
    /// Responder host.
    pub grpc_server_host: String,
    /// Responder port.
    pub grpc_server_port: u16,
    /// Use TLS to the responder. Not supported; the gateway refuses to start.
    pub grpc_server_tls: bool,
    /// Send HTTP/2 keepalive pings to the responder.
    pub grpc_keepalive: bool,
    /// Keepalive ping interval in seconds.
    pub grpc_keepalive_time_secs: u64,
    /// Keepalive ack timeout in seconds.
    pub grpc_keepalive_timeout_secs: u64,
    /// Read window refreshed by each pong, in seconds.
    pub pong_wait_secs: u64,
    /// Per-write deadline, in seconds.
    pub write_wait_secs: u64,
    /// How long a bidirectional session waits for the receive leg after
    /// half-closing, in seconds.
    pub drain_timeout_secs: u64,
    /// Largest accepted inbound frame, in bytes.
    pub max_message_size: usize,
    /// Accepted `Origin` values. Empty accepts every origin.
    pub allowed_origins: Vec<String>,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            http_host: "0.0.0.0".to_string(),
            http_port: 80,
            grpc_server_host: "server".to_string(),
            grpc_server_port: 8080,
            grpc_server_tls: false,
            grpc_keepalive: false,
            grpc_keepalive_time_secs: 10,
            grpc_keepalive_timeout_secs: 20,
            pong_wait_secs: 30,
            write_wait_secs: 10,
            drain_timeout_secs: 30,
            max_message_size: 16 * 1024 * 1024,
            allowed_origins: Vec::new(),
        }
    }
}

impl GatewaySettings {
    /// The responder URI, e.g. `http://server:8080`.
    pub fn upstream_uri(&self) -> String {
        let scheme = if self.grpc_server_tls { "https" } else { "http" };
        format!(
            "{scheme}://{}:{}",
            self.grpc_server_host, self.grpc_server_port
        )
    }
}
