use serde::{Deserialize, Serialize};

/// Stream responder settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ResponderSettings {
    /// Bind address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Echoes sent per server-stream call.
    pub server_stream_count: u32,
    /// Pause between server-stream echoes, in milliseconds. Keep it below the
    /// gateway's pong wait.
    pub server_stream_interval_ms: u64,
}

impl Default for ResponderSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            server_stream_count: 5,
            server_stream_interval_ms: 1000,
        }
    }
}

impl ResponderSettings {
    /// The listen address, e.g. `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
