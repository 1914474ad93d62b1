//! Settings types.
//!
//! Every struct uses `#[serde(rename_all = "camelCase", default)]` so a
//! settings file only needs the keys it changes.

mod gateway;
mod logging;
mod responder;

pub use gateway::GatewaySettings;
pub use logging::{LogFormat, LoggingSettings};
pub use responder::ResponderSettings;

use serde::{Deserialize, Serialize};

/// Root settings for both relay binaries.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RelaySettings {
    /// WebSocket gateway.
    pub gateway: GatewaySettings,
    /// Stream responder.
    pub responder: ResponderSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_object_deserializes_to_defaults() {
        let settings: RelaySettings = serde_json::from_str("{}").unwrap();
        assert_eq!(settings, RelaySettings::default());
    }

    #[test]
    fn serializes_camel_case_keys() {
        let json = serde_json::to_value(RelaySettings::default()).unwrap();
        assert!(json["gateway"]["grpcServerHost"].is_string());
        assert!(json["responder"]["serverStreamIntervalMs"].is_u64());
        assert!(json["logging"]["format"].is_string());
    }
}
