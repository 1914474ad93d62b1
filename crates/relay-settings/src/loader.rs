//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`RelaySettings::default()`]
//! 2. If the settings file exists, deep-merge its values over the defaults
//! 3. Apply environment variable overrides (highest priority)
//!
//! Environment variables keep the names the deployed containers already set:
//!
//! | variable                  | field                                    |
//! |---------------------------|------------------------------------------|
//! | `HTTP_HOST`, `HTTP_PORT`  | `gateway.http_host`, `gateway.http_port` |
//! | `GRPC_SERVER_HOST/PORT`   | `gateway.grpc_server_host/port`          |
//! | `GRPC_SERVER_TLS`         | `gateway.grpc_server_tls`                |
//! | `GRPC_KEEPALIVE[_TIME/_TIMEOUT]` | `gateway.grpc_keepalive*`         |
//! | `WS_PONG_WAIT_SECS`, `WS_WRITE_WAIT_SECS`, `WS_DRAIN_TIMEOUT_SECS` | liveness |
//! | `WS_MAX_MESSAGE_SIZE`     | `gateway.max_message_size`               |
//! | `WS_ALLOWED_ORIGINS`      | `gateway.allowed_origins` (comma list)   |
//! | `HOST`, `PORT`            | `responder.host`, `responder.port`       |
//! | `SERVER_STREAM_COUNT`, `SERVER_STREAM_INTERVAL_MS` | responder pacing |
//! | `LOG_LEVEL`, `LOG_FORMAT` | `logging.*`                              |

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::{Result, SettingsError};
use crate::types::{LogFormat, RelaySettings};

/// Resolve the default settings file (`~/.relay/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".relay").join("settings.json")
}

/// Load settings from `path` with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or values that do not fit
/// the schema are errors.
pub fn load_settings_from_path(path: &Path) -> Result<RelaySettings> {
    let mut settings = load_file(path)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

fn load_file(path: &Path) -> Result<RelaySettings> {
    let defaults = serde_json::to_value(RelaySettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Reject combinations the relay cannot run with.
fn validate(settings: &RelaySettings) -> Result<()> {
    let gateway = &settings.gateway;
    if gateway.pong_wait_secs == 0 {
        return Err(SettingsError::InvalidValue(
            "gateway.pongWaitSecs must be positive".into(),
        ));
    }
    if gateway.write_wait_secs == 0 {
        return Err(SettingsError::InvalidValue(
            "gateway.writeWaitSecs must be positive".into(),
        ));
    }
    let pong_wait_ms = gateway.pong_wait_secs.saturating_mul(1000);
    if settings.responder.server_stream_interval_ms >= pong_wait_ms {
        warn!(
            interval_ms = settings.responder.server_stream_interval_ms,
            pong_wait_secs = gateway.pong_wait_secs,
            "server stream interval is not below the gateway pong wait"
        );
    }
    Ok(())
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(settings: &mut RelaySettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from any variable source.
///
/// Invalid values are logged and ignored, leaving the file/default value.
pub fn apply_overrides_from(settings: &mut RelaySettings, lookup: impl Fn(&str) -> Option<String>) {
    let env = Env { lookup };

    // ── Gateway ─────────────────────────────────────────────────────
    let gateway = &mut settings.gateway;
    if let Some(v) = env.string("HTTP_HOST") {
        gateway.http_host = v;
    }
    if let Some(v) = env.u16("HTTP_PORT", 1, 65535) {
        gateway.http_port = v;
    }
    if let Some(v) = env.string("GRPC_SERVER_HOST") {
        gateway.grpc_server_host = v;
    }
    if let Some(v) = env.u16("GRPC_SERVER_PORT", 1, 65535) {
        gateway.grpc_server_port = v;
    }
    if let Some(v) = env.bool("GRPC_SERVER_TLS") {
        gateway.grpc_server_tls = v;
    }
    if let Some(v) = env.bool("GRPC_KEEPALIVE") {
        gateway.grpc_keepalive = v;
    }
    if let Some(v) = env.u64("GRPC_KEEPALIVE_TIME", 1, 86_400) {
        gateway.grpc_keepalive_time_secs = v;
    }
    if let Some(v) = env.u64("GRPC_KEEPALIVE_TIMEOUT", 1, 86_400) {
        gateway.grpc_keepalive_timeout_secs = v;
    }
    if let Some(v) = env.u64("WS_PONG_WAIT_SECS", 1, 3600) {
        gateway.pong_wait_secs = v;
    }
    if let Some(v) = env.u64("WS_WRITE_WAIT_SECS", 1, 3600) {
        gateway.write_wait_secs = v;
    }
    if let Some(v) = env.u64("WS_DRAIN_TIMEOUT_SECS", 1, 3600) {
        gateway.drain_timeout_secs = v;
    }
    if let Some(v) = env.usize("WS_MAX_MESSAGE_SIZE", 1024, 1 << 30) {
        gateway.max_message_size = v;
    }
    if let Some(v) = env.string("WS_ALLOWED_ORIGINS") {
        gateway.allowed_origins = parse_list(&v);
    }

    // ── Responder ───────────────────────────────────────────────────
    let responder = &mut settings.responder;
    if let Some(v) = env.string("HOST") {
        responder.host = v;
    }
    if let Some(v) = env.u16("PORT", 1, 65535) {
        responder.port = v;
    }
    if let Some(v) = env.u64("SERVER_STREAM_COUNT", 1, 10_000) {
        responder.server_stream_count = u32::try_from(v).unwrap_or(u32::MAX);
    }
    if let Some(v) = env.u64("SERVER_STREAM_INTERVAL_MS", 0, 3_600_000) {
        responder.server_stream_interval_ms = v;
    }

    // ── Logging ─────────────────────────────────────────────────────
    if let Some(v) = env.string("LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = env.string("LOG_FORMAT") {
        match parse_log_format(&v) {
            Some(format) => settings.logging.format = format,
            None => warn!(key = "LOG_FORMAT", value = %v, "invalid log format, ignoring"),
        }
    }
}

// ── Pure parsing functions ──────────────────────────────────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_list(val: &str) -> Vec<String> {
    val.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn parse_log_format(val: &str) -> Option<LogFormat> {
    match val.trim().to_lowercase().as_str() {
        "compact" | "text" => Some(LogFormat::Compact),
        "json" => Some(LogFormat::Json),
        _ => None,
    }
}

// ── Variable readers ────────────────────────────────────────────────────────

struct Env<F> {
    lookup: F,
}

impl<F: Fn(&str) -> Option<String>> Env<F> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, kind: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        let val = self.string(name)?;
        let result = parse(&val);
        if result.is_none() {
            warn!(key = name, value = %val, "invalid {kind} env var, ignoring");
        }
        result
    }

    fn bool(&self, name: &str) -> Option<bool> {
        self.parsed(name, "boolean", parse_bool)
    }

    fn u16(&self, name: &str, min: u16, max: u16) -> Option<u16> {
        self.parsed(name, "u16", |v| parse_u16_range(v, min, max))
    }

    fn u64(&self, name: &str, min: u64, max: u64) -> Option<u64> {
        self.parsed(name, "u64", |v| parse_u64_range(v, min, max))
    }

    fn usize(&self, name: &str, min: usize, max: usize) -> Option<usize> {
        self.parsed(name, "usize", |v| parse_usize_range(v, min, max))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn apply(vars: &[(&str, &str)]) -> RelaySettings {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        let mut settings = RelaySettings::default();
        apply_overrides_from(&mut settings, |name| map.get(name).cloned());
        settings
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"gateway": {"httpPort": 80, "httpHost": "0.0.0.0"}});
        let source = serde_json::json!({"gateway": {"httpPort": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["gateway"]["httpPort"], 9090);
        assert_eq!(merged["gateway"]["httpHost"], "0.0.0.0");
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"origins": ["a", "b"]});
        let source = serde_json::json!({"origins": ["c"]});
        assert_eq!(deep_merge(target, source)["origins"], serde_json::json!(["c"]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_primitive_replaces_object() {
        let target = serde_json::json!({"a": {"nested": true}});
        let source = serde_json::json!({"a": 42});
        assert_eq!(deep_merge(target, source)["a"], 42);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_file(&dir.path().join("missing.json")).unwrap();
        assert_eq!(settings, RelaySettings::default());
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"gateway": {"grpcServerHost": "localhost"}, "responder": {"serverStreamCount": 3}}"#,
        )
        .unwrap();

        let settings = load_file(&path).unwrap();
        assert_eq!(settings.gateway.grpc_server_host, "localhost");
        assert_eq!(settings.gateway.grpc_server_port, 8080);
        assert_eq!(settings.responder.server_stream_count, 3);
        assert_eq!(settings.responder.server_stream_interval_ms, 1000);
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();
        assert_matches!(load_settings_from_path(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn load_wrong_type_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"gateway": {"httpPort": "eighty"}}"#).unwrap();
        assert_matches!(load_file(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn load_huge_pong_wait_does_not_overflow() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"gateway": {"pongWaitSecs": 18446744073709552}}"#).unwrap();

        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.gateway.pong_wait_secs, 18_446_744_073_709_552);
    }

    #[test]
    fn validate_accepts_max_pong_wait() {
        let mut settings = RelaySettings::default();
        settings.gateway.pong_wait_secs = u64::MAX;
        settings.responder.server_stream_interval_ms = u64::MAX;
        assert!(validate(&settings).is_ok());
    }

    #[test]
    fn validate_rejects_zero_pong_wait() {
        let mut settings = RelaySettings::default();
        settings.gateway.pong_wait_secs = 0;
        assert_matches!(validate(&settings), Err(SettingsError::InvalidValue(_)));
    }

    #[test]
    fn validate_accepts_defaults() {
        assert!(validate(&RelaySettings::default()).is_ok());
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn gateway_env_overrides() {
        let settings = apply(&[
            ("HTTP_PORT", "8000"),
            ("GRPC_SERVER_HOST", "responder"),
            ("GRPC_SERVER_PORT", "9000"),
            ("GRPC_KEEPALIVE", "yes"),
            ("GRPC_KEEPALIVE_TIME", "15"),
            ("WS_ALLOWED_ORIGINS", "https://a.example, https://b.example,"),
        ]);
        assert_eq!(settings.gateway.http_port, 8000);
        assert_eq!(settings.gateway.upstream_uri(), "http://responder:9000");
        assert!(settings.gateway.grpc_keepalive);
        assert_eq!(settings.gateway.grpc_keepalive_time_secs, 15);
        assert_eq!(
            settings.gateway.allowed_origins,
            vec!["https://a.example", "https://b.example"]
        );
    }

    #[test]
    fn responder_env_overrides() {
        let settings = apply(&[
            ("PORT", "7000"),
            ("SERVER_STREAM_COUNT", "3"),
            ("SERVER_STREAM_INTERVAL_MS", "0"),
        ]);
        assert_eq!(settings.responder.port, 7000);
        assert_eq!(settings.responder.server_stream_count, 3);
        assert_eq!(settings.responder.server_stream_interval_ms, 0);
    }

    #[test]
    fn invalid_env_values_are_ignored() {
        let settings = apply(&[
            ("HTTP_PORT", "0"),
            ("GRPC_SERVER_TLS", "maybe"),
            ("WS_PONG_WAIT_SECS", "-5"),
            ("LOG_FORMAT", "pretty"),
        ]);
        let defaults = RelaySettings::default();
        assert_eq!(settings.gateway.http_port, defaults.gateway.http_port);
        assert!(!settings.gateway.grpc_server_tls);
        assert_eq!(settings.gateway.pong_wait_secs, 30);
        assert_eq!(settings.logging.format, LogFormat::Compact);
    }

    #[test]
    fn empty_env_values_are_ignored() {
        let settings = apply(&[("GRPC_SERVER_HOST", ""), ("LOG_LEVEL", "")]);
        assert_eq!(settings.gateway.grpc_server_host, "server");
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn logging_env_overrides() {
        let settings = apply(&[("LOG_LEVEL", "debug"), ("LOG_FORMAT", "JSON")]);
        assert_eq!(settings.logging.level, "debug");
        assert_eq!(settings.logging.format, LogFormat::Json);
    }

    // ── parsers ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for t in ["true", "1", "YES", "on"] {
            assert_eq!(parse_bool(t), Some(true), "{t}");
        }
        for f in ["false", "0", "No", "OFF"] {
            assert_eq!(parse_bool(f), Some(false), "{f}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("80", 1, 65535), Some(80));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u16_range("70000", 1, 65535), None);
        assert_eq!(parse_u64_range(" 30 ", 1, 3600), Some(30));
        assert_eq!(parse_usize_range("abc", 0, 10), None);
    }

    #[test]
    fn parse_list_trims_and_drops_blanks() {
        assert_eq!(parse_list(" a ,, b "), vec!["a", "b"]);
        assert!(parse_list("").is_empty());
    }
}
