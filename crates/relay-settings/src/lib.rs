//! # relay-settings
//!
//! Layered configuration for the relay binaries.
//!
//! Settings are resolved from three layers (in priority order):
//! 1. **Compiled defaults**: [`RelaySettings::default()`]
//! 2. **Settings file**: `~/.relay/settings.json` or an explicit path,
//!    deep-merged over the defaults
//! 3. **Environment variables**: highest priority, see [`loader`]

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides_from, deep_merge, load_settings_from_path, settings_path,
};
pub use types::{GatewaySettings, LogFormat, LoggingSettings, RelaySettings, ResponderSettings};
