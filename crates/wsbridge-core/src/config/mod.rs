//! Bridge configuration schemas.
//!
//! Configuration is deserialized from TOML files via the `config` crate and
//! can be overridden through `WSBRIDGE__*` environment variables.

pub mod bridge;
pub mod logging;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use self::bridge::TransferConfig;
pub use self::logging::LoggingConfig;

use crate::error::BridgeError;

/// Root bridge configuration.
///
/// Top-level deserialization target for the merged configuration sources
/// (default.toml + environment overlay + environment variables).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Timeout applied to every outbound client connect, in milliseconds.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// Socket transfer settings.
    #[serde(default)]
    pub transfer: TransferConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: default_connect_timeout_ms(),
            transfer: TransferConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Load configuration from TOML files.
    ///
    /// Merges `config/default` with an environment-specific overlay and
    /// environment variables prefixed with `WSBRIDGE__`, nested keys joined
    /// by `__` (`WSBRIDGE__TRANSFER__HANDOFF_CAPACITY`). Missing files are
    /// not an error; every field has a default.
    pub fn load(env: &str) -> Result<Self, BridgeError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{env}")).required(false))
            .add_source(
                config::Environment::with_prefix("WSBRIDGE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| BridgeError::configuration(format!("Failed to build config: {e}")))?;

        let loaded: Self = config
            .try_deserialize()
            .map_err(|e| BridgeError::configuration(format!("Failed to deserialize config: {e}")))?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Parse configuration from an in-memory TOML document.
    pub fn from_toml(document: &str) -> Result<Self, BridgeError> {
        let config = config::Config::builder()
            .add_source(config::File::from_str(document, config::FileFormat::Toml))
            .build()?;
        let loaded: Self = config.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Reject values that would make the bridge misbehave.
    pub fn validate(&self) -> Result<(), BridgeError> {
        if self.connect_timeout_ms == 0 {
            return Err(BridgeError::configuration(
                "connect_timeout_ms must be greater than zero",
            ));
        }
        if self.transfer.handoff_capacity == Some(0) {
            return Err(BridgeError::configuration(
                "transfer.handoff_capacity must be greater than zero when set",
            ));
        }
        Ok(())
    }

    /// Outbound connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

fn default_connect_timeout_ms() -> u64 {
    5000
}
