//! WsBridge: host-runtime bridge for an event-driven WebSocket engine.
//!
//! Re-exports the bridge and its core types, and wires up logging and
//! configuration the way an embedding host starts the bridge.

use tracing_subscriber::{EnvFilter, fmt};

pub use wsbridge_bridge;
pub use wsbridge_core;

pub use wsbridge_bridge::{
    ConnectionRef, Engine, EventKind, GroupRef, HostException, HostFunction, HostValue, Hub,
    Namespace, SendOutcome, Ticket, TicketCell, TicketInbox, TicketSender, TlsSession,
    UpgradeOutcome,
};
pub use wsbridge_core::config::{BridgeConfig, LoggingConfig};
pub use wsbridge_core::types::{Address, Client, OpCode, RoleKind, Server};
pub use wsbridge_core::{BridgeError, BridgeResult};

#[cfg(feature = "mock")]
pub use wsbridge_bridge::MockEngine;

/// Initialize tracing/logging.
///
/// `RUST_LOG` overrides the configured level. Returns false if a global
/// subscriber was already installed, which leaves that one in place.
pub fn init_tracing(config: &LoggingConfig) -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let installed = match config.format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .try_init(),
        _ => fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };
    installed.is_ok()
}

/// Load configuration for `env` and initialize logging from it.
///
/// The environment name defaults to `WSBRIDGE_ENV`, then `"development"`.
pub fn bootstrap(env: Option<&str>) -> BridgeResult<BridgeConfig> {
    let env = match env {
        Some(env) => env.to_string(),
        None => std::env::var("WSBRIDGE_ENV").unwrap_or_else(|_| "development".to_string()),
    };
    let config = BridgeConfig::load(&env)?;
    init_tracing(&config.logging);
    tracing::info!(
        env = %env,
        connect_timeout_ms = config.connect_timeout_ms,
        "WsBridge v{} configured",
        env!("CARGO_PKG_VERSION")
    );
    Ok(config)
}
