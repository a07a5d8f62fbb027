//! Hub lifecycle and configuration.

use wsbridge::wsbridge_core::error::ErrorKind;
use wsbridge::{BridgeConfig, HostValue, Hub, MockEngine, RoleKind};

use crate::helpers;

#[test]
fn test_shutdown_requires_all_groups_deleted() {
    let hub = helpers::hub();
    let server_group = hub.server().create_group().unwrap();
    let client_group = hub.client().create_group().unwrap();
    assert_eq!(hub.engine().group_role(client_group.handle()), Some(RoleKind::Client));

    let err = hub.shutdown().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Lifecycle);

    hub.server().delete_group(server_group).unwrap();
    hub.client().delete_group(client_group).unwrap();
    hub.shutdown().unwrap();
    hub.shutdown().unwrap();

    let err = hub.server().create_group().unwrap_err();
    assert_eq!(err.kind, ErrorKind::Lifecycle);
}

#[test]
fn test_connect_uses_configured_timeout() {
    let config = BridgeConfig::from_toml("connect_timeout_ms = 750").unwrap();
    let hub = Hub::new(MockEngine::new(), config).unwrap();
    let group = hub.client().create_group().unwrap();

    hub.connect_host(&group.to_host(), &HostValue::from("ws://example.test/"), &HostValue::Null)
        .unwrap();
    let connects = hub.engine().connects();
    assert_eq!(connects[0].timeout.as_millis(), 750);
    assert_eq!(connects[0].uri, "ws://example.test/");
}

#[test]
fn test_default_connect_timeout_is_five_seconds() {
    let hub = helpers::hub();
    assert_eq!(hub.config().connect_timeout().as_millis(), 5000);
}

#[test]
fn test_invalid_config_rejected() {
    let err = Hub::new(
        MockEngine::new(),
        BridgeConfig {
            connect_timeout_ms: 0,
            ..BridgeConfig::default()
        },
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Configuration);
}

#[test]
fn test_tracing_init_is_idempotent() {
    let logging = wsbridge::LoggingConfig {
        level: "debug".to_string(),
        format: "pretty".to_string(),
    };
    wsbridge::init_tracing(&logging);
    assert!(!wsbridge::init_tracing(&logging));
}

#[test]
fn test_metrics_snapshot_serializes() {
    let hub = helpers::hub();
    let group = hub.server().create_group().unwrap();
    hub.server().delete_group(group).unwrap();

    let json: serde_json::Value = serde_json::from_str(&hub.metrics().to_json().unwrap()).unwrap();
    assert_eq!(json["groups_created"], 1);
    assert_eq!(json["groups_deleted"], 1);
}
