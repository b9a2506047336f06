//! Tests for pool options and relay configuration

use std::collections::HashMap;
use std::time::Duration;

use relay_pool::config::{PoolOption, PoolOptions, RelayConfig, DEFAULT_ACQUIRE_TIMEOUT};

#[test]
fn test_options_builder_chain() {
    let options = PoolOptions::new()
        .with_capacity(4)
        .with_timeout(Duration::from_secs(30))
        .with_max_retries(2);
    assert_eq!(options.capacity(), 4);
    assert_eq!(options.timeout(), Duration::from_secs(30));
    assert_eq!(options.max_retries(), 2);
    assert!(options.validate().is_ok());
}

#[test]
fn test_options_apply_in_order() {
    let options = PoolOptions::from_options([
        PoolOption::Capacity(2),
        PoolOption::Timeout(Duration::from_millis(10)),
        PoolOption::Capacity(5),
    ]);
    assert_eq!(options.capacity(), 5);
    assert_eq!(options.timeout(), Duration::from_millis(10));
    assert_eq!(options.max_retries(), 0);
}

#[test]
fn test_options_from_empty_list_is_zero() {
    let options = PoolOptions::from_options([]);
    assert_eq!(options, PoolOptions::new());
    assert!(options.validate().is_err());
}

#[test]
fn test_options_from_vars() {
    let vars: HashMap<String, String> = [
        ("RELAY_POOL_CAPACITY", "3"),
        ("RELAY_POOL_TIMEOUT_MS", "1500"),
        ("RELAY_POOL_MAX_RETRIES", " 4 "),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();

    let options = PoolOptions::from_map(&vars).unwrap();
    assert_eq!(options.capacity(), 3);
    assert_eq!(options.timeout(), Duration::from_millis(1500));
    assert_eq!(options.max_retries(), 4);
}

#[test]
fn test_options_from_vars_missing_keep_zero() {
    let options = PoolOptions::from_vars(|_| None).unwrap();
    assert_eq!(options, PoolOptions::new());
}

#[test]
fn test_options_from_vars_rejects_negative_capacity() {
    let err = PoolOptions::from_vars(|key| (key == "RELAY_POOL_CAPACITY").then(|| "-2".to_string()))
        .unwrap_err();
    assert!(err.to_string().contains("RELAY_POOL_CAPACITY"));
}

#[test]
fn test_relay_config_from_json() {
    let json = r#"{
        "pools": {
            "wayback": { "capacity": 4, "timeout_ms": 300000, "max_retries": 2 },
            "ipfs": { "capacity": 2 }
        }
    }"#;

    let config = RelayConfig::from_json_str(json).unwrap();
    let wayback = config.pools["wayback"];
    assert_eq!(wayback.capacity(), 4);
    assert_eq!(wayback.timeout(), Duration::from_secs(300));
    assert_eq!(wayback.max_retries(), 2);

    let ipfs = config.pools["ipfs"];
    assert_eq!(ipfs.timeout(), Duration::ZERO);
    assert_eq!(ipfs.max_retries(), 0);
}

#[test]
fn test_relay_config_rejects_zero_capacity() {
    let json = r#"{ "pools": { "wayback": { "capacity": 0 } } }"#;
    let err = RelayConfig::from_json_str(json).unwrap_err();
    assert!(err.contains("wayback"));
}

#[test]
fn test_relay_config_rejects_negative_capacity() {
    let json = r#"{ "pools": { "wayback": { "capacity": -1 } } }"#;
    let err = RelayConfig::from_json_str(json).unwrap_err();
    assert!(err.starts_with("parse error"));
}

#[test]
fn test_relay_config_rejects_unknown_fields() {
    let json = r#"{ "pools": { "wayback": { "capacity": 1, "priority": 9 } } }"#;
    assert!(RelayConfig::from_json_str(json).is_err());
}

#[test]
fn test_relay_config_empty_pools() {
    let config = RelayConfig {
        pools: HashMap::new(),
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_options_json_round_trip_shape() {
    let options = PoolOptions::new()
        .with_capacity(2)
        .with_timeout(Duration::from_secs(1));
    let json = serde_json::to_value(options).unwrap();
    assert_eq!(
        json,
        serde_json::json!({ "timeout_ms": 1000, "max_retries": 0, "capacity": 2 })
    );
}

#[test]
fn test_sub_millisecond_timeout_survives_json() {
    let options = PoolOptions::new()
        .with_capacity(1)
        .with_timeout(Duration::from_micros(500));
    let json = serde_json::to_string(&options).unwrap();
    assert!(json.contains(r#""timeout_ms":1"#));

    let parsed: PoolOptions = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.timeout(), Duration::from_millis(1));
    assert_eq!(parsed.acquire_ceiling(), Duration::from_millis(1));
}

#[test]
fn test_relay_config_zero_timeout_selects_default() {
    let json = r#"{ "pools": { "wayback": { "capacity": 1, "timeout_ms": 0 } } }"#;
    let config = RelayConfig::from_json_str(json).unwrap();
    assert_eq!(config.pools["wayback"].acquire_ceiling(), DEFAULT_ACQUIRE_TIMEOUT);
}
