//! Tests for builder modules

use std::collections::HashMap;
use std::time::Duration;

use relay_pool::builders::{build_pools, PoolBuilder};
use relay_pool::config::{PoolOptions, RelayConfig};
use relay_pool::core::{PermitId, PoolError};

fn options(capacity: usize) -> PoolOptions {
    PoolOptions::new()
        .with_capacity(capacity)
        .with_timeout(Duration::from_secs(1))
}

#[test]
fn test_pool_builder_accessors() {
    let builder = PoolBuilder::new("wayback", options(4));
    assert_eq!(builder.name(), "wayback");
    assert_eq!(builder.options().capacity(), 4);

    let pool = builder.build().unwrap();
    assert_eq!(pool.capacity(), 4);
    assert_eq!(pool.options(), &options(4));
}

#[test]
fn test_pool_builder_names_invalid_pool() {
    let err = PoolBuilder::new("archive_today", options(0)).build().err();
    match err {
        Some(PoolError::InvalidConfig(msg)) => assert!(msg.contains("archive_today")),
        other => panic!("unexpected outcome: {other:?}"),
    }
}

#[test]
fn test_pool_builder_with_factory() {
    let pool = PoolBuilder::new("ipfs", options(2))
        .build_with(|id: PermitId| Ok::<_, String>(id.get() * 10))
        .unwrap();
    let value = pool.roll_with(|permit| *permit.resource()).unwrap();
    assert!(value == 0 || value == 10);
}

#[test]
fn test_build_pools_from_config() {
    let mut pools = HashMap::new();
    pools.insert("wayback".to_string(), options(3));
    pools.insert("ipfs".to_string(), options(1));

    let built = build_pools(&RelayConfig { pools }).unwrap();
    assert_eq!(built.len(), 2);
    assert_eq!(built["wayback"].capacity(), 3);
    assert_eq!(built["ipfs"].capacity(), 1);
}

#[test]
fn test_build_pools_rejects_invalid_config() {
    let result = build_pools(&RelayConfig::default());
    assert!(matches!(result, Err(PoolError::InvalidConfig(_))));
}
