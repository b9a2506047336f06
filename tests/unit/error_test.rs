//! Tests for error types

use std::time::Duration;

use relay_pool::core::PoolError;

#[test]
fn test_timeout_error() {
    let err = PoolError::Timeout {
        ceiling: Duration::from_secs(300),
    };
    assert_eq!(format!("{}", err), "timed out after 300s waiting for a permit");
    assert!(err.is_transient());
}

#[test]
fn test_not_initialized_error() {
    let err = PoolError::NotInitialized;
    assert_eq!(format!("{}", err), "pool does not exist");
    assert!(!err.is_transient());
}

#[test]
fn test_invalid_config_error() {
    let err = PoolError::InvalidConfig("capacity must be greater than 0".to_string());
    assert_eq!(
        format!("{}", err),
        "invalid configuration: capacity must be greater than 0"
    );
}

#[test]
fn test_retries_exhausted_error() {
    let err = PoolError::RetriesExhausted { attempts: 3 };
    assert_eq!(format!("{}", err), "no permit acquired after 3 attempts");
    assert!(err.is_transient());
}

#[test]
fn test_closed_error() {
    assert_eq!(format!("{}", PoolError::Closed), "pool is closed");
}
