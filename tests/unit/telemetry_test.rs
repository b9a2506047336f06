//! Tests for telemetry setup

use relay_pool::util::init_tracing;

#[test]
fn test_init_tracing_is_idempotent() {
    init_tracing();
    init_tracing();
    tracing::info!(target: "relay_pool", "tracing initialised twice without panicking");
    assert!(tracing::dispatcher::has_been_set());
}
