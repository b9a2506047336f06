//! Configuration models for pools and the archive relay.

pub mod options;
pub mod relay;

pub use options::{PoolOption, PoolOptions, DEFAULT_ACQUIRE_TIMEOUT, MAX_CAPACITY};
pub use relay::RelayConfig;
