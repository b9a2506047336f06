//! Error types for permit pool operations.

use std::time::Duration;

use thiserror::Error;

/// Errors produced by the permit pool.
///
/// Failures raised inside a work unit never appear here: the pool hands the
/// work's own return value back untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    /// No permit became free before the acquisition ceiling elapsed.
    /// The work did not run.
    #[error("timed out after {ceiling:?} waiting for a permit")]
    Timeout {
        /// Ceiling that was in force for the attempt.
        ceiling: Duration,
    },
    /// A permit was released into a pool that no longer exists.
    #[error("pool does not exist")]
    NotInitialized,
    /// The pool has been shut down and accepts no more work.
    #[error("pool is closed")]
    Closed,
    /// Pool options failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A permit factory failed during construction.
    #[error("permit initialization failed: {0}")]
    PermitInit(String),
    /// Every acquisition attempt allowed by the retry budget timed out.
    #[error("no permit acquired after {attempts} attempts")]
    RetriesExhausted {
        /// Number of acquisition attempts made.
        attempts: u32,
    },
    /// Internal failure (thread spawn, runtime join).
    #[error("internal error: {0}")]
    Internal(String),
}

impl PoolError {
    /// Whether the failure is transient and the caller may try again.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::RetriesExhausted { .. })
    }
}

/// Application-facing result using anyhow for higher-level contexts.
pub type AppResult<T> = Result<T, anyhow::Error>;
