//! Pool options and their setters.
//!
//! Options start from a zero-valued base and are shaped by setters applied
//! in order, either as builder calls or as a list of [`PoolOption`] values.
//! Nothing here validates; [`PoolOptions::validate`] is called by whoever
//! builds a pool from the options.

use std::collections::HashMap;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::AppResult;

/// Acquisition ceiling used when no timeout has been set.
pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// Largest capacity a pool accepts.
pub const MAX_CAPACITY: usize = 65_536;

/// Environment variable holding the pool capacity.
pub const ENV_CAPACITY: &str = "RELAY_POOL_CAPACITY";
/// Environment variable holding the acquisition timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "RELAY_POOL_TIMEOUT_MS";
/// Environment variable holding the retry budget.
pub const ENV_MAX_RETRIES: &str = "RELAY_POOL_MAX_RETRIES";

/// Options for a permit pool.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolOptions {
    /// Acquisition timeout, written as `timeout_ms`. Zero, whether omitted
    /// or given explicitly, means [`DEFAULT_ACQUIRE_TIMEOUT`]. Sub-millisecond
    /// values are written rounded up to one millisecond.
    #[serde(rename = "timeout_ms", with = "crate::util::serde::duration_millis")]
    timeout: Duration,
    max_retries: u32,
    capacity: usize,
}

impl PoolOptions {
    /// Zero-valued options.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: Duration::ZERO,
            max_retries: 0,
            capacity: 0,
        }
    }

    /// Apply setters in order over the zero-valued base. Later setters win.
    #[must_use]
    pub fn from_options(options: impl IntoIterator<Item = PoolOption>) -> Self {
        options
            .into_iter()
            .fold(Self::new(), |acc, option| option.apply(acc))
    }

    /// Set the acquisition timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of extra acquisition attempts after a timeout.
    #[must_use]
    pub const fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the number of permits.
    #[must_use]
    pub const fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Configured timeout; zero when unset.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Timeout a pool built from these options will use. An unset (zero)
    /// timeout falls back to [`DEFAULT_ACQUIRE_TIMEOUT`].
    #[must_use]
    pub const fn acquire_ceiling(&self) -> Duration {
        if self.timeout.is_zero() {
            DEFAULT_ACQUIRE_TIMEOUT
        } else {
            self.timeout
        }
    }

    /// Configured retry budget.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Validate option values for pool construction.
    ///
    /// # Errors
    ///
    /// Returns a message when the capacity is zero or above [`MAX_CAPACITY`].
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be greater than 0".into());
        }
        if self.capacity > MAX_CAPACITY {
            return Err(format!(
                "capacity {} exceeds maximum of {MAX_CAPACITY}",
                self.capacity
            ));
        }
        Ok(())
    }

    /// Read options from the process environment, loading a `.env` file
    /// first when one exists. Missing variables keep their zero value.
    ///
    /// # Errors
    ///
    /// Fails when a variable is present but not a valid unsigned integer.
    pub fn from_env() -> AppResult<Self> {
        if let Ok(path) = dotenvy::dotenv() {
            tracing::debug!(path = %path.display(), "loaded .env file");
        }
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Read options through `lookup`, using the same variable names as
    /// [`PoolOptions::from_env`].
    ///
    /// # Errors
    ///
    /// Fails when a variable is present but not a valid unsigned integer.
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> AppResult<Self> {
        let mut options = Self::new();
        if let Some(raw) = lookup(ENV_CAPACITY) {
            let capacity = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_CAPACITY}={raw:?} is not a valid capacity"))?;
            options = options.with_capacity(capacity);
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let millis: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_TIMEOUT_MS}={raw:?} is not a valid timeout"))?;
            options = options.with_timeout(Duration::from_millis(millis));
        }
        if let Some(raw) = lookup(ENV_MAX_RETRIES) {
            let retries = raw
                .trim()
                .parse()
                .with_context(|| format!("{ENV_MAX_RETRIES}={raw:?} is not a valid retry count"))?;
            options = options.with_max_retries(retries);
        }
        Ok(options)
    }

    /// Read options from an in-memory variable map.
    ///
    /// # Errors
    ///
    /// Same as [`PoolOptions::from_vars`].
    pub fn from_map(vars: &HashMap<String, String>) -> AppResult<Self> {
        Self::from_vars(|key| vars.get(key).cloned())
    }
}

/// A single setter over [`PoolOptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolOption {
    /// Acquisition timeout.
    Timeout(Duration),
    /// Extra acquisition attempts after a timeout.
    MaxRetries(u32),
    /// Number of permits.
    Capacity(usize),
}

impl PoolOption {
    /// Return `options` with this one field changed.
    #[must_use]
    pub const fn apply(self, options: PoolOptions) -> PoolOptions {
        match self {
            Self::Timeout(timeout) => options.with_timeout(timeout),
            Self::MaxRetries(retries) => options.with_max_retries(retries),
            Self::Capacity(capacity) => options.with_capacity(capacity),
        }
    }
}
