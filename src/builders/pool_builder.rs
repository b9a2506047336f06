//! Builders to construct permit pools from relay configuration.

use std::collections::HashMap;

use crate::config::{PoolOptions, RelayConfig};
use crate::core::{PermitFactory, PermitPool, PoolError};

/// Named pool under construction.
#[derive(Debug, Clone)]
pub struct PoolBuilder {
    name: String,
    options: PoolOptions,
}

impl PoolBuilder {
    /// Start a builder for pool `name`.
    pub fn new(name: impl Into<String>, options: PoolOptions) -> Self {
        Self {
            name: name.into(),
            options,
        }
    }

    /// Pool name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Options the pool will be built from.
    #[must_use]
    pub const fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Build a pool of bare permits.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] naming the pool when its options
    /// do not validate, or any construction error.
    pub fn build(&self) -> Result<PermitPool, PoolError> {
        PermitPool::create(&self.options).map_err(|e| self.name_error(e))
    }

    /// Build a pool whose permits carry resources from `factory`.
    ///
    /// # Errors
    ///
    /// Same as [`PoolBuilder::build`], plus factory failures.
    pub fn build_with<R, F>(&self, factory: F) -> Result<PermitPool<R>, PoolError>
    where
        R: Send,
        F: PermitFactory<R>,
    {
        PermitPool::with_factory(&self.options, factory).map_err(|e| self.name_error(e))
    }

    fn name_error(&self, e: PoolError) -> PoolError {
        match e {
            PoolError::InvalidConfig(msg) => {
                PoolError::InvalidConfig(format!("pool `{}` invalid: {msg}", self.name))
            }
            other => other,
        }
    }
}

/// Build one pool of bare permits per named entry in the relay config.
///
/// # Errors
///
/// Returns [`PoolError::InvalidConfig`] when the configuration does not
/// validate, or the first construction error.
pub fn build_pools(cfg: &RelayConfig) -> Result<HashMap<String, PermitPool>, PoolError> {
    cfg.validate()
        .map_err(|e| PoolError::InvalidConfig(format!("config invalid: {e}")))?;

    let mut pools = HashMap::with_capacity(cfg.pools.len());
    for (name, options) in &cfg.pools {
        let pool = PoolBuilder::new(name.clone(), *options).build()?;
        tracing::debug!(pool = %pool.id(), name = %name, "built relay pool");
        pools.insert(name.clone(), pool);
    }

    Ok(pools)
}
