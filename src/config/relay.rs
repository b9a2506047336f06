//! Relay configuration: one named pool per archive service.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::PoolOptions;

/// Root relay configuration.
///
/// ```json
/// {
///   "pools": {
///     "wayback": { "capacity": 4, "timeout_ms": 300000, "max_retries": 2 },
///     "ipfs": { "capacity": 2 }
///   }
/// }
/// ```
///
/// An omitted or zero `timeout_ms` selects the five-minute default ceiling.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Map of pool name to options.
    pub pools: HashMap<String, PoolOptions>,
}

impl RelayConfig {
    /// Validate all pools and ensure at least one pool exists.
    ///
    /// # Errors
    ///
    /// Returns a message naming the first invalid pool.
    pub fn validate(&self) -> Result<(), String> {
        if self.pools.is_empty() {
            return Err("at least one pool must be defined".into());
        }
        for (name, pool) in &self.pools {
            pool.validate()
                .map_err(|e| format!("pool `{name}` invalid: {e}"))?;
        }
        Ok(())
    }

    /// Parse relay configuration from a JSON string and validate.
    ///
    /// # Errors
    ///
    /// Returns a message when the document does not parse (including
    /// negative or fractional numbers) or fails validation.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }
}
