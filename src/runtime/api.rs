//! Batch submission, pool listings, and health reporting.

use std::collections::HashMap;
use std::panic;
use std::thread;

use serde::{Deserialize, Serialize};

use crate::core::{PermitPool, PoolError, PoolStats};

/// Pool snapshot data for listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolSnapshot {
    /// Pool name.
    pub name: String,
    /// Utilisation at the time of the snapshot.
    pub stats: PoolStats,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Permits the pool accounts for (available plus checked out).
    pub accounted: usize,
    /// Fixed capacity.
    pub capacity: usize,
}

/// Run every work unit in `batch` through `pool`, each from its own
/// submitting thread, and return the outcomes in submission order.
///
/// At most `pool.capacity()` units run at once; the rest wait for a permit
/// and may time out individually. A panicking unit is resumed on the caller
/// after every other unit has finished.
pub fn submit_batch<R, F, T>(pool: &PermitPool<R>, batch: Vec<F>) -> Vec<Result<T, PoolError>>
where
    R: Send + Sync,
    F: FnOnce() -> T + Send,
    T: Send,
{
    let joined: Vec<thread::Result<Result<T, PoolError>>> = thread::scope(|s| {
        let handles: Vec<_> = batch
            .into_iter()
            .map(|work| s.spawn(move || pool.roll(work)))
            .collect();
        handles.into_iter().map(thread::ScopedJoinHandle::join).collect()
    });

    joined
        .into_iter()
        .map(|outcome| outcome.unwrap_or_else(|payload| panic::resume_unwind(payload)))
        .collect()
}

/// Build pool listings, sorted by name.
pub fn list_pools<R: Send>(pools: &HashMap<String, PermitPool<R>>) -> Vec<PoolSnapshot> {
    let mut snapshots: Vec<PoolSnapshot> = pools
        .iter()
        .map(|(name, pool)| PoolSnapshot {
            name: name.clone(),
            stats: pool.stats(),
        })
        .collect();
    snapshots.sort_by(|a, b| a.name.cmp(&b.name));
    snapshots
}

/// Report whether the pool is open and accounts for all of its permits.
pub fn health<R: Send>(pool: &PermitPool<R>) -> Health {
    let stats = pool.stats();
    let accounted = stats.available + stats.checked_out;
    Health {
        ok: !pool.is_closed() && accounted == stats.capacity,
        accounted,
        capacity: stats.capacity,
    }
}
