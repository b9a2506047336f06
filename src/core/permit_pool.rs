//! Bounded permit pool.
//!
//! A pool owns a fixed set of permits held in a bounded channel. Running a
//! unit of work checks one permit out of the channel, runs the work on a
//! nested thread while the caller waits, and puts the permit back on every
//! exit path. At most `capacity` units of work therefore run at once.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use relay_pool::config::PoolOptions;
//! use relay_pool::core::PermitPool;
//!
//! let options = PoolOptions::new()
//!     .with_capacity(2)
//!     .with_timeout(Duration::from_secs(1));
//! let pool = PermitPool::create(&options)?;
//!
//! let archived = pool.roll(|| "https://web.archive.org/web/2024/https://example.com")?;
//! assert!(archived.starts_with("https://web.archive.org"));
//! assert_eq!(pool.stats().available, 2);
//! # Ok::<(), relay_pool::core::PoolError>(())
//! ```

use std::collections::HashSet;
use std::panic;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Select, Sender, TryRecvError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::PoolOptions;
use crate::core::permit::{bare_permit, Permit, PermitFactory, PermitId};
use crate::core::PoolError;

/// Snapshot of pool utilisation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    /// Identifier of the pool, as used in log fields.
    pub pool_id: Uuid,
    /// Fixed number of permits.
    pub capacity: usize,
    /// Permits waiting in the pool.
    pub available: usize,
    /// Permits currently held by running work, or collected by a drain.
    pub checked_out: usize,
    /// Work units that ran to completion.
    pub completed: u64,
    /// Acquisition attempts that hit the ceiling.
    pub timed_out: u64,
    /// Work units that panicked.
    pub panicked: u64,
}

#[derive(Debug, Default)]
struct PoolCounters {
    completed: AtomicU64,
    timed_out: AtomicU64,
    panicked: AtomicU64,
}

/// Permits handed to initialisation threads at a time.
const INIT_BATCH: usize = 64;

/// State shared between the pool handle and outstanding permit guards.
///
/// Every move of a permit into or out of `rx` happens with `ledger` held,
/// so a snapshot taken under the same lock counts each permit exactly once.
struct Shared<R> {
    id: Uuid,
    capacity: usize,
    ceiling: Duration,
    max_retries: u32,
    tx: Sender<Permit<R>>,
    rx: Receiver<Permit<R>>,
    /// Identifiers of permits currently checked out.
    ledger: Mutex<HashSet<PermitId>>,
    closed: AtomicBool,
    draining: AtomicBool,
    drained: AtomicBool,
    counters: PoolCounters,
}

/// A checked-out permit. Dropping it releases the permit back to its pool.
struct PermitGuard<R> {
    permit: Option<Permit<R>>,
    pool: Weak<Shared<R>>,
}

impl<R> PermitGuard<R> {
    fn permit(&self) -> Option<&Permit<R>> {
        self.permit.as_ref()
    }
}

impl<R> Drop for PermitGuard<R> {
    fn drop(&mut self) {
        if let Some(permit) = self.permit.take() {
            let id = permit.id();
            if let Err(e) = push(&self.pool, permit) {
                error!(permit = %id, error = %e, "failed to release permit");
            }
        }
    }
}

/// Return a permit to the pool's available set.
fn push<R>(pool: &Weak<Shared<R>>, permit: Permit<R>) -> Result<(), PoolError> {
    let Some(shared) = pool.upgrade() else {
        return Err(PoolError::NotInitialized);
    };
    let mut ledger = shared.ledger.lock();
    ledger.remove(&permit.id());
    shared
        .tx
        .try_send(permit)
        .map_err(|e| PoolError::Internal(format!("permit queue rejected release: {e}")))
}

/// Outcome of waiting for a permit.
enum Take<R> {
    Taken(Permit<R>),
    TimedOut,
    Disconnected,
}

/// Wait up to `ceiling` for a permit and record it in the ledger.
///
/// The wait itself holds no lock: readiness is observed with a `Select`,
/// then the permit is taken and recorded under the ledger lock. Losing the
/// race to another taker just waits again for the remaining time.
fn take<R>(shared: &Shared<R>, ceiling: Duration) -> Take<R> {
    let started = Instant::now();
    loop {
        {
            let mut ledger = shared.ledger.lock();
            match shared.rx.try_recv() {
                Ok(permit) => {
                    if !ledger.insert(permit.id()) {
                        error!(pool = %shared.id, permit = %permit.id(), "permit was already checked out");
                    }
                    return Take::Taken(permit);
                }
                Err(TryRecvError::Disconnected) => return Take::Disconnected,
                Err(TryRecvError::Empty) => {}
            }
        }

        let remaining = ceiling.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Take::TimedOut;
        }
        let mut ready = Select::new();
        ready.recv(&shared.rx);
        if ready.ready_timeout(remaining).is_err() {
            return Take::TimedOut;
        }
    }
}

/// Wait up to the ceiling for a free permit.
fn acquire<R>(shared: &Arc<Shared<R>>) -> Result<PermitGuard<R>, PoolError> {
    if shared.closed.load(Ordering::Acquire) {
        return Err(PoolError::Closed);
    }

    let permit = match take(shared, shared.ceiling) {
        Take::Taken(permit) => permit,
        Take::TimedOut => {
            shared.counters.timed_out.fetch_add(1, Ordering::Relaxed);
            error!(
                pool = %shared.id,
                ceiling = ?shared.ceiling,
                "timed out waiting for a permit"
            );
            return Err(PoolError::Timeout {
                ceiling: shared.ceiling,
            });
        }
        Take::Disconnected => return Err(PoolError::Closed),
    };

    let guard = PermitGuard {
        permit: Some(permit),
        pool: Arc::downgrade(shared),
    };
    if shared.closed.load(Ordering::Acquire) {
        // Closed while waiting: hand the permit to the drain.
        return Err(PoolError::Closed);
    }
    Ok(guard)
}

/// Fixed-capacity pool of interchangeable permits.
///
/// `R` is the resource each permit carries; bare pools use [`PermitId`].
/// The pool is `Sync` and meant to be shared by reference (or `Arc`) among
/// any number of submitting threads.
pub struct PermitPool<R = PermitId> {
    shared: Arc<Shared<R>>,
    options: PoolOptions,
}

impl PermitPool<PermitId> {
    /// Create a pool of bare permits.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::InvalidConfig`] when the options do not validate
    /// (zero capacity included).
    pub fn create(options: &PoolOptions) -> Result<Self, PoolError> {
        Self::with_factory(options, bare_permit)
    }

    /// Create a pool, run `body` against it, then shut it down.
    ///
    /// If `body` panics the pool is dropped during unwinding, which closes
    /// it and releases its permits.
    ///
    /// # Errors
    ///
    /// Construction errors, or [`PoolError::Timeout`] if the final drain
    /// cannot collect every permit.
    pub fn scoped<T>(options: &PoolOptions, body: impl FnOnce(&Self) -> T) -> Result<T, PoolError> {
        let (value, _) = Self::scoped_with(options, bare_permit, body)?;
        Ok(value)
    }
}

impl<R: Send> PermitPool<R> {
    /// Create a pool whose permits carry resources built by `factory`.
    ///
    /// Slots are initialised concurrently, one thread per slot in batches
    /// of up to 64 threads, and this call returns once every permit is in
    /// the pool. The first failing batch stops construction.
    ///
    /// # Errors
    ///
    /// - [`PoolError::InvalidConfig`] when the options do not validate
    /// - [`PoolError::PermitInit`] when any factory call fails or panics
    /// - [`PoolError::Internal`] when an initialisation thread cannot spawn
    pub fn with_factory<F>(options: &PoolOptions, factory: F) -> Result<Self, PoolError>
    where
        F: PermitFactory<R>,
    {
        options.validate().map_err(PoolError::InvalidConfig)?;

        let capacity = options.capacity();
        let (tx, rx) = bounded::<Permit<R>>(capacity);
        let factory = &factory;

        for first in (0..capacity).step_by(INIT_BATCH) {
            let slots = first..capacity.min(first + INIT_BATCH);
            let outcomes: Vec<Result<(), PoolError>> = thread::scope(|s| {
                let handles: Vec<_> = slots
                    .map(|slot| {
                        let tx = tx.clone();
                        thread::Builder::new()
                            .name(format!("relay-pool-init-{slot}"))
                            .spawn_scoped(s, move || -> Result<(), PoolError> {
                                let id = u32::try_from(slot)
                                    .map(PermitId::new)
                                    .map_err(|e| PoolError::Internal(e.to_string()))?;
                                let resource = factory.create(id).map_err(|e| {
                                    PoolError::PermitInit(format!("permit {id}: {e}"))
                                })?;
                                tx.send(Permit::new(id, resource))
                                    .map_err(|e| PoolError::Internal(e.to_string()))
                            })
                    })
                    .collect();

                handles
                    .into_iter()
                    .map(|handle| match handle {
                        Ok(handle) => handle.join().unwrap_or_else(|_| {
                            Err(PoolError::PermitInit("permit factory panicked".into()))
                        }),
                        Err(e) => Err(PoolError::Internal(format!(
                            "failed to spawn initialisation thread: {e}"
                        ))),
                    })
                    .collect()
            });

            for outcome in outcomes {
                outcome?;
            }
        }

        let shared = Arc::new(Shared {
            id: Uuid::new_v4(),
            capacity,
            ceiling: options.acquire_ceiling(),
            max_retries: options.max_retries(),
            tx,
            rx,
            ledger: Mutex::new(HashSet::with_capacity(capacity)),
            closed: AtomicBool::new(false),
            draining: AtomicBool::new(false),
            drained: AtomicBool::new(false),
            counters: PoolCounters::default(),
        });

        info!(
            pool = %shared.id,
            capacity,
            ceiling = ?shared.ceiling,
            max_retries = shared.max_retries,
            "permit pool ready"
        );

        Ok(Self {
            shared,
            options: *options,
        })
    }

    /// Create a pool with `factory`, run `body`, then shut the pool down,
    /// returning `body`'s value and the drained resources for teardown.
    ///
    /// # Errors
    ///
    /// Construction errors, or [`PoolError::Timeout`] if the final drain
    /// cannot collect every permit.
    pub fn scoped_with<F, T>(
        options: &PoolOptions,
        factory: F,
        body: impl FnOnce(&Self) -> T,
    ) -> Result<(T, Vec<R>), PoolError>
    where
        F: PermitFactory<R>,
    {
        let pool = Self::with_factory(options, factory)?;
        let value = body(&pool);
        let resources = pool.shutdown()?;
        Ok((value, resources))
    }

    /// Options the pool was built from.
    #[must_use]
    pub const fn options(&self) -> &PoolOptions {
        &self.options
    }

    /// Identifier used in this pool's log fields.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.shared.id
    }

    /// Fixed number of permits.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.shared.capacity
    }

    /// Longest time a caller waits for a permit.
    #[must_use]
    pub fn ceiling(&self) -> Duration {
        self.shared.ceiling
    }

    /// Whether the pool has been shut down.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// Current utilisation.
    ///
    /// `available + checked_out` always equals the capacity.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        let counters = &self.shared.counters;
        let (available, checked_out) = {
            let ledger = self.shared.ledger.lock();
            (self.shared.rx.len(), ledger.len())
        };
        PoolStats {
            pool_id: self.shared.id,
            capacity: self.shared.capacity,
            available,
            checked_out,
            completed: counters.completed.load(Ordering::Relaxed),
            timed_out: counters.timed_out.load(Ordering::Relaxed),
            panicked: counters.panicked.load(Ordering::Relaxed),
        }
    }

    /// Run `work` while holding one permit.
    ///
    /// Blocks until a permit is free (up to the ceiling), then until `work`
    /// finishes. The permit is released whether `work` returns or panics;
    /// a panic is resumed on the calling thread after the release.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Timeout`] when no permit frees up in time; `work` did
    ///   not run
    /// - [`PoolError::Closed`] after [`PermitPool::shutdown`]
    /// - [`PoolError::Internal`] when the work thread cannot spawn
    pub fn roll<F, T>(&self, work: F) -> Result<T, PoolError>
    where
        R: Sync,
        F: FnOnce() -> T + Send,
        T: Send,
    {
        self.roll_with(|_| work())
    }

    /// Like [`PermitPool::roll`], but `work` borrows the permit and its
    /// resource.
    ///
    /// # Errors
    ///
    /// Same as [`PermitPool::roll`].
    pub fn roll_with<F, T>(&self, work: F) -> Result<T, PoolError>
    where
        R: Sync,
        F: FnOnce(&Permit<R>) -> T + Send,
        T: Send,
    {
        let guard = acquire(&self.shared)?;
        self.run(guard, work)
    }

    /// Run `work` under a permit, retrying acquisition on timeout up to the
    /// configured retry budget. `work` runs at most once.
    ///
    /// # Errors
    ///
    /// - [`PoolError::RetriesExhausted`] when every attempt timed out
    /// - any other error from [`PermitPool::roll`], returned immediately
    pub fn roll_with_retries<F, T>(&self, work: F) -> Result<T, PoolError>
    where
        R: Sync,
        F: FnOnce() -> T + Send,
        T: Send,
    {
        let attempts = self.shared.max_retries.saturating_add(1);
        for attempt in 1..=attempts {
            match acquire(&self.shared) {
                Ok(guard) => return self.run(guard, |_| work()),
                Err(PoolError::Timeout { ceiling }) => {
                    warn!(
                        pool = %self.shared.id,
                        attempt,
                        attempts,
                        ceiling = ?ceiling,
                        "permit acquisition timed out"
                    );
                }
                Err(e) => return Err(e),
            }
        }
        Err(PoolError::RetriesExhausted { attempts })
    }

    /// Run `work` on a nested thread while `guard` holds the permit.
    fn run<F, T>(&self, guard: PermitGuard<R>, work: F) -> Result<T, PoolError>
    where
        R: Sync,
        F: FnOnce(&Permit<R>) -> T + Send,
        T: Send,
    {
        let Some(permit) = guard.permit() else {
            return Err(PoolError::Internal("guard holds no permit".into()));
        };
        let id = permit.id();
        debug!(pool = %self.shared.id, permit = %id, "permit serving work");

        let outcome = thread::scope(|s| {
            thread::Builder::new()
                .name(format!("relay-pool-work-{id}"))
                .spawn_scoped(s, move || work(permit))
                .map(thread::ScopedJoinHandle::join)
        });

        match outcome {
            Ok(Ok(value)) => {
                self.shared.counters.completed.fetch_add(1, Ordering::Relaxed);
                drop(guard);
                Ok(value)
            }
            Ok(Err(payload)) => {
                self.shared.counters.panicked.fetch_add(1, Ordering::Relaxed);
                drop(guard);
                warn!(pool = %self.shared.id, permit = %id, "work panicked; permit released");
                panic::resume_unwind(payload)
            }
            Err(e) => Err(PoolError::Internal(format!(
                "failed to spawn work thread: {e}"
            ))),
        }
    }

    /// Close the pool and collect every permit.
    ///
    /// New calls fail with [`PoolError::Closed`]. Permits held by running
    /// work are awaited, each for up to the ceiling, and all resources are
    /// returned for teardown. Collected permits stay on the ledger, so
    /// [`PermitPool::stats`] reports them as checked out.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Closed`] if the pool was already drained, or another
    ///   call is draining it
    /// - [`PoolError::Timeout`] if a permit did not come back in time; the
    ///   permits collected so far go back to the pool so the drain can be
    ///   retried
    pub fn shutdown(&self) -> Result<Vec<R>, PoolError> {
        if self.shared.drained.load(Ordering::Acquire)
            || self
                .shared
                .draining
                .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
        {
            return Err(PoolError::Closed);
        }
        self.shared.closed.store(true, Ordering::Release);
        info!(pool = %self.shared.id, "draining permit pool");

        let mut drained = Vec::with_capacity(self.shared.capacity);
        while drained.len() < self.shared.capacity {
            match take(&self.shared, self.shared.ceiling) {
                Take::Taken(permit) => drained.push(permit),
                Take::TimedOut | Take::Disconnected => {
                    let missing = self.shared.capacity - drained.len();
                    warn!(pool = %self.shared.id, missing, "permits still checked out at drain ceiling");
                    let pool = Arc::downgrade(&self.shared);
                    for permit in drained {
                        let id = permit.id();
                        if let Err(e) = push(&pool, permit) {
                            error!(pool = %self.shared.id, permit = %id, error = %e, "failed to return drained permit");
                        }
                    }
                    self.shared.draining.store(false, Ordering::Release);
                    return Err(PoolError::Timeout {
                        ceiling: self.shared.ceiling,
                    });
                }
            }
        }

        self.shared.drained.store(true, Ordering::Release);
        info!(pool = %self.shared.id, permits = drained.len(), "permit pool drained");
        Ok(drained.into_iter().map(Permit::into_resource).collect())
    }
}

#[cfg(feature = "tokio-runtime")]
impl<R: Send + 'static> PermitPool<R> {
    /// Run the future produced by `work` while holding one permit.
    ///
    /// The blocking wait happens on tokio's blocking pool. Dropping the
    /// returned future at any point, including mid-acquire, releases the
    /// permit; it does not cancel an acquire already in progress, whose
    /// permit is handed straight back.
    ///
    /// # Errors
    ///
    /// - [`PoolError::Timeout`] when no permit frees up in time
    /// - [`PoolError::Closed`] after [`PermitPool::shutdown`]
    /// - [`PoolError::Internal`] when the acquire task fails
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, since the wait runs on
    /// [`tokio::task::spawn_blocking`]. A panic raised by the future
    /// propagates to the caller after the permit is released and counted.
    pub async fn roll_async<F, Fut, T>(&self, work: F) -> Result<T, PoolError>
    where
        F: FnOnce(PermitId) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let shared = Arc::clone(&self.shared);
        let guard = tokio::task::spawn_blocking(move || acquire(&shared))
            .await
            .map_err(|e| PoolError::Internal(format!("acquire task failed: {e}")))??;
        let Some(id) = guard.permit().map(Permit::id) else {
            return Err(PoolError::Internal("guard holds no permit".into()));
        };
        debug!(pool = %self.shared.id, permit = %id, "permit serving async work");

        let tally = PanicTally(&self.shared.counters.panicked);
        let value = work(id).await;
        drop(tally);
        self.shared.counters.completed.fetch_add(1, Ordering::Relaxed);
        drop(guard);
        Ok(value)
    }
}

/// Counts an unwind through the scope that owns it.
#[cfg(feature = "tokio-runtime")]
struct PanicTally<'a>(&'a AtomicU64);

#[cfg(feature = "tokio-runtime")]
impl Drop for PanicTally<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }
}

impl<R> Drop for PermitPool<R> {
    fn drop(&mut self) {
        if !self.shared.drained.load(Ordering::Acquire) {
            self.shared.closed.store(true, Ordering::Release);
            debug!(pool = %self.shared.id, "permit pool dropped without shutdown; permits released with it");
        }
    }
}
