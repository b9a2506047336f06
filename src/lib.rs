//! # Relay Pool
//!
//! A bounded permit pool that throttles how many archival operations the
//! archive relay runs at once.
//!
//! The relay takes URLs from a chat interface and submits each one to a
//! handful of remote web-archiving services. Those submissions are slow and
//! the services rate-limit aggressively, so every submission runs under a
//! permit from a fixed-size pool. This crate is that pool; the archive
//! clients, chat parsing, and persistence live elsewhere and only see the
//! "run this work under a permit" contract.
//!
//! ## Key Features
//!
//! - **Fixed capacity**: exactly `capacity` permits, created concurrently at
//!   construction and never resized
//! - **Bounded waits**: each acquisition waits at most the pool's ceiling,
//!   then fails with [`core::PoolError::Timeout`] without running the work
//! - **Release on every path**: permits return to the pool when work
//!   returns early, finishes, or panics
//! - **Retry budget**: [`core::PermitPool::roll_with_retries`] consumes the
//!   configured retry count on acquisition timeouts
//! - **Drain and teardown**: [`core::PermitPool::shutdown`] and
//!   [`core::PermitPool::scoped`] close the pool and hand back resources
//!
//! ## Quick start
//!
//! ```rust
//! use std::time::Duration;
//! use relay_pool::config::{PoolOption, PoolOptions};
//! use relay_pool::core::PermitPool;
//!
//! let options = PoolOptions::from_options([
//!     PoolOption::Capacity(4),
//!     PoolOption::Timeout(Duration::from_secs(30)),
//!     PoolOption::MaxRetries(2),
//! ]);
//!
//! let pool = PermitPool::create(&options)?;
//! let status = pool.roll_with_retries(|| 200_u16)?;
//! assert_eq!(status, 200);
//! # Ok::<(), relay_pool::core::PoolError>(())
//! ```
//!
//! Permits can carry resources, such as one HTTP client per slot:
//!
//! ```rust,ignore
//! let pool = PermitPool::with_factory(&options, |id| ArchiveClient::connect(id))?;
//! let url = pool.roll_with(|permit| permit.resource().submit(link))??;
//! ```
//!
//! For complete scenarios, see `tests/permit_pool_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Permit pool, permits, and error types.
pub mod core;
/// Pool options and relay configuration.
pub mod config;
/// Builders to construct pools from configuration.
pub mod builders;
/// Batch submission and reporting API.
pub mod runtime;
/// Shared utilities.
pub mod util;
