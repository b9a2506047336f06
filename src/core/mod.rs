//! Core permit pool and its error types.

pub mod error;
pub mod permit;
pub mod permit_pool;

pub use error::{AppResult, PoolError};
pub use permit::{bare_permit, Permit, PermitFactory, PermitId};
pub use permit_pool::{PermitPool, PoolStats};
