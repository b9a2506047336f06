//! Submission API used by the relay front ends.

pub mod api;

pub use api::{health, list_pools, submit_batch, Health, PoolSnapshot};
