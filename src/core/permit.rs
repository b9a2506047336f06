//! Permits and the factories that build them.

use std::convert::Infallible;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a permit within its pool.
///
/// Identifiers run from `0` to `capacity - 1` and are assigned once at
/// construction. They exist for tracing; permits are interchangeable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermitId(u32);

impl PermitId {
    /// Wrap a raw slot number.
    #[must_use]
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Raw slot number.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PermitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The right to run one unit of work, optionally carrying a resource
/// (a connection, a client handle) built for this slot.
#[derive(Debug)]
pub struct Permit<R> {
    id: PermitId,
    resource: R,
}

impl<R> Permit<R> {
    pub(crate) const fn new(id: PermitId, resource: R) -> Self {
        Self { id, resource }
    }

    /// Identifier of this permit.
    #[must_use]
    pub const fn id(&self) -> PermitId {
        self.id
    }

    /// Resource owned by this permit.
    #[must_use]
    pub const fn resource(&self) -> &R {
        &self.resource
    }

    /// Consume the permit, returning its resource for teardown.
    pub fn into_resource(self) -> R {
        self.resource
    }
}

/// Builds the resource behind each permit when a pool is created.
///
/// Factories run concurrently, one call per slot, so expensive setup
/// (dialing a remote archive, opening a database handle) overlaps.
///
/// Any `Fn(PermitId) -> Result<R, E>` closure is a factory.
pub trait PermitFactory<R>: Sync {
    /// Error reported when a slot cannot be initialised.
    type Error: fmt::Display;

    /// Build the resource for slot `id`.
    ///
    /// # Errors
    ///
    /// Returns the factory's error when the resource cannot be built; pool
    /// construction is aborted.
    fn create(&self, id: PermitId) -> Result<R, Self::Error>;
}

impl<R, E, F> PermitFactory<R> for F
where
    F: Fn(PermitId) -> Result<R, E> + Sync,
    E: fmt::Display,
{
    type Error = E;

    fn create(&self, id: PermitId) -> Result<R, E> {
        self(id)
    }
}

/// Factory for bare permits whose only state is their identifier.
///
/// # Errors
///
/// Never fails.
pub const fn bare_permit(id: PermitId) -> Result<PermitId, Infallible> {
    Ok(id)
}
