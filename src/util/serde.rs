//! Serde helpers for configuration documents.

/// Serialize a [`Duration`](std::time::Duration) as whole milliseconds.
///
/// Output rounds up, so a non-zero duration never serializes as `0`.
pub mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    /// Write the duration as a `u64` millisecond count, rounded up and
    /// saturating.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = value.as_nanos().div_ceil(1_000_000);
        serializer.serialize_u64(u64::try_from(millis).unwrap_or(u64::MAX))
    }

    /// Read a `u64` millisecond count.
    ///
    /// # Errors
    ///
    /// Fails on negative, fractional, or non-numeric input.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
