//! Snapshot store trait definition

use async_trait::async_trait;
use rentcache_core::Result;

/// The snapshot storage service trait.
///
/// A store holds at most one snapshot: the latest serialized cache state.
/// It does not interpret the text; framing and versioning are handled by
/// [`crate::encode_envelope`] and [`crate::decode_envelope`].
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Read the stored snapshot. `Ok(None)` when nothing has been saved yet.
    async fn load(&self) -> Result<Option<String>>;

    /// Replace the stored snapshot.
    async fn save(&self, snapshot: &str) -> Result<()>;

    /// Remove the stored snapshot. Erasing a missing snapshot is not an error.
    async fn erase(&self) -> Result<()>;

    /// Short human-readable description used in log fields.
    fn describe(&self) -> String;
}
