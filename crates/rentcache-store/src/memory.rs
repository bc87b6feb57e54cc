//! In-memory snapshot store implementation

use crate::SnapshotStore;
use async_trait::async_trait;
use rentcache_core::{Error, Result};
use std::sync::{Arc, RwLock};

/// In-memory snapshot store.
///
/// Clones share the same slot, so a test can keep a handle and inspect what
/// the cache wrote. Data does not survive the process.
#[derive(Clone, Default)]
pub struct InMemorySnapshotStore {
    slot: Arc<RwLock<Option<String>>>,
}

impl InMemorySnapshotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that already holds `snapshot`
    pub fn with_snapshot(snapshot: impl Into<String>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Some(snapshot.into()))),
        }
    }

    /// Current contents, without going through the async trait
    pub fn contents(&self) -> Option<String> {
        self.slot.read().ok().and_then(|slot| slot.clone())
    }
}

fn poisoned() -> Error {
    Error::snapshot_error("in-memory snapshot slot is poisoned")
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self) -> Result<Option<String>> {
        let slot = self.slot.read().map_err(|_| poisoned())?;
        Ok(slot.clone())
    }

    async fn save(&self, snapshot: &str) -> Result<()> {
        let mut slot = self.slot.write().map_err(|_| poisoned())?;
        *slot = Some(snapshot.to_string());
        Ok(())
    }

    async fn erase(&self) -> Result<()> {
        let mut slot = self.slot.write().map_err(|_| poisoned())?;
        *slot = None;
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
