//! Update listeners

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// What changed in the product store.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheUpdate {
    /// Products inserted or replaced, in call order
    ProductsUpserted(Vec<u64>),
    /// Every store was emptied
    Cleared,
}

/// Handle returned by [`crate::MemoryCache::on_update`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Listener = Arc<dyn Fn(&CacheUpdate) -> anyhow::Result<()> + Send + Sync>;

#[derive(Clone, Default)]
pub(crate) struct ListenerRegistry {
    next_id: Arc<AtomicU64>,
    listeners: Arc<RwLock<Vec<(ListenerId, Listener)>>>,
}

impl ListenerRegistry {
    pub(crate) fn register<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&CacheUpdate) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let listener: Listener = Arc::new(listener);
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let before = listeners.len();
        listeners.retain(|(existing, _)| *existing != id);
        listeners.len() != before
    }

    /// Call every listener in registration order.
    ///
    /// The list is copied first so listeners may register or remove
    /// listeners. Errors and panics are logged per listener and never
    /// reach the caller.
    pub(crate) fn notify(&self, update: &CacheUpdate) {
        let listeners: Vec<(ListenerId, Listener)> = self
            .listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for (id, listener) in listeners {
            match catch_unwind(AssertUnwindSafe(|| listener(update))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(listener = id.0, error = %e, "cache update listener failed");
                }
                Err(_) => {
                    tracing::warn!(listener = id.0, "cache update listener panicked");
                }
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
