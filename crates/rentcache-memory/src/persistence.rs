//! Snapshot load/save and the periodic flush task

use crate::state::{CacheState, SnapshotPayload};
use rentcache_core::{LimitsConfig, Result};
use rentcache_store::{SnapshotStore, decode_envelope, encode_envelope};
use rentcache_telemetry::{SnapshotSpanAttributes, trace_snapshot};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Moves cache state to and from a [`SnapshotStore`].
///
/// Saves and erases are serialized through `io_lock`, and a save reads the
/// state only after taking it, so an erase can never be overwritten by a
/// save of older state.
#[derive(Clone)]
pub(crate) struct Persister {
    state: Arc<RwLock<CacheState>>,
    store: Arc<dyn SnapshotStore>,
    io_lock: Arc<tokio::sync::Mutex<()>>,
}

impl Persister {
    pub(crate) fn new(state: Arc<RwLock<CacheState>>, store: Arc<dyn SnapshotStore>) -> Self {
        Self {
            state,
            store,
            io_lock: Arc::new(tokio::sync::Mutex::new(())),
        }
    }

    /// Read the stored snapshot. Absent, unreadable, malformed or
    /// wrong-version snapshots all yield an empty state.
    pub(crate) async fn load(&self, limits: &LimitsConfig) -> CacheState {
        let store = self.store.describe();

        let text = match self.store.load().await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::debug!(%store, "no snapshot found, starting empty");
                return CacheState::default();
            }
            Err(e) => {
                tracing::warn!(%store, error = %e, "failed to read snapshot, starting empty");
                record(&store, "load", 0, "read_error");
                return CacheState::default();
            }
        };

        match decode_envelope::<SnapshotPayload>(&text) {
            Ok(envelope) => {
                let state = CacheState::restore(envelope.payload, limits);
                tracing::debug!(
                    %store,
                    saved_at = %envelope.saved_at,
                    products = state.products.len(),
                    sessions = state.sessions.len(),
                    thoughts = state.thoughts.len(),
                    "snapshot restored"
                );
                record(&store, "load", text.len(), "ok");
                state
            }
            Err(e) => {
                tracing::warn!(%store, error = %e, "discarding unusable snapshot, starting empty");
                record(&store, "load", text.len(), "discarded");
                CacheState::default()
            }
        }
    }

    /// Serialize the current state and save it. Returns the bytes written.
    pub(crate) async fn flush(&self) -> Result<usize> {
        let _io = self.io_lock.lock().await;
        let store = self.store.describe();

        let text = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            encode_envelope(&state.snapshot())?
        };

        match self.store.save(&text).await {
            Ok(()) => {
                tracing::debug!(%store, bytes = text.len(), "snapshot saved");
                record(&store, "save", text.len(), "ok");
                Ok(text.len())
            }
            Err(e) => {
                record(&store, "save", text.len(), "error");
                Err(e)
            }
        }
    }

    pub(crate) async fn erase(&self) -> Result<()> {
        let _io = self.io_lock.lock().await;
        let store = self.store.describe();
        let result = self.store.erase().await;
        record(&store, "erase", 0, if result.is_ok() { "ok" } else { "error" });
        result
    }
}

fn record(store: &str, operation: &'static str, bytes: usize, outcome: &'static str) {
    trace_snapshot(SnapshotSpanAttributes {
        operation,
        store: store.to_string(),
        bytes,
        outcome,
    });
}

/// Background task flushing the cache on a fixed interval.
///
/// Dropping the ticker cancels the task; [`PersistenceTicker::stop`] also
/// waits for it to finish.
pub(crate) struct PersistenceTicker {
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PersistenceTicker {
    /// Spawn on the current tokio runtime. The first flush happens one
    /// `period` after spawning.
    pub(crate) fn spawn(persister: Persister, period: Duration) -> Self {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // Skip the first immediate tick.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = interval.tick() => {
                        if let Err(e) = persister.flush().await {
                            tracing::warn!(error = %e, "periodic snapshot flush failed");
                        }
                    }
                }
            }

            tracing::debug!("persistence ticker stopped");
        });

        Self {
            cancel,
            handle: Some(handle),
        }
    }

    pub(crate) async fn stop(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take()
            && let Err(e) = handle.await
        {
            tracing::warn!(error = %e, "persistence ticker ended abnormally");
        }
    }
}

impl Drop for PersistenceTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
