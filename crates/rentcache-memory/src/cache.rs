//! The memory cache service

use crate::listeners::{CacheUpdate, ListenerId, ListenerRegistry};
use crate::persistence::{PersistenceTicker, Persister};
use crate::scoring::{
    keyword_score, preference_score, rating_age_score, sort_descending_by, tokenize,
};
use crate::state::CacheState;
use chrono::{DateTime, TimeDelta, Utc};
use rentcache_core::{
    AgentThought, CategoryRecord, Error, LocationRecord, Message, NewThought, PreferenceProfile,
    PreferenceUpdate, PriceRange, ProductInteraction, ProductRecord, RentCacheConfig, Result,
    SearchFilters, SearchQuery, SessionContext, ThoughtKind, truncate_front,
};
use rentcache_store::{FileSnapshotStore, InMemorySnapshotStore, SnapshotStore};
use rentcache_telemetry::{SearchSpanAttributes, safe_serialize, trace_search};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Default number of products returned by [`MemoryCache::recommend_products`]
pub const DEFAULT_RECOMMENDATION_LIMIT: usize = 5;

/// Default number of thoughts returned by [`MemoryCache::recent_thoughts`]
pub const DEFAULT_RECENT_THOUGHTS: usize = 10;

/// Sizes of the cache contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub products: usize,
    pub sessions: usize,
    pub thoughts: usize,
    pub categories: usize,
    pub locations: usize,
    /// Rough in-memory footprint: twice the length of the serialized state
    pub estimated_bytes: usize,
}

/// Outcome of a stale-data sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StaleSweep {
    pub sessions_removed: usize,
    pub thoughts_removed: usize,
}

/// Working memory for the marketplace chat agent.
///
/// Holds product snapshots, per-session conversation state and a rolling
/// log of agent thoughts. Every operation is synchronous and runs under one
/// lock, so operations never interleave with each other or with a snapshot
/// flush. Clones share the same state.
///
/// Persistence is best-effort: the state is restored from the snapshot store
/// on [`MemoryCache::open`] and written back every flush interval once
/// [`MemoryCache::start`] has spawned the ticker. Call
/// [`MemoryCache::shutdown`] to stop the ticker and write a final snapshot.
#[derive(Clone)]
pub struct MemoryCache {
    config: Arc<RentCacheConfig>,
    state: Arc<RwLock<CacheState>>,
    persister: Persister,
    listeners: ListenerRegistry,
    ticker: Arc<Mutex<Option<PersistenceTicker>>>,
}

impl MemoryCache {
    /// Validate the config and restore state from `store`.
    ///
    /// An invalid config fails with [`Error::Config`].
    ///
    /// Snapshot problems never fail this call: the cache starts empty and a
    /// warning is logged. No background task is started.
    pub async fn open(config: RentCacheConfig, store: Arc<dyn SnapshotStore>) -> Result<Self> {
        config
            .validate()
            .map_err(|e| Error::config_error(e.to_string()))?;

        let state = Arc::new(RwLock::new(CacheState::default()));
        let persister = Persister::new(state.clone(), store);

        let restored = persister.load(&config.limits).await;
        *state.write().unwrap_or_else(PoisonError::into_inner) = restored;

        Ok(Self {
            config: Arc::new(config),
            state,
            persister,
            listeners: ListenerRegistry::default(),
            ticker: Arc::new(Mutex::new(None)),
        })
    }

    /// [`MemoryCache::open`] plus the periodic flush task. Requires a tokio runtime.
    pub async fn start(config: RentCacheConfig, store: Arc<dyn SnapshotStore>) -> Result<Self> {
        let cache = Self::open(config, store).await?;
        cache.start_persistence();
        Ok(cache)
    }

    /// Start with the store named by `persistence.snapshot_path`, or an
    /// in-memory store when no path is configured.
    pub async fn from_config(config: RentCacheConfig) -> Result<Self> {
        let store: Arc<dyn SnapshotStore> = match &config.persistence.snapshot_path {
            Some(path) => Arc::new(FileSnapshotStore::new(path)),
            None => Arc::new(InMemorySnapshotStore::new()),
        };
        Self::start(config, store).await
    }

    /// Spawn the flush ticker if it is not already running.
    pub fn start_persistence(&self) {
        let mut ticker = self.ticker.lock().unwrap_or_else(PoisonError::into_inner);
        if ticker.is_none() {
            let period = self.config.flush_interval();
            *ticker = Some(PersistenceTicker::spawn(self.persister.clone(), period));
            tracing::info!(interval_secs = period.as_secs(), "snapshot persistence started");
        }
    }

    /// Stop the flush ticker and write a final snapshot.
    ///
    /// Safe to call more than once. A failing final flush is logged.
    pub async fn shutdown(&self) {
        let ticker = self
            .ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(ticker) = ticker {
            ticker.stop().await;
        }

        if let Err(e) = self.persister.flush().await {
            tracing::warn!(error = %e, "final snapshot flush failed");
        }
        tracing::info!("memory cache shut down");
    }

    /// Whether the flush ticker is running
    pub fn is_persisting(&self) -> bool {
        self.ticker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Write a snapshot now. Returns the number of bytes written.
    pub async fn flush(&self) -> Result<usize> {
        self.persister.flush().await
    }

    pub fn config(&self) -> &RentCacheConfig {
        &self.config
    }

    fn read(&self) -> RwLockReadGuard<'_, CacheState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    // ----- products -----

    /// Insert or replace a product by id and notify listeners.
    pub fn upsert_product(&self, product: ProductRecord) {
        self.upsert_products(vec![product]);
    }

    /// Insert or replace several products, then notify listeners once.
    pub fn upsert_products(&self, products: Vec<ProductRecord>) {
        if products.is_empty() {
            return;
        }

        let now = Utc::now();
        let ids: Vec<u64> = products.iter().map(|p| p.id).collect();
        {
            let mut state = self.write();
            for mut product in products {
                product.last_updated = now;
                state.products.upsert(product);
            }
        }

        tracing::debug!(count = ids.len(), "products upserted");
        self.listeners.notify(&CacheUpdate::ProductsUpserted(ids));
    }

    pub fn get_product(&self, id: u64) -> Option<ProductRecord> {
        self.read().products.get(id).cloned()
    }

    /// All products in first-insertion order
    pub fn list_products(&self) -> Vec<ProductRecord> {
        self.read().products.iter().cloned().collect()
    }

    /// Keyword search over stored products.
    ///
    /// Filters exclude first; remaining products need a positive keyword
    /// score (title 3, description 2, category 2 per token). Hits are
    /// ordered by rating, highest first, ties in insertion order.
    pub fn search_products(&self, query: &str, filters: Option<&SearchFilters>) -> Vec<ProductRecord> {
        let tokens = tokenize(query);
        let state = self.read();

        let candidates: Vec<&ProductRecord> = state
            .products
            .iter()
            .filter(|product| filters.is_none_or(|f| f.matches(product)))
            .collect();
        let candidate_count = candidates.len();

        let mut hits: Vec<&ProductRecord> = candidates
            .into_iter()
            .filter(|product| keyword_score(product, &tokens) > 0)
            .collect();
        sort_descending_by(&mut hits, |product| product.rating);

        let results: Vec<ProductRecord> = hits.into_iter().cloned().collect();
        drop(state);

        trace_search(SearchSpanAttributes {
            query: query.to_string(),
            filters_json: filters.map(safe_serialize).unwrap_or_default(),
            candidates: candidate_count,
            results: results.len(),
        });

        results
    }

    /// Products whose category contains `category` (case-insensitive)
    pub fn get_products_by_category(&self, category: &str) -> Vec<ProductRecord> {
        let needle = category.to_lowercase();
        self.read()
            .products
            .iter()
            .filter(|product| product.category.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Top `limit` products for a session.
    ///
    /// With a known session the score is rating plus 2 for a preferred
    /// category plus 1 for a price inside the preferred range. Without one
    /// the score is rating plus the record's age in days. Looking up the
    /// session does not touch it.
    pub fn recommend_products(&self, session_id: Option<&str>, limit: usize) -> Vec<ProductRecord> {
        let now = Utc::now();
        let state = self.read();
        let session = session_id.and_then(|id| state.sessions.get(id));

        let mut scored: Vec<(f64, &ProductRecord)> = state
            .products
            .iter()
            .map(|product| {
                let score = match session {
                    Some(session) => preference_score(product, &session.preferences),
                    None => rating_age_score(product, now),
                };
                (score, product)
            })
            .collect();
        sort_descending_by(&mut scored, |(score, _)| *score);

        scored
            .into_iter()
            .take(limit)
            .map(|(_, product)| product.clone())
            .collect()
    }

    // ----- sessions -----

    fn default_preferences(&self) -> PreferenceProfile {
        let prefs = &self.config.preferences;
        PreferenceProfile::new(
            PriceRange {
                min: prefs.default_min_price,
                max: prefs.default_max_price,
            },
            prefs.default_language.clone(),
        )
    }

    /// Existing session or a freshly created one, touched either way.
    fn session_entry<'a>(
        &self,
        sessions: &'a mut HashMap<String, SessionContext>,
        session_id: &str,
    ) -> &'a mut SessionContext {
        let session = sessions.entry(session_id.to_string()).or_insert_with(|| {
            tracing::debug!(session_id, "session created");
            SessionContext::new(session_id, self.default_preferences())
        });
        session.touch();
        session
    }

    /// Return the session, creating it with default preferences if needed.
    ///
    /// Always refreshes `last_activity`, even for an existing session.
    pub fn get_or_create_session(&self, session_id: &str) -> SessionContext {
        let mut state = self.write();
        self.session_entry(&mut state.sessions, session_id).clone()
    }

    /// Read a session without creating or touching it
    pub fn get_session(&self, session_id: &str) -> Option<SessionContext> {
        self.read().sessions.get(session_id).cloned()
    }

    pub fn append_message(&self, session_id: &str, message: Message) {
        let max = self.config.limits.max_messages;
        let mut state = self.write();
        let session = self.session_entry(&mut state.sessions, session_id);
        session.messages.push(message);
        truncate_front(&mut session.messages, max);
    }

    pub fn append_search_query(&self, session_id: &str, query: SearchQuery) {
        let max = self.config.limits.max_search_history;
        let mut state = self.write();
        let session = self.session_entry(&mut state.sessions, session_id);
        session.search_history.push(query);
        truncate_front(&mut session.search_history, max);
    }

    /// Record an interaction. A like or inquiry about a known product adds
    /// its category to the preferred set and widens the price range by the
    /// configured margin when the price falls outside it.
    pub fn append_product_interaction(&self, session_id: &str, interaction: ProductInteraction) {
        let margin = self.config.preferences.price_margin;
        let mut state = self.write();
        let CacheState {
            products, sessions, ..
        } = &mut *state;

        let session = self.session_entry(sessions, session_id);

        if interaction.action.signals_interest()
            && let Some(product) = products.get(interaction.product_id)
        {
            let preferences = &mut session.preferences;
            let new_category = preferences.categories.insert(product.category.clone());
            let widened = preferences.price_range.widen_to_include(product.price, margin);
            if new_category || widened {
                tracing::debug!(
                    session_id,
                    product_id = product.id,
                    min = preferences.price_range.min,
                    max = preferences.price_range.max,
                    "preferences updated from interaction"
                );
            }
        }

        session.interactions.push(interaction);
    }

    /// Merge an explicit preference change into the session
    pub fn update_preferences(&self, session_id: &str, update: PreferenceUpdate) {
        let mut state = self.write();
        let session = self.session_entry(&mut state.sessions, session_id);
        session.preferences.apply(update);
    }

    // ----- thoughts -----

    /// Stamp and store a thought; the oldest are dropped beyond the cap.
    pub fn log_thought(&self, thought: NewThought) -> AgentThought {
        let confidence = if thought.confidence.is_nan() {
            0.0
        } else {
            thought.confidence.clamp(0.0, 1.0)
        };

        let stored = AgentThought {
            id: Uuid::new_v4().to_string(),
            kind: thought.kind,
            content: thought.content,
            confidence,
            related_products: thought.related_products,
            timestamp: Utc::now(),
        };

        let max = self.config.limits.max_thoughts;
        let mut state = self.write();
        state.thoughts.push(stored.clone());
        truncate_front(&mut state.thoughts, max);

        stored
    }

    /// Newest first, at most `limit`. Thoughts logged at the same instant
    /// come out in reverse logging order.
    pub fn recent_thoughts(&self, limit: usize) -> Vec<AgentThought> {
        let mut thoughts: Vec<AgentThought> = self.read().thoughts.iter().rev().cloned().collect();
        thoughts.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        thoughts.truncate(limit);
        thoughts
    }

    pub fn thoughts_by_type(&self, kind: ThoughtKind) -> Vec<AgentThought> {
        self.read()
            .thoughts
            .iter()
            .filter(|thought| thought.kind == kind)
            .cloned()
            .collect()
    }

    // ----- reference data -----

    pub fn upsert_categories(&self, categories: impl IntoIterator<Item = CategoryRecord>) {
        let mut state = self.write();
        for category in categories {
            state.categories.insert(category.id, category);
        }
    }

    pub fn upsert_locations(&self, locations: impl IntoIterator<Item = LocationRecord>) {
        let mut state = self.write();
        for location in locations {
            state.locations.insert(location.id, location);
        }
    }

    pub fn get_category(&self, id: u64) -> Option<CategoryRecord> {
        self.read().categories.get(&id).cloned()
    }

    pub fn get_location(&self, id: u64) -> Option<LocationRecord> {
        self.read().locations.get(&id).cloned()
    }

    /// Categories ordered by id
    pub fn list_categories(&self) -> Vec<CategoryRecord> {
        self.read().categories.values().cloned().collect()
    }

    /// Locations ordered by id
    pub fn list_locations(&self) -> Vec<LocationRecord> {
        self.read().locations.values().cloned().collect()
    }

    // ----- housekeeping -----

    pub fn memory_stats(&self) -> MemoryStats {
        let state = self.read();
        let serialized_len = serde_json::to_string(&state.snapshot())
            .map(|text| text.len())
            .unwrap_or(0);

        MemoryStats {
            products: state.products.len(),
            sessions: state.sessions.len(),
            thoughts: state.thoughts.len(),
            categories: state.categories.len(),
            locations: state.locations.len(),
            estimated_bytes: serialized_len * 2,
        }
    }

    /// Drop sessions idle for more than `days_old` days and thoughts older
    /// than the same cutoff, measured from now.
    pub fn clear_stale_sessions(&self, days_old: i64) -> StaleSweep {
        self.clear_stale_sessions_at(Utc::now(), days_old)
    }

    /// [`MemoryCache::clear_stale_sessions`] with the configured age
    pub fn sweep_stale(&self) -> StaleSweep {
        self.clear_stale_sessions(self.config.persistence.stale_after_days)
    }

    /// Drop sessions whose last activity is before `now - days_old` and
    /// thoughts stamped before the same cutoff.
    ///
    /// A negative `days_old`, or one reaching past the representable date
    /// range, removes nothing.
    pub fn clear_stale_sessions_at(&self, now: DateTime<Utc>, days_old: i64) -> StaleSweep {
        if days_old < 0 {
            tracing::warn!(days_old, "negative stale age ignored, nothing removed");
            return StaleSweep::default();
        }
        let Some(cutoff) = TimeDelta::try_days(days_old)
            .and_then(|age| now.checked_sub_signed(age))
        else {
            tracing::debug!(days_old, "stale cutoff precedes the earliest date, nothing removed");
            return StaleSweep::default();
        };

        let mut state = self.write();

        let sessions_before = state.sessions.len();
        state
            .sessions
            .retain(|_, session| session.last_activity >= cutoff);

        let thoughts_before = state.thoughts.len();
        state.thoughts.retain(|thought| thought.timestamp >= cutoff);

        let sweep = StaleSweep {
            sessions_removed: sessions_before - state.sessions.len(),
            thoughts_removed: thoughts_before - state.thoughts.len(),
        };
        drop(state);

        if sweep != StaleSweep::default() {
            tracing::info!(
                sessions_removed = sweep.sessions_removed,
                thoughts_removed = sweep.thoughts_removed,
                %cutoff,
                "stale cache data removed"
            );
        }
        sweep
    }

    /// Empty every store and erase the persisted snapshot.
    ///
    /// Memory is cleared and listeners are notified even when erasing the
    /// snapshot fails; the erase error is returned.
    pub async fn clear_all(&self) -> Result<()> {
        self.write().clear();
        self.listeners.notify(&CacheUpdate::Cleared);
        tracing::info!("memory cache cleared");

        self.persister.erase().await
    }

    // ----- listeners -----

    /// Register a callback run after every product mutation.
    ///
    /// Callbacks run synchronously on the mutating thread, after the cache
    /// lock is released. An error or panic in one callback is logged and
    /// the remaining callbacks still run.
    pub fn on_update<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&CacheUpdate) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.listeners.register(callback)
    }

    /// Returns false if the listener was not registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}
