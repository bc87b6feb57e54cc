//! Cache state and its snapshot form

use crate::index::ProductIndex;
use rentcache_core::{
    AgentThought, CategoryRecord, LimitsConfig, LocationRecord, ProductRecord, SessionContext,
    truncate_front,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Everything the cache holds. Guarded by one lock in [`crate::MemoryCache`].
#[derive(Debug, Default)]
pub(crate) struct CacheState {
    pub(crate) products: ProductIndex,
    pub(crate) sessions: HashMap<String, SessionContext>,
    pub(crate) thoughts: Vec<AgentThought>,
    pub(crate) categories: BTreeMap<u64, CategoryRecord>,
    pub(crate) locations: BTreeMap<u64, LocationRecord>,
}

/// Borrowed view written into the snapshot envelope.
///
/// Keyed collections are arrays of `[key, record]` pairs. Sessions are sorted
/// by id so identical states produce identical documents.
#[derive(Serialize)]
pub(crate) struct SnapshotRef<'a> {
    products: Vec<(u64, &'a ProductRecord)>,
    sessions: Vec<(&'a str, &'a SessionContext)>,
    thoughts: &'a [AgentThought],
    categories: Vec<(u64, &'a CategoryRecord)>,
    locations: Vec<&'a LocationRecord>,
}

/// Owned form read back from the envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct SnapshotPayload {
    #[serde(default)]
    products: Vec<(u64, ProductRecord)>,
    #[serde(default)]
    sessions: Vec<(String, SessionContext)>,
    #[serde(default)]
    thoughts: Vec<AgentThought>,
    #[serde(default)]
    categories: Vec<(u64, CategoryRecord)>,
    #[serde(default)]
    locations: Vec<LocationRecord>,
}

impl CacheState {
    pub(crate) fn snapshot(&self) -> SnapshotRef<'_> {
        let mut sessions: Vec<(&str, &SessionContext)> = self
            .sessions
            .iter()
            .map(|(id, session)| (id.as_str(), session))
            .collect();
        sessions.sort_by(|a, b| a.0.cmp(b.0));

        SnapshotRef {
            products: self.products.iter().map(|p| (p.id, p)).collect(),
            sessions,
            thoughts: &self.thoughts,
            categories: self.categories.iter().map(|(id, c)| (*id, c)).collect(),
            locations: self.locations.values().collect(),
        }
    }

    /// Rebuild state from a snapshot, re-applying the configured caps so a
    /// snapshot written under larger limits still satisfies them.
    pub(crate) fn restore(payload: SnapshotPayload, limits: &LimitsConfig) -> Self {
        let products = payload
            .products
            .into_iter()
            .map(|(id, mut product)| {
                product.id = id;
                product
            })
            .collect();

        let sessions = payload
            .sessions
            .into_iter()
            .map(|(id, mut session)| {
                truncate_front(&mut session.messages, limits.max_messages);
                truncate_front(&mut session.search_history, limits.max_search_history);
                session.session_id = id.clone();
                (id, session)
            })
            .collect();

        let mut thoughts = payload.thoughts;
        truncate_front(&mut thoughts, limits.max_thoughts);

        Self {
            products,
            sessions,
            thoughts,
            categories: payload
                .categories
                .into_iter()
                .map(|(id, mut category)| {
                    category.id = id;
                    (id, category)
                })
                .collect(),
            locations: payload
                .locations
                .into_iter()
                .map(|location| (location.id, location))
                .collect(),
        }
    }

    pub(crate) fn clear(&mut self) {
        self.products.clear();
        self.sessions.clear();
        self.thoughts.clear();
        self.categories.clear();
        self.locations.clear();
    }
}
