//! # rentcache Memory
//!
//! Working memory for a rental-marketplace chat agent: known products,
//! per-session conversation state and a rolling log of agent thoughts.
//!
//! ## Overview
//!
//! The orchestration layer reads and writes the cache around each chat
//! turn. Products arrive from the product-search API and are kept as
//! denormalized snapshots; sessions accumulate messages, searches and
//! interactions, and infer a preference profile from what the user likes.
//!
//! ## Features
//!
//! - **Keyword search**: filter, score, then order hits by rating
//! - **Recommendations**: preference-aware when the session is known
//! - **Bounded logs**: messages, search history and thoughts are capped
//! - **Snapshot persistence**: restored on open, flushed on an interval
//! - **Listeners**: callbacks after product mutations
//!
//! ## Usage
//!
//! ```rust,no_run
//! use rentcache_core::{Message, ProductRecord, RentCacheConfig};
//! use rentcache_memory::MemoryCache;
//!
//! # async fn example() -> rentcache_core::Result<()> {
//! let cache = MemoryCache::from_config(RentCacheConfig::default()).await?;
//!
//! cache.upsert_product(ProductRecord::new(1, "Camping tent", "Camping", 350.0));
//! cache.append_message("session-1", Message::user("I need a tent for the weekend"));
//!
//! let hits = cache.search_products("tent", None);
//! assert_eq!(hits.len(), 1);
//!
//! cache.shutdown().await;
//! # Ok(())
//! # }
//! ```

mod cache;
mod index;
mod listeners;
mod persistence;
mod scoring;
mod state;

pub use cache::{
    DEFAULT_RECENT_THOUGHTS, DEFAULT_RECOMMENDATION_LIMIT, MemoryCache, MemoryStats, StaleSweep,
};
pub use listeners::{CacheUpdate, Listener, ListenerId};

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use rentcache_core::{
        CategoryRecord, InteractionAction, LocationRecord, Message, MessageMetadata, NewThought,
        PreferenceProfile, PreferenceUpdate, PriceRange, ProductInteraction, ProductRecord,
        RentCacheConfig, SearchFilters, SearchQuery, SessionContext, ThoughtKind,
    };
    use rentcache_store::{InMemorySnapshotStore, SnapshotStore, encode_envelope};
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn new_cache() -> MemoryCache {
        MemoryCache::open(
            RentCacheConfig::test_defaults(),
            Arc::new(InMemorySnapshotStore::new()),
        )
        .await
        .unwrap()
    }

    fn product(id: u64, title: &str, category: &str, price: f64, rating: f64) -> ProductRecord {
        ProductRecord::new(id, title, category, price).with_rating(rating)
    }

    #[tokio::test]
    async fn test_upsert_replaces_existing_id() {
        let cache = new_cache().await;

        cache.upsert_product(product(1, "Tent", "Camping", 300.0, 4.0));
        cache.upsert_product(
            product(1, "Family Tent", "Outdoor", 450.0, 4.8).with_location("Chiang Mai"),
        );
        cache.upsert_product(product(1, "Family Tent", "Outdoor", 450.0, 4.8));

        let products = cache.list_products();
        assert_eq!(products.len(), 1);

        let stored = cache.get_product(1).unwrap();
        assert_eq!(stored.title, "Family Tent");
        assert_eq!(stored.category, "Outdoor");
        assert_eq!(stored.price, 450.0);
        assert_eq!(stored.location, "");
        assert!(cache.get_product(2).is_none());
    }

    #[tokio::test]
    async fn test_message_log_is_capped() {
        let cache = new_cache().await;

        for i in 0..60 {
            cache.append_message("s1", Message::user(format!("message {}", i)));
        }

        let session = cache.get_session("s1").unwrap();
        assert_eq!(session.messages.len(), 50);
        let texts: Vec<String> = session.messages.iter().map(|m| m.text.clone()).collect();
        let expected: Vec<String> = (10..60).map(|i| format!("message {}", i)).collect();
        assert_eq!(texts, expected);
    }

    #[tokio::test]
    async fn test_search_history_is_capped() {
        let cache = new_cache().await;

        for i in 0..25 {
            cache.append_search_query("s1", SearchQuery::new(format!("query {}", i), i));
        }

        let history = cache.get_session("s1").unwrap().search_history;
        assert_eq!(history.len(), 20);
        assert_eq!(history[0].query, "query 5");
        assert_eq!(history[19].query, "query 24");
    }

    #[tokio::test]
    async fn test_interactions_are_unbounded() {
        let cache = new_cache().await;

        for i in 0..120 {
            cache.append_product_interaction("s1", ProductInteraction::new(i, InteractionAction::View));
        }

        assert_eq!(cache.get_session("s1").unwrap().interactions.len(), 120);
    }

    #[tokio::test]
    async fn test_search_orders_by_rating_not_score() {
        let cache = new_cache().await;

        // Description-only match (score 2), inserted first
        cache.upsert_product(
            product(1, "Mirrorless body", "Cameras", 900.0, 4.0)
                .with_description("Great for a drone pilot backup"),
        );
        // Title match (score 3), same rating, inserted second
        cache.upsert_product(product(2, "DJI drone", "Aerial", 1500.0, 4.0));
        // Title match, higher rating, inserted last
        cache.upsert_product(product(3, "Racing drone", "Aerial", 800.0, 4.9));
        // No match
        cache.upsert_product(product(4, "Kayak", "Water", 500.0, 5.0));

        let ids: Vec<u64> = cache
            .search_products("drone", None)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    #[tokio::test]
    async fn test_search_filters_exclude_before_scoring() {
        let cache = new_cache().await;

        cache.upsert_product(product(1, "Tent", "Camping", 300.0, 4.0).with_location("Chiang Mai"));
        cache.upsert_product(product(2, "Tent XL", "Camping", 900.0, 4.5).with_location("Bangkok"));
        cache.upsert_product(product(3, "Tent", "Festival", 200.0, 4.2).with_location("Chiang Rai"));

        let filters = SearchFilters {
            category: Some("Camping".to_string()),
            location: Some("chiang".to_string()),
            ..SearchFilters::default()
        };
        let ids: Vec<u64> = cache
            .search_products("tent", Some(&filters))
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![1]);

        let price_band = SearchFilters {
            min_price: Some(250.0),
            max_price: Some(900.0),
            ..SearchFilters::default()
        };
        let ids: Vec<u64> = cache
            .search_products("tent", Some(&price_band))
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_empty_query_matches_nothing() {
        let cache = new_cache().await;
        cache.upsert_product(product(1, "Tent", "Camping", 300.0, 4.0));

        assert!(cache.search_products("   ", None).is_empty());
    }

    #[tokio::test]
    async fn test_products_by_category_substring() {
        let cache = new_cache().await;
        cache.upsert_product(product(1, "Canon R5", "Cameras & Lenses", 1200.0, 4.5));
        cache.upsert_product(product(2, "Tent", "Camping", 300.0, 4.0));

        let ids: Vec<u64> = cache
            .get_products_by_category("camera")
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![1]);
    }

    #[tokio::test]
    async fn test_like_inside_range_does_not_widen() {
        let cache = new_cache().await;
        cache.upsert_product(product(1, "Projector", "Electronics", 3000.0, 4.0));

        cache.append_product_interaction("s1", ProductInteraction::new(1, InteractionAction::Like));

        let preferences = cache.get_session("s1").unwrap().preferences;
        assert_eq!(preferences.price_range, PriceRange { min: 0.0, max: 10_000.0 });
        assert!(preferences.categories.contains("Electronics"));
    }

    #[tokio::test]
    async fn test_like_above_range_widens_max() {
        let cache = new_cache().await;
        cache.upsert_product(product(1, "Cinema camera", "Cameras", 15_000.0, 4.9));

        cache.append_product_interaction("s1", ProductInteraction::new(1, InteractionAction::Inquire));

        let preferences = cache.get_session("s1").unwrap().preferences;
        assert_eq!(preferences.price_range.max, 15_500.0);
        assert_eq!(preferences.price_range.min, 0.0);
    }

    #[tokio::test]
    async fn test_view_and_unknown_product_leave_preferences() {
        let cache = new_cache().await;
        cache.upsert_product(product(1, "Cinema camera", "Cameras", 15_000.0, 4.9));

        cache.append_product_interaction("s1", ProductInteraction::new(1, InteractionAction::View));
        cache.append_product_interaction("s1", ProductInteraction::new(42, InteractionAction::Like));

        let session = cache.get_session("s1").unwrap();
        assert_eq!(session.interactions.len(), 2);
        assert!(session.preferences.categories.is_empty());
        assert_eq!(session.preferences.price_range.max, 10_000.0);
    }

    #[tokio::test]
    async fn test_update_preferences() {
        let cache = new_cache().await;

        cache.update_preferences(
            "s1",
            PreferenceUpdate {
                categories: vec!["Drones".to_string()],
                price_range: Some(PriceRange { min: 100.0, max: 900.0 }),
                ..PreferenceUpdate::default()
            },
        );

        let preferences = cache.get_session("s1").unwrap().preferences;
        assert!(preferences.categories.contains("Drones"));
        assert_eq!(preferences.price_range.min, 100.0);
        assert_eq!(preferences.language, "en");
    }

    #[tokio::test]
    async fn test_get_or_create_touches_session() {
        let cache = new_cache().await;

        let created = cache.get_or_create_session("s1");
        assert!(cache.get_session("missing").is_none());

        std::thread::sleep(std::time::Duration::from_millis(5));
        let touched = cache.get_or_create_session("s1");

        assert_eq!(created.created_at, touched.created_at);
        assert!(touched.last_activity > created.last_activity);

        // get_session is a plain read
        let read = cache.get_session("s1").unwrap();
        assert_eq!(read.last_activity, touched.last_activity);
    }

    #[tokio::test]
    async fn test_recommend_with_session_preferences() {
        let cache = new_cache().await;
        cache.upsert_product(product(1, "Kayak", "Water", 500.0, 4.0));
        cache.upsert_product(product(2, "Drone", "Aerial", 20_000.0, 4.5));
        cache.upsert_product(product(3, "Tent", "Camping", 300.0, 3.5));

        cache.update_preferences(
            "s1",
            PreferenceUpdate {
                categories: vec!["Camping".to_string()],
                ..PreferenceUpdate::default()
            },
        );

        // Tent: 3.5 + 2 + 1, Kayak: 4.0 + 1, Drone: 4.5 (outside price range)
        let ids: Vec<u64> = cache
            .recommend_products(Some("s1"), DEFAULT_RECOMMENDATION_LIMIT)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![3, 1, 2]);

        let top_one = cache.recommend_products(Some("s1"), 1);
        assert_eq!(top_one.len(), 1);
    }

    #[tokio::test]
    async fn test_recommend_without_session_uses_rating() {
        let cache = new_cache().await;
        cache.upsert_products(vec![
            product(1, "Kayak", "Water", 500.0, 3.0),
            product(2, "Drone", "Aerial", 2000.0, 4.5),
            product(3, "Tent", "Camping", 300.0, 4.0),
        ]);

        // All records were stamped together, so age contributes equally
        let ids: Vec<u64> = cache
            .recommend_products(None, 2)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);

        // Unknown session falls back to the same ranking and is not created
        let ids: Vec<u64> = cache
            .recommend_products(Some("ghost"), 2)
            .iter()
            .map(|p| p.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(cache.get_session("ghost").is_none());
    }

    #[tokio::test]
    async fn test_thought_log_is_capped_and_ordered() {
        let cache = new_cache().await;

        for i in 0..105 {
            cache.log_thought(NewThought::new(
                ThoughtKind::Analysis,
                format!("step {}", i),
                0.5,
            ));
        }

        assert_eq!(cache.memory_stats().thoughts, 100);

        let recent = cache.recent_thoughts(DEFAULT_RECENT_THOUGHTS);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0].content, "step 104");
        assert!(recent.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));
    }

    #[tokio::test]
    async fn test_log_thought_assigns_id_and_clamps_confidence() {
        let cache = new_cache().await;

        let first = cache.log_thought(NewThought::new(ThoughtKind::Question, "budget?", 1.7));
        let second = cache.log_thought(
            NewThought::new(ThoughtKind::Recommendation, "suggest tent", -0.2)
                .with_related_products(vec![3]),
        );

        assert_ne!(first.id, second.id);
        assert_eq!(first.confidence, 1.0);
        assert_eq!(second.confidence, 0.0);
        assert_eq!(second.related_products, vec![3]);

        let questions = cache.thoughts_by_type(ThoughtKind::Question);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].id, first.id);
        assert!(cache.thoughts_by_type(ThoughtKind::Clarification).is_empty());
    }

    fn stale_fixture_session(id: &str, idle_days: i64, now: chrono::DateTime<Utc>) -> SessionContext {
        let mut session = SessionContext::new(
            id,
            PreferenceProfile::new(PriceRange { min: 0.0, max: 10_000.0 }, "en"),
        );
        session.created_at = now - Duration::days(idle_days);
        session.last_activity = now - Duration::days(idle_days);
        session
    }

    #[tokio::test]
    async fn test_clear_stale_sessions_with_fixed_now() {
        let now = Utc::now();
        let payload = json!({
            "sessions": [
                ["old", stale_fixture_session("old", 31, now)],
                ["recent", stale_fixture_session("recent", 29, now)],
            ],
            "thoughts": [
                {
                    "id": "t-old",
                    "type": "analysis",
                    "content": "old reasoning",
                    "confidence": 0.4,
                    "relatedProducts": [],
                    "timestamp": now - Duration::days(40),
                },
                {
                    "id": "t-new",
                    "type": "analysis",
                    "content": "fresh reasoning",
                    "confidence": 0.9,
                    "relatedProducts": [],
                    "timestamp": now - Duration::days(1),
                }
            ]
        });
        let store = InMemorySnapshotStore::with_snapshot(encode_envelope(&payload).unwrap());

        let cache = MemoryCache::open(RentCacheConfig::test_defaults(), Arc::new(store))
            .await
            .unwrap();
        assert_eq!(cache.memory_stats().sessions, 2);

        let sweep = cache.clear_stale_sessions_at(now, 30);
        assert_eq!(sweep.sessions_removed, 1);
        assert_eq!(sweep.thoughts_removed, 1);

        assert!(cache.get_session("old").is_none());
        assert!(cache.get_session("recent").is_some());
        assert_eq!(cache.recent_thoughts(10)[0].id, "t-new");
    }

    #[tokio::test]
    async fn test_sweep_stale_uses_configured_age() {
        let now = Utc::now();
        let payload = json!({
            "sessions": [
                ["idle", stale_fixture_session("idle", 8, now)],
                ["active", stale_fixture_session("active", 2, now)],
            ]
        });
        let store = InMemorySnapshotStore::with_snapshot(encode_envelope(&payload).unwrap());

        let mut config = RentCacheConfig::test_defaults();
        config.persistence.stale_after_days = 7;
        let cache = MemoryCache::open(config, Arc::new(store)).await.unwrap();

        let sweep = cache.sweep_stale();
        assert_eq!(sweep.sessions_removed, 1);
        assert!(cache.get_session("idle").is_none());
        assert!(cache.get_session("active").is_some());
    }

    #[tokio::test]
    async fn test_stale_sweep_out_of_range_ages_remove_nothing() {
        let cache = new_cache().await;
        cache.get_or_create_session("s1");
        cache.log_thought(NewThought::new(ThoughtKind::Analysis, "just now", 0.5));

        // Cutoff would fall before the earliest representable date
        assert_eq!(cache.clear_stale_sessions(100_000_000), StaleSweep::default());
        assert_eq!(cache.clear_stale_sessions(i64::MAX), StaleSweep::default());
        // Negative ages would put the cutoff in the future
        assert_eq!(cache.clear_stale_sessions(-1), StaleSweep::default());

        assert!(cache.get_session("s1").is_some());
        assert_eq!(cache.memory_stats().thoughts, 1);
    }

    #[tokio::test]
    async fn test_clear_all_resets_counts_and_erases_snapshot() {
        let store = InMemorySnapshotStore::new();
        let cache = MemoryCache::open(RentCacheConfig::test_defaults(), Arc::new(store.clone()))
            .await
            .unwrap();

        cache.upsert_product(product(1, "Tent", "Camping", 300.0, 4.0));
        cache.append_message("s1", Message::user("hello"));
        cache.log_thought(NewThought::new(ThoughtKind::Analysis, "greeting", 0.9));
        cache.upsert_categories(vec![CategoryRecord {
            id: 1,
            name: "Camping".to_string(),
            localized_name: None,
        }]);
        cache.flush().await.unwrap();
        assert!(store.contents().is_some());

        cache.clear_all().await.unwrap();

        let stats = cache.memory_stats();
        assert_eq!(stats.products, 0);
        assert_eq!(stats.sessions, 0);
        assert_eq!(stats.thoughts, 0);
        assert_eq!(stats.categories, 0);
        assert_eq!(stats.locations, 0);
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_memory_stats_estimate_grows() {
        let cache = new_cache().await;
        let empty = cache.memory_stats();

        cache.upsert_product(
            product(1, "Tent", "Camping", 300.0, 4.0)
                .with_description("Four person dome tent with rain fly"),
        );
        let stats = cache.memory_stats();

        assert_eq!(stats.products, 1);
        assert!(stats.estimated_bytes > empty.estimated_bytes);
        assert_eq!(stats.estimated_bytes % 2, 0);
    }

    #[tokio::test]
    async fn test_listeners_run_after_product_mutations() {
        let cache = new_cache().await;
        let seen = Arc::new(AtomicUsize::new(0));

        cache.on_update(|_| Err(anyhow::anyhow!("listener failure")));
        let counter = seen.clone();
        let reader = cache.clone();
        let id = cache.on_update(move |update| {
            if let CacheUpdate::ProductsUpserted(ids) = update {
                // The cache is readable from inside a listener
                assert!(reader.get_product(ids[0]).is_some());
            }
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        cache.upsert_product(product(1, "Tent", "Camping", 300.0, 4.0));
        cache.upsert_products(vec![]);
        cache.append_message("s1", Message::user("not a product mutation"));
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        cache.clear_all().await.unwrap();
        assert_eq!(seen.load(Ordering::SeqCst), 2);

        assert!(cache.remove_listener(id));
        cache.upsert_product(product(2, "Kayak", "Water", 500.0, 4.0));
        assert_eq!(seen.load(Ordering::SeqCst), 2);
        assert_eq!(cache.listener_count(), 1);
    }

    #[tokio::test]
    async fn test_reference_data() {
        let cache = new_cache().await;

        cache.upsert_categories(vec![
            CategoryRecord {
                id: 2,
                name: "Cameras".to_string(),
                localized_name: None,
            },
            CategoryRecord {
                id: 1,
                name: "Camping".to_string(),
                localized_name: None,
            },
        ]);
        cache.upsert_locations(vec![LocationRecord {
            id: 10,
            name: "Chiang Mai".to_string(),
            localized_name: None,
        }]);
        cache.upsert_categories(vec![CategoryRecord {
            id: 2,
            name: "Cameras & Lenses".to_string(),
            localized_name: None,
        }]);

        let names: Vec<String> = cache.list_categories().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Camping", "Cameras & Lenses"]);
        assert_eq!(cache.get_location(10).unwrap().name, "Chiang Mai");
        assert!(cache.get_category(3).is_none());
        assert_eq!(cache.list_locations().len(), 1);
    }

    #[tokio::test]
    async fn test_open_with_malformed_snapshot_starts_empty() {
        let store = InMemorySnapshotStore::with_snapshot("not json at all");
        let cache = MemoryCache::open(RentCacheConfig::test_defaults(), Arc::new(store))
            .await
            .unwrap();

        assert_eq!(cache.memory_stats().products, 0);
    }

    #[tokio::test]
    async fn test_open_rejects_invalid_config() {
        let mut config = RentCacheConfig::test_defaults();
        config.limits.max_messages = 0;

        let result = MemoryCache::open(config, Arc::new(InMemorySnapshotStore::new())).await;
        match result {
            Err(rentcache_core::Error::Config(msg)) => assert!(msg.contains("limits")),
            Err(other) => panic!("expected a config error, got {other}"),
            Ok(_) => panic!("expected a config error"),
        }
    }

    #[tokio::test]
    async fn test_conversation_scenario() {
        let cache = new_cache().await;

        cache.get_or_create_session("s1");
        cache.append_message("s1", Message::user("hello"));
        cache.append_message(
            "s1",
            Message::agent("What would you like to rent?")
                .with_metadata(MessageMetadata::with_intent("product_search")),
        );

        assert!(cache.recent_thoughts(5).is_empty());

        let logged = cache.log_thought(NewThought::new(
            ThoughtKind::Analysis,
            "user greeted, intent unclear",
            0.6,
        ));

        let recent = cache.recent_thoughts(5);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0], logged);

        let session = cache.get_session("s1").unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(
            session.messages[1]
                .metadata
                .as_ref()
                .and_then(|m| m.intent.as_deref()),
            Some("product_search")
        );
    }
}
