//! Core types for rentcache
//!
//! Domain records shared by the memory cache and its persistence layer,
//! plus the error taxonomy and configuration.

pub mod config;
pub mod error;
pub mod product;
pub mod reference;
pub mod session;
pub mod thought;

// Re-exports
pub use config::{
    LimitsConfig, ObservabilityConfig, PersistenceConfig, PreferencesConfig, RentCacheConfig,
};
pub use error::{Error, Result};
pub use product::{Availability, ListingDto, ProductRecord, SearchFilters};
pub use reference::{CategoryDto, CategoryRecord, LocationRecord, ProvinceDto};
pub use session::{
    InteractionAction, Message, MessageMetadata, PreferenceProfile, PreferenceUpdate, PriceRange,
    ProductInteraction, Role, SearchQuery, SessionContext, truncate_front,
};
pub use thought::{AgentThought, NewThought, ThoughtKind};
