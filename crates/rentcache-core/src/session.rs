use crate::product::SearchFilters;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

/// Who produced a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
}

/// Optional annotations the agent attaches to a turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageMetadata {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub intent: Option<String>,
    #[serde(skip_serializing_if = "HashMap::is_empty", default)]
    pub entities: HashMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub product_ids: Vec<u64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub confidence: Option<f64>,
}

impl MessageMetadata {
    pub fn with_intent(intent: impl Into<String>) -> Self {
        Self {
            intent: Some(intent.into()),
            ..Self::default()
        }
    }
}

/// One turn in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub metadata: Option<MessageMetadata>,
}

impl Message {
    pub fn new(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            text: text.into(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, text)
    }

    pub fn agent(text: impl Into<String>) -> Self {
        Self::new(Role::Agent, text)
    }

    pub fn with_metadata(mut self, metadata: MessageMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }
}

/// A search the user ran during the session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub query: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub filters: Option<SearchFilters>,
    #[serde(default)]
    pub result_count: usize,
    pub timestamp: DateTime<Utc>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>, result_count: usize) -> Self {
        Self {
            query: query.into(),
            filters: None,
            result_count,
            timestamp: Utc::now(),
        }
    }

    pub fn with_filters(mut self, filters: SearchFilters) -> Self {
        self.filters = Some(filters);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionAction {
    View,
    Like,
    Inquire,
    Rent,
}

impl InteractionAction {
    /// Actions that signal interest strongly enough to shift preferences.
    pub fn signals_interest(&self) -> bool {
        matches!(self, InteractionAction::Like | InteractionAction::Inquire)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInteraction {
    pub product_id: u64,
    pub action: InteractionAction,
    pub timestamp: DateTime<Utc>,
}

impl ProductInteraction {
    pub fn new(product_id: u64, action: InteractionAction) -> Self {
        Self {
            product_id,
            action,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

impl PriceRange {
    pub fn contains(&self, price: f64) -> bool {
        price >= self.min && price <= self.max
    }

    /// Move the nearest bound outward so `price` lies `margin` inside it.
    /// Returns true when a bound moved. The lower bound never goes below zero.
    pub fn widen_to_include(&mut self, price: f64, margin: f64) -> bool {
        if price < self.min {
            self.min = (price - margin).max(0.0);
            true
        } else if price > self.max {
            self.max = price + margin;
            true
        } else {
            false
        }
    }
}

/// Inferred user taste, owned by a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceProfile {
    pub categories: BTreeSet<String>,
    pub price_range: PriceRange,
    pub locations: BTreeSet<String>,
    pub language: String,
}

impl PreferenceProfile {
    pub fn new(price_range: PriceRange, language: impl Into<String>) -> Self {
        Self {
            categories: BTreeSet::new(),
            price_range,
            locations: BTreeSet::new(),
            language: language.into(),
        }
    }

    /// Merge an explicit update. Sets grow, scalars are replaced.
    pub fn apply(&mut self, update: PreferenceUpdate) {
        self.categories.extend(update.categories);
        self.locations.extend(update.locations);
        if let Some(range) = update.price_range {
            self.price_range = range;
        }
        if let Some(language) = update.language {
            self.language = language;
        }
    }
}

/// Partial preference change supplied by the orchestration layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceUpdate {
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub locations: Vec<String>,
    #[serde(default)]
    pub price_range: Option<PriceRange>,
    #[serde(default)]
    pub language: Option<String>,
}

/// One chat session's state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    pub session_id: String,
    pub messages: Vec<Message>,
    pub preferences: PreferenceProfile,
    pub search_history: Vec<SearchQuery>,
    pub interactions: Vec<ProductInteraction>,
    pub created_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
}

impl SessionContext {
    pub fn new(session_id: impl Into<String>, preferences: PreferenceProfile) -> Self {
        let now = Utc::now();
        Self {
            session_id: session_id.into(),
            messages: Vec::new(),
            preferences,
            search_history: Vec::new(),
            interactions: Vec::new(),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Utc::now();
    }
}

/// Drop the oldest entries so at most `max` remain.
pub fn truncate_front<T>(items: &mut Vec<T>, max: usize) {
    if items.len() > max {
        let excess = items.len() - max;
        items.drain(..excess);
    }
}
