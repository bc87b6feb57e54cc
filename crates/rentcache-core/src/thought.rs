use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of reasoning step the agent logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThoughtKind {
    Analysis,
    Recommendation,
    Question,
    Clarification,
}

impl fmt::Display for ThoughtKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ThoughtKind::Analysis => "analysis",
            ThoughtKind::Recommendation => "recommendation",
            ThoughtKind::Question => "question",
            ThoughtKind::Clarification => "clarification",
        };
        f.write_str(name)
    }
}

/// A logged reasoning step. Id and timestamp are assigned by the cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentThought {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ThoughtKind,
    pub content: String,
    pub confidence: f64,
    #[serde(default)]
    pub related_products: Vec<u64>,
    pub timestamp: DateTime<Utc>,
}

/// Thought as submitted by the agent, before the cache stamps it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewThought {
    pub kind: ThoughtKind,
    pub content: String,
    pub confidence: f64,
    pub related_products: Vec<u64>,
}

impl NewThought {
    pub fn new(kind: ThoughtKind, content: impl Into<String>, confidence: f64) -> Self {
        Self {
            kind,
            content: content.into(),
            confidence,
            related_products: Vec::new(),
        }
    }

    pub fn with_related_products(mut self, product_ids: Vec<u64>) -> Self {
        self.related_products = product_ids;
        self
    }
}
