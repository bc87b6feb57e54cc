//! Keyword and recommendation scoring.
//!
//! Keyword score decides whether a product is a search hit; ordering of hits
//! is by rating, not by score.

use chrono::{DateTime, Utc};
use rentcache_core::{PreferenceProfile, ProductRecord};

const TITLE_WEIGHT: u32 = 3;
const DESCRIPTION_WEIGHT: u32 = 2;
const CATEGORY_WEIGHT: u32 = 2;

const PREFERRED_CATEGORY_BONUS: f64 = 2.0;
const PRICE_IN_RANGE_BONUS: f64 = 1.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Split on whitespace and lowercase.
pub(crate) fn tokenize(query: &str) -> Vec<String> {
    query.split_whitespace().map(str::to_lowercase).collect()
}

/// Sum of per-token weights for every field that contains the token.
pub(crate) fn keyword_score(product: &ProductRecord, tokens: &[String]) -> u32 {
    let title = product.title.to_lowercase();
    let description = product.description.to_lowercase();
    let category = product.category.to_lowercase();

    tokens
        .iter()
        .map(|token| {
            let mut score = 0;
            if title.contains(token.as_str()) {
                score += TITLE_WEIGHT;
            }
            if description.contains(token.as_str()) {
                score += DESCRIPTION_WEIGHT;
            }
            if category.contains(token.as_str()) {
                score += CATEGORY_WEIGHT;
            }
            score
        })
        .sum()
}

/// Rating plus bonuses for matching the session's preferences.
pub(crate) fn preference_score(product: &ProductRecord, preferences: &PreferenceProfile) -> f64 {
    let mut score = product.rating;
    if preferences.categories.contains(&product.category) {
        score += PREFERRED_CATEGORY_BONUS;
    }
    if preferences.price_range.contains(product.price) {
        score += PRICE_IN_RANGE_BONUS;
    }
    score
}

/// Rating plus the record's age in (fractional) days.
pub(crate) fn rating_age_score(product: &ProductRecord, now: DateTime<Utc>) -> f64 {
    let age_days = (now - product.last_updated).num_seconds() as f64 / SECONDS_PER_DAY;
    product.rating + age_days
}

/// Stable descending sort on a float key. Equal keys keep their input order.
pub(crate) fn sort_descending_by<T>(items: &mut [T], key: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| key(b).total_cmp(&key(a)));
}
