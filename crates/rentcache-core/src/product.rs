use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Availability of a listing as reported by the marketplace backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    #[default]
    Available,
    Rented,
    Maintenance,
    Unavailable,
}

impl Availability {
    /// Map the backend's free-form status string. Unknown values count as unavailable.
    pub fn from_status(status: &str) -> Self {
        match status.trim().to_lowercase().as_str() {
            "available" | "active" => Availability::Available,
            "rented" | "booked" => Availability::Rented,
            "maintenance" => Availability::Maintenance,
            _ => Availability::Unavailable,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

/// Denormalized snapshot of a rentable listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub category: String,
    /// Price per rental day
    pub price: f64,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub specifications: BTreeMap<String, serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub availability: Availability,
    pub last_updated: DateTime<Utc>,
}

impl ProductRecord {
    pub fn new(id: u64, title: impl Into<String>, category: impl Into<String>, price: f64) -> Self {
        Self {
            id,
            title: title.into(),
            description: String::new(),
            category: category.into(),
            price,
            location: String::new(),
            images: Vec::new(),
            specifications: BTreeMap::new(),
            owner: None,
            rating: 0.0,
            availability: Availability::Available,
            last_updated: Utc::now(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }
}

/// Listing as returned by the product-search API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDto {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category_name: String,
    pub price_per_day: f64,
    #[serde(default)]
    pub province_name: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub specifications: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub availability_status: Option<String>,
}

impl From<ListingDto> for ProductRecord {
    fn from(dto: ListingDto) -> Self {
        Self {
            id: dto.id,
            title: dto.title,
            description: dto.description.unwrap_or_default(),
            category: dto.category_name,
            price: dto.price_per_day,
            location: dto.province_name.unwrap_or_default(),
            images: dto.images,
            specifications: dto.specifications,
            owner: dto.owner_name,
            rating: dto.average_rating.unwrap_or(0.0),
            availability: dto
                .availability_status
                .as_deref()
                .map(Availability::from_status)
                .unwrap_or_default(),
            last_updated: Utc::now(),
        }
    }
}

/// Hard filters applied before keyword scoring. All present filters must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilters {
    /// Exact category name
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub category: Option<String>,
    /// Substring of the product location
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub min_price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub max_price: Option<f64>,
}

impl SearchFilters {
    pub fn matches(&self, product: &ProductRecord) -> bool {
        if let Some(category) = &self.category {
            if product.category != *category {
                return false;
            }
        }
        if let Some(location) = &self.location {
            if !product
                .location
                .to_lowercase()
                .contains(&location.to_lowercase())
            {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if product.price < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if product.price > max {
                return false;
            }
        }
        true
    }
}
