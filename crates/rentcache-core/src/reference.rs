//! Mirrors of the backend taxonomy: categories and provinces.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub localized_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub localized_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryDto {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub name_th: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvinceDto {
    pub id: u64,
    pub name_en: String,
    #[serde(default)]
    pub name_th: Option<String>,
}

impl From<CategoryDto> for CategoryRecord {
    fn from(dto: CategoryDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name,
            localized_name: dto.name_th,
        }
    }
}

impl From<ProvinceDto> for LocationRecord {
    fn from(dto: ProvinceDto) -> Self {
        Self {
            id: dto.id,
            name: dto.name_en,
            localized_name: dto.name_th,
        }
    }
}
