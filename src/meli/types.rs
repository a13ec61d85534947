//! Request and response shapes for the Mercado Livre REST API.

use serde::{Deserialize, Serialize};

// ── requests ────────────────────────────────────────────────────────────

/// Body of `POST /items`.
#[derive(Debug, Clone, Serialize)]
pub struct NewItem {
    pub title: String,
    pub category_id: String,
    pub price: f64,
    pub currency_id: String,
    pub available_quantity: u32,
    pub buying_mode: String,
    pub listing_type_id: String,
    pub condition: String,
    pub description: ItemDescription,
    pub pictures: Vec<PictureSource>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemDescription {
    pub plain_text: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PictureSource {
    pub source: String,
}

// ── responses ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub results: Vec<SearchResult>,
}

#[derive(Debug, Clone, Deserialize)]
#[allow(dead_code)]
pub struct SearchResult {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub category_id: Option<String>,
}

/// One entry of the domain-discovery prediction list.
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryPrediction {
    #[serde(default)]
    pub domain_id: Option<String>,
    #[serde(default)]
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Absent when the endpoint does not rotate the refresh token.
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub id: u64,
    #[serde(default)]
    pub nickname: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActiveItemsResponse {
    #[serde(default)]
    pub results: Vec<String>,
    #[serde(default)]
    pub paging: Option<Paging>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Paging {
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PublishedItem {
    pub id: String,
    #[serde(default)]
    pub permalink: String,
}
