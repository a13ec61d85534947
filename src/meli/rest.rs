//! Thin client for the Mercado Livre REST API.
//!
//! Search and domain discovery are public endpoints. Everything else wants a
//! bearer token; those calls go through `send_authed`, which refreshes the
//! token and retries exactly once when the API answers 401.

use super::auth::TokenManager;
use super::types::{
    ActiveItemsResponse, CategoryPrediction, NewItem, PublishedItem, SearchResponse, UserResponse,
};
use crate::config::MeliConfig;
use anyhow::{Context, Result};
use reqwest::Client;

/// First search hit for a product title.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchReference {
    pub price: f64,
    pub category_id: Option<String>,
}

pub struct MeliRest {
    client: Client,
    base_url: String,
    site_id: String,
    auth: Option<TokenManager>,
}

impl MeliRest {
    /// `auth` is only needed for publish/purge calls; price lookups work
    /// without credentials.
    pub fn new(config: &MeliConfig, auth: Option<TokenManager>) -> Self {
        let client = Client::builder()
            .pool_max_idle_per_host(4)
            .build()
            .expect("failed to build HTTP client");
        Self {
            client,
            base_url: config.api_base.trim_end_matches('/').to_string(),
            site_id: config.site_id.clone(),
            auth,
        }
    }

    /// Price and category of the first search hit for `query`, or `None`
    /// when the marketplace has nothing under that title.
    pub async fn search_reference(&self, query: &str) -> Result<Option<SearchReference>> {
        let url = format!("{}/sites/{}/search", self.base_url, self.site_id);
        let resp = self
            .client
            .get(&url)
            .query(&[("q", query)])
            .send()
            .await
            .context("marketplace search request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("search for '{}' failed ({}): {}", query, status, body);
        }
        let parsed: SearchResponse = resp
            .json()
            .await
            .context("failed to parse search response")?;
        Ok(parsed.results.into_iter().next().map(|hit| SearchReference {
            price: hit.price,
            category_id: hit.category_id,
        }))
    }

    /// Category id predicted by domain discovery for a listing title.
    pub async fn predict_category(&self, title: &str) -> Result<Option<String>> {
        let url = format!(
            "{}/sites/{}/domain_discovery/search",
            self.base_url, self.site_id
        );
        let resp = self
            .client
            .get(&url)
            .query(&[("q", title), ("limit", "1")])
            .send()
            .await
            .context("domain discovery request failed")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("domain discovery failed ({}): {}", status, body);
        }
        let predictions: Vec<CategoryPrediction> = resp
            .json()
            .await
            .context("failed to parse domain discovery response")?;
        let first = predictions.into_iter().next();
        if let Some(prediction) = &first {
            tracing::debug!(
                domain = ?prediction.domain_id,
                category = ?prediction.category_id,
                "category predicted"
            );
        }
        Ok(first.and_then(|p| p.category_id))
    }

    /// Create a listing. The API creates with 201; anything else is an error.
    pub async fn publish(&mut self, item: &NewItem) -> Result<PublishedItem> {
        let url = format!("{}/items", self.base_url);
        let resp = self
            .send_authed(|client, token| client.post(&url).bearer_auth(token).json(item))
            .await?;
        let status = resp.status();
        if status.as_u16() != 201 {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("publish of '{}' failed ({}): {}", item.title, status, body);
        }
        resp.json::<PublishedItem>()
            .await
            .context("failed to parse publish response")
    }

    /// Numeric id of the account behind the current token.
    pub async fn my_user_id(&mut self) -> Result<u64> {
        let url = format!("{}/users/me", self.base_url);
        let resp = self
            .send_authed(|client, token| client.get(&url).bearer_auth(token))
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("users/me failed ({}): {}", status, body);
        }
        let user: UserResponse = resp.json().await.context("failed to parse user response")?;
        tracing::debug!(user_id = user.id, nickname = %user.nickname, "account resolved");
        Ok(user.id)
    }

    /// Every active listing id on the account, walking the paging offsets.
    pub async fn active_item_ids(&mut self, user_id: u64) -> Result<Vec<String>> {
        let url = format!("{}/users/{}/items/search", self.base_url, user_id);
        let mut ids: Vec<String> = Vec::new();
        loop {
            let offset = ids.len().to_string();
            let resp = self
                .send_authed(|client, token| {
                    client
                        .get(&url)
                        .query(&[("status", "active"), ("offset", offset.as_str())])
                        .bearer_auth(token)
                })
                .await?;
            let status = resp.status();
            if !status.is_success() {
                let body = resp.text().await.unwrap_or_default();
                anyhow::bail!("active items search failed ({}): {}", status, body);
            }
            let parsed: ActiveItemsResponse = resp
                .json()
                .await
                .context("failed to parse items search response")?;
            let page_len = parsed.results.len();
            ids.extend(parsed.results);
            let total = parsed.paging.map(|p| p.total).unwrap_or(0);
            if page_len == 0 || ids.len() as u64 >= total {
                break;
            }
        }
        Ok(ids)
    }

    /// Delete a listing. The API confirms with a plain 200.
    pub async fn delete_item(&mut self, item_id: &str) -> Result<()> {
        let url = format!("{}/items/{}", self.base_url, item_id);
        let resp = self
            .send_authed(|client, token| client.delete(&url).bearer_auth(token))
            .await?;
        let status = resp.status();
        if status.as_u16() != 200 {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("delete of {} failed ({}): {}", item_id, status, body);
        }
        Ok(())
    }

    /// Send an authenticated request. On a 401 the token is refreshed and the
    /// request is rebuilt and resent once; a second 401 surfaces to the
    /// caller as a failed response.
    async fn send_authed<F>(&mut self, build: F) -> Result<reqwest::Response>
    where
        F: Fn(&Client, &str) -> reqwest::RequestBuilder,
    {
        let Some(auth) = self.auth.as_mut() else {
            anyhow::bail!("marketplace credentials not loaded (run the auth command first)");
        };
        let resp = build(&self.client, auth.access_token())
            .send()
            .await
            .context("marketplace request failed")?;
        if resp.status().as_u16() != 401 {
            return Ok(resp);
        }
        tracing::warn!("access token rejected (401), refreshing");
        auth.refresh()
            .await
            .context("token refresh after 401 failed")?;
        let resp = build(&self.client, auth.access_token())
            .send()
            .await
            .context("marketplace request retry failed")?;
        Ok(resp)
    }
}
