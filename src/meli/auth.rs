use super::types::TokenResponse;
use crate::config;
use anyhow::{Context, Result};
use reqwest::Client;
use std::path::PathBuf;

/// Access/refresh token pair for the marketplace account.
#[derive(Debug, Clone, Default)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Holds the OAuth credentials and swaps token pairs against the token
/// endpoint. Mercado Livre rotates refresh tokens on use, so every new pair
/// is written back to the env file immediately.
pub struct TokenManager {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    tokens: TokenPair,
    env_path: PathBuf,
}

impl TokenManager {
    pub fn new(
        api_base: &str,
        client_id: String,
        client_secret: String,
        tokens: TokenPair,
        env_path: PathBuf,
    ) -> Self {
        Self {
            client: Client::new(),
            token_url: format!("{}/oauth/token", api_base.trim_end_matches('/')),
            client_id,
            client_secret,
            tokens,
            env_path,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.tokens.access_token
    }

    /// Trade the refresh token for a fresh pair.
    pub async fn refresh(&mut self) -> Result<()> {
        let params = [
            ("grant_type", "refresh_token"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.tokens.refresh_token.as_str()),
        ];
        let token = self
            .request_token(&params)
            .await
            .context("token refresh failed")?;
        tracing::info!(expires_in = ?token.expires_in, "access token refreshed");
        self.apply(token);
        Ok(())
    }

    /// One-time exchange of an authorization code for the initial pair.
    pub async fn exchange_code(&mut self, code: &str, redirect_uri: &str) -> Result<()> {
        let params = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ];
        let token = self
            .request_token(&params)
            .await
            .context("authorization code exchange failed")?;
        tracing::info!(expires_in = ?token.expires_in, "token pair obtained");
        self.apply(token);
        Ok(())
    }

    async fn request_token(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let resp = self
            .client
            .post(&self.token_url)
            .form(params)
            .send()
            .await
            .context("token endpoint unreachable")?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("token endpoint returned {}: {}", status, body);
        }
        resp.json::<TokenResponse>()
            .await
            .context("failed to parse token response")
    }

    /// Adopt a new pair. When the endpoint omits the refresh token the old
    /// one stays valid and is kept.
    fn apply(&mut self, token: TokenResponse) {
        self.tokens.access_token = token.access_token;
        if let Some(refresh) = token.refresh_token {
            self.tokens.refresh_token = refresh;
        }
        if let Err(e) = config::update_env_tokens_at(
            &self.env_path,
            &self.tokens.access_token,
            &self.tokens.refresh_token,
        ) {
            tracing::warn!(
                error = %e,
                path = %self.env_path.display(),
                "could not persist tokens to env file"
            );
        }
    }
}
