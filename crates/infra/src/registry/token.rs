//! Registry OAuth2 token manager.
//!
//! Owns the token lifecycle against the registry's token endpoint:
//! initial provisioning via authorization code, refresh via the stored
//! refresh token, and expiry-checked access for batch runs. The stored
//! row is replaced wholesale through the single-slot [`TokenStore`];
//! `created_at` is stamped at local persistence time because the token
//! response carries no issuance claim.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use casebridge_core::{TokenError, TokenProvider, TokenStore};
use casebridge_domain::{BridgeError, RegistryConfig, RegistryToken, Result};
use chrono::Utc;
use reqwest::Method;
use serde::Deserialize;
use tracing::info;

use crate::http::HttpClient;

/// Token response from the registry's OAuth2 endpoint (RFC 6749).
#[derive(Debug, Deserialize)]
struct TokenEndpointResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
}

/// Manages the single active registry token.
pub struct TokenManager {
    store: Arc<dyn TokenStore>,
    http: HttpClient,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenManager")
            .field("token_url", &self.token_url)
            .field("client_id", &self.client_id)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a manager from the registry configuration.
    ///
    /// # Errors
    /// Fails with a configuration error when client credentials are
    /// missing, before any network call is attempted.
    pub fn new(store: Arc<dyn TokenStore>, config: &RegistryConfig) -> Result<Self> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(BridgeError::Config(
                "registry client credentials are not configured".to_string(),
            ));
        }

        let http =
            HttpClient::builder().timeout(Duration::from_secs(config.timeout_seconds)).build()?;

        Ok(Self {
            store,
            http,
            token_url: config.token_url.clone(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    /// Exchange an authorization code for the initial token pair and
    /// persist it. Used once when provisioning the integration.
    pub async fn obtain(
        &self,
        authorization_code: &str,
        redirect_uri: &str,
    ) -> std::result::Result<RegistryToken, TokenError> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", authorization_code),
            ("redirect_uri", redirect_uri),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let token = self.request_grant(&params).await?;
        info!(expires_in = token.expires_in, "registry token obtained");
        Ok(token)
    }

    /// POST one grant request and atomically replace the stored token.
    async fn request_grant(
        &self,
        params: &[(&str, &str)],
    ) -> std::result::Result<RegistryToken, TokenError> {
        let builder = self.http.request(Method::POST, &self.token_url).form(params);
        let response = self
            .http
            .send(builder)
            .await
            .map_err(|err| TokenError::Endpoint(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TokenError::Retrieval { status: status.as_u16(), body });
        }

        let parsed: TokenEndpointResponse = response
            .json()
            .await
            .map_err(|err| TokenError::Endpoint(format!("invalid token response: {err}")))?;

        // created_at is local persistence time, not an issuer claim.
        let token = RegistryToken::new(
            parsed.access_token,
            parsed.refresh_token,
            parsed.expires_in,
            Utc::now(),
        );
        self.store.put(&token).await?;
        Ok(token)
    }
}

#[async_trait]
impl TokenProvider for TokenManager {
    async fn get_current(&self) -> std::result::Result<RegistryToken, TokenError> {
        let token = self.store.get().await?.ok_or(TokenError::NotConfigured)?;
        if token.has_expired(Utc::now()) {
            return Err(TokenError::Expired);
        }
        Ok(token)
    }

    async fn refresh(&self) -> std::result::Result<RegistryToken, TokenError> {
        let current = self.store.get().await?.ok_or(TokenError::NotConfigured)?;

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", current.refresh_token.as_str()),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
        ];
        let token = self.request_grant(&params).await?;
        info!(expires_in = token.expires_in, "registry token refreshed");
        Ok(token)
    }
}
