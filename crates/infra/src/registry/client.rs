//! Outbound registry gateway.
//!
//! Executes one typed request per call: bearer auth from the run's token,
//! a callback URL unique to (request type, application) in the
//! `X-CallbackURL` header, one HTTP call under the fixed timeout. Every
//! failure mode surfaces as a typed [`DispatchError`] so the batch driver
//! treats all per-item failures identically.

use std::sync::Arc;

use async_trait::async_trait;
use casebridge_core::{
    DispatchError, DispatchReceipt, HttpMethod, OutboundRequest, PayloadBuilder, RegistryGateway,
};
use casebridge_domain::{RegistryConfig, RegistryToken, Result};
use reqwest::{header, Method};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;
use uuid::Uuid;

use crate::http::HttpClient;

/// Header carrying the callback URL the registry posts results to.
const CALLBACK_URL_HEADER: &str = "X-CallbackURL";

/// HTTP client against the case registry.
pub struct RegistryClient {
    http: HttpClient,
    base_url: String,
    callback_base_url: String,
    payloads: Arc<dyn PayloadBuilder>,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig, payloads: Arc<dyn PayloadBuilder>) -> Result<Self> {
        let http =
            HttpClient::builder().timeout(Duration::from_secs(config.timeout_seconds)).build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            callback_base_url: config.callback_base_url.trim_end_matches('/').to_string(),
            payloads,
        })
    }

    /// Callback URL unique to (request type, application id), registered
    /// with the registry at dispatch time.
    fn callback_url(&self, request: &OutboundRequest) -> String {
        format!(
            "{}/cases/{}/callback/{}",
            self.callback_base_url,
            request.application().id,
            request.request_type().as_str()
        )
    }
}

#[async_trait]
impl RegistryGateway for RegistryClient {
    async fn send(
        &self,
        request: &OutboundRequest,
        token: &RegistryToken,
    ) -> std::result::Result<DispatchReceipt, DispatchError> {
        request.check_preconditions()?;
        let url = request.build_url(&self.base_url)?;

        let method = match request.http_method() {
            HttpMethod::Post => Method::POST,
            HttpMethod::Put => Method::PUT,
            HttpMethod::Delete => Method::DELETE,
        };

        let mut builder = self
            .http
            .request(method, &url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token.access_token))
            .header(CALLBACK_URL_HEADER, self.callback_url(request));

        if request.http_method() != HttpMethod::Delete {
            let payload = self
                .payloads
                .build(request)
                .await
                .map_err(|err| DispatchError::Transport(format!("payload assembly: {err}")))?;
            builder = builder.json(&payload);
        }

        let response = self
            .http
            .send(builder)
            .await
            .map_err(|err| DispatchError::Transport(err.to_string()))?;

        let status = response.status();
        let body =
            response.text().await.map_err(|err| DispatchError::Transport(err.to_string()))?;

        if !status.is_success() {
            return Err(DispatchError::Http { status: status.as_u16(), body });
        }

        // The registry echoes a correlation id in the body; fall back to a
        // generated one when the body is empty.
        let correlation_id = if body.trim().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            body.trim().to_string()
        };

        debug!(
            status = status.as_u16(),
            request_type = request.request_type().as_str(),
            correlation_id = %correlation_id,
            "registry accepted request"
        );
        Ok(DispatchReceipt { correlation_id })
    }

    async fn fetch_decisions(
        &self,
        case_id: &str,
        token: &RegistryToken,
    ) -> std::result::Result<Vec<Value>, DispatchError> {
        let url = format!("{}/decisions/{case_id}", self.base_url);
        let builder = self
            .http
            .request(Method::GET, &url)
            .header(header::AUTHORIZATION, format!("Bearer {}", token.access_token));

        let response = self
            .http
            .send(builder)
            .await
            .map_err(|err| DispatchError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Http { status: status.as_u16(), body });
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|err| DispatchError::Transport(format!("invalid decision payload: {err}")))?;

        // The decisions endpoint returns a list; tolerate a bare object.
        match parsed {
            Value::Array(items) => Ok(items),
            other => Ok(vec![other]),
        }
    }
}
