//! HTTP client for the upstream chat-completions endpoint.

use std::time::Duration;

use async_trait::async_trait;
use axum::http::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use thiserror::Error;

use crate::chat::ChatPayload;
use crate::config::UpstreamConfig;

/// Attribution headers the provider uses to identify the calling site.
pub const REFERER_HEADER: &str = "HTTP-Referer";
pub const TITLE_HEADER: &str = "X-Title";

/// Raw upstream answer.
#[derive(Debug, Clone)]
pub struct UpstreamReply {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl UpstreamReply {
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

#[derive(Debug, Error)]
pub enum UpstreamError {
    /// Connect, TLS, timeout or body read failure.
    #[error("upstream transport error: {0}")]
    Transport(String),

    #[error("failed to build upstream client: {0}")]
    Build(String),
}

#[async_trait]
pub trait ChatUpstream: Send + Sync {
    async fn send(&self, api_key: &str, payload: &ChatPayload)
        -> Result<UpstreamReply, UpstreamError>;
}

/// reqwest-backed upstream.
#[derive(Debug, Clone)]
pub struct HttpUpstream {
    client: reqwest::Client,
    endpoint: String,
    site_url: String,
    app_name: String,
}

impl HttpUpstream {
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| UpstreamError::Build(e.to_string()))?;

        Ok(Self::with_client(config, client))
    }

    /// Use a pre-built client; `timeout_secs` is then the client's concern.
    pub fn with_client(config: &UpstreamConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            endpoint: config.endpoint.clone(),
            site_url: config.site_url.clone(),
            app_name: config.app_name.clone(),
        }
    }
}

#[async_trait]
impl ChatUpstream for HttpUpstream {
    async fn send(
        &self,
        api_key: &str,
        payload: &ChatPayload,
    ) -> Result<UpstreamReply, UpstreamError> {
        tracing::debug!(endpoint = %self.endpoint, model = %payload.model, "Calling upstream");

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", api_key))
            .header(CONTENT_TYPE, "application/json")
            .header(REFERER_HEADER, &self.site_url)
            .header(TITLE_HEADER, &self.app_name)
            .json(payload)
            .send()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| UpstreamError::Transport(e.to_string()))?;

        Ok(UpstreamReply {
            status,
            body: body.to_vec(),
        })
    }
}
