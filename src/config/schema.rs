//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the chat proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the chat proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, endpoint path).
    pub listener: ListenerConfig,

    /// Upstream LLM provider settings.
    pub upstream: UpstreamConfig,

    /// Attachment sanity-check settings.
    pub attachments: AttachmentConfig,

    /// Cross-origin headers stamped on every response.
    pub cors: CorsConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Path the chat endpoint is mounted on.
    pub path: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            path: "/chat".to_string(),
        }
    }
}

/// Upstream chat-completions provider.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Full URL of the chat-completions endpoint.
    pub endpoint: String,

    /// Model identifier sent with every request.
    pub model: String,

    /// Name of the secret holding the upstream API key.
    pub api_key_secret: String,

    /// Caller-site identifier sent as `HTTP-Referer`.
    pub site_url: String,

    /// Application name sent as `X-Title`.
    pub app_name: String,

    /// Optional upstream call timeout. `None` keeps the transport default.
    pub timeout_secs: Option<u64>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://openrouter.ai/api/v1/chat/completions".to_string(),
            model: "google/gemini-2.0-flash-001".to_string(),
            api_key_secret: "OPENROUTER_API_KEY".to_string(),
            site_url: "http://localhost".to_string(),
            app_name: "Chat Proxy".to_string(),
            timeout_secs: None,
        }
    }
}

/// Attachment sanity-check configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AttachmentConfig {
    /// Minimum length of a base64 attachment before it is embedded.
    pub min_base64_len: usize,
}

impl Default for AttachmentConfig {
    fn default() -> Self {
        Self { min_base64_len: 100 }
    }
}

/// Cross-origin header values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allow_origin: String,
    pub allow_headers: String,
    pub allow_methods: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allow_origin: "*".to_string(),
            allow_headers: "authorization, x-client-info, apikey, content-type".to_string(),
            allow_methods: "POST, OPTIONS".to_string(),
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 20 * 1024 * 1024, // base64 media is large
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
