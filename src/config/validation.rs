//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (body limit > 0, timeout > 0)
//! - Check that header values can actually be sent
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use axum::http::HeaderValue;
use thiserror::Error;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream.endpoint is not a valid http(s) URL: {0}")]
    InvalidEndpoint(String),

    #[error("upstream.model must not be empty")]
    EmptyModel,

    #[error("upstream.api_key_secret must not be empty")]
    EmptySecretName,

    #[error("upstream.timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("listener.path must start with '/': {0}")]
    InvalidPath(String),

    #[error("listener.path {0} is reserved")]
    ReservedPath(String),

    #[error("limits.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("{field} is not a valid header value")]
    InvalidHeaderValue { field: &'static str },
}

/// Check a parsed configuration for semantic errors.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    match url::Url::parse(&config.upstream.endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => {}
        _ => errors.push(ValidationError::InvalidEndpoint(
            config.upstream.endpoint.clone(),
        )),
    }

    if config.upstream.model.trim().is_empty() {
        errors.push(ValidationError::EmptyModel);
    }
    if config.upstream.api_key_secret.trim().is_empty() {
        errors.push(ValidationError::EmptySecretName);
    }
    if config.upstream.timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }
    if !config.listener.path.starts_with('/') {
        errors.push(ValidationError::InvalidPath(config.listener.path.clone()));
    } else if config.listener.path == "/health" {
        errors.push(ValidationError::ReservedPath(config.listener.path.clone()));
    }
    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let header_fields = [
        ("upstream.site_url", &config.upstream.site_url),
        ("upstream.app_name", &config.upstream.app_name),
        ("cors.allow_origin", &config.cors.allow_origin),
        ("cors.allow_headers", &config.cors.allow_headers),
        ("cors.allow_methods", &config.cors.allow_methods),
    ];
    for (field, value) in header_fields {
        if HeaderValue::from_str(value).is_err() {
            errors.push(ValidationError::InvalidHeaderValue { field });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
