//! Client-facing response envelope.
//!
//! # Responsibilities
//! - One error variant per fault class the handler can hit
//! - Map each fault to its status code and JSON body
//! - Render the panic catch-all
//!
//! # Design Decisions
//! - Upstream non-2xx keeps the upstream status; transport failure is 502
//! - Upstream bodies are echoed raw under `details`

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

use crate::chat::{Outcome, RequestFault, ShapeFault};

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("Method Not Allowed")]
    MethodNotAllowed,

    #[error("Bad Request: Invalid JSON")]
    InvalidJson,

    #[error("Bad Request: Missing prompt")]
    MissingPrompt,

    #[error("Payload Too Large")]
    PayloadTooLarge(String),

    #[error("Server misconfigured: API key not configured")]
    MissingApiKey,

    #[error("Upstream API error")]
    Upstream { status: StatusCode, body: String },

    #[error("Upstream API error")]
    UpstreamUnreachable(String),

    #[error("Invalid response format from upstream API")]
    InvalidUpstreamResponse(ShapeFault),

    #[error("Internal Server Error")]
    Internal(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ProxyError::InvalidJson | ProxyError::MissingPrompt => StatusCode::BAD_REQUEST,
            ProxyError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Upstream { status, .. } => *status,
            ProxyError::UpstreamUnreachable(_) => StatusCode::BAD_GATEWAY,
            ProxyError::MissingApiKey
            | ProxyError::InvalidUpstreamResponse(_)
            | ProxyError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn details(&self) -> Option<String> {
        match self {
            ProxyError::Upstream { body, .. } => Some(body.clone()),
            ProxyError::UpstreamUnreachable(reason)
            | ProxyError::PayloadTooLarge(reason)
            | ProxyError::Internal(reason) => Some(reason.clone()),
            ProxyError::InvalidUpstreamResponse(fault) => Some(fault.to_string()),
            _ => None,
        }
    }

    /// Stable label used for metrics and diagnostics.
    pub fn code(&self) -> &'static str {
        match self {
            ProxyError::MethodNotAllowed => "method_not_allowed",
            ProxyError::InvalidJson => "invalid_json",
            ProxyError::MissingPrompt => "missing_prompt",
            ProxyError::PayloadTooLarge(_) => "payload_too_large",
            ProxyError::MissingApiKey => "api_key_missing",
            ProxyError::Upstream { .. } => "upstream_error",
            ProxyError::UpstreamUnreachable(_) => "upstream_unreachable",
            ProxyError::InvalidUpstreamResponse(_) => "invalid_upstream_response",
            ProxyError::Internal(_) => "internal",
        }
    }

    /// Faults on our side of the boundary or beyond it, as opposed to bad input.
    pub fn is_server_fault(&self) -> bool {
        !matches!(
            self,
            ProxyError::MethodNotAllowed
                | ProxyError::InvalidJson
                | ProxyError::MissingPrompt
                | ProxyError::PayloadTooLarge(_)
        )
    }
}

impl From<RequestFault> for ProxyError {
    fn from(fault: RequestFault) -> Self {
        match fault {
            RequestFault::MissingPrompt => ProxyError::MissingPrompt,
        }
    }
}

impl From<ProxyError> for Outcome {
    fn from(err: ProxyError) -> Self {
        Outcome::Failure {
            status: err.status().as_u16(),
            error: err.to_string(),
            details: err.details(),
        }
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.body())).into_response()
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        Outcome::from(self).into_response()
    }
}

/// Human-readable text of a panic payload.
pub fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "unknown panic".to_string()
    }
}

/// Response for a panic that escaped the handler's own catch-all.
pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let details = panic_message(panic.as_ref());
    tracing::error!(details = %details, "Handler panicked");
    ProxyError::Internal(details).into_response()
}
