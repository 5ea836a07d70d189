//! Fixed cross-origin headers.
//!
//! Applied by the outermost middleware so that every response carries them,
//! including panics caught below and unmatched routes.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{
            InvalidHeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN,
        },
        HeaderMap, HeaderValue, Request,
    },
    middleware::Next,
    response::Response,
};

use crate::config::CorsConfig;

#[derive(Debug, Clone)]
pub struct CorsHeaders {
    headers: HeaderMap,
}

impl CorsHeaders {
    pub fn from_config(config: &CorsConfig) -> Result<Self, InvalidHeaderValue> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_str(&config.allow_origin)?,
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_str(&config.allow_headers)?,
        );
        headers.insert(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_str(&config.allow_methods)?,
        );
        Ok(Self { headers })
    }

    /// Overwrite the cross-origin headers on `target`.
    pub fn apply(&self, target: &mut HeaderMap) {
        for (name, value) in self.headers.iter() {
            target.insert(name.clone(), value.clone());
        }
    }
}

pub async fn cors_middleware(
    State(cors): State<Arc<CorsHeaders>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    cors.apply(response.headers_mut());
    response
}
