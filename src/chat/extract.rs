//! Upstream response adapters.
//!
//! The handler only needs "the assistant's message or a shape fault"; the
//! provider-specific path into the response body lives behind
//! [`ResponseAdapter`].

use serde_json::Value;
use thiserror::Error;

/// The upstream answered 2xx but broke its own response contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ShapeFault {
    #[error("response body is not valid JSON: {0}")]
    NotJson(String),

    #[error("response is missing {0}")]
    MissingField(&'static str),
}

pub trait ResponseAdapter: Send + Sync {
    fn extract_assistant_message(&self, raw: &[u8]) -> Result<String, ShapeFault>;
}

/// OpenAI-compatible `choices[0].message.content`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChatCompletionsAdapter;

impl ResponseAdapter for ChatCompletionsAdapter {
    fn extract_assistant_message(&self, raw: &[u8]) -> Result<String, ShapeFault> {
        let body: Value =
            serde_json::from_slice(raw).map_err(|e| ShapeFault::NotJson(e.to_string()))?;

        body.pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(ShapeFault::MissingField("choices[0].message.content"))
    }
}
