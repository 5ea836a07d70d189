//! Wire types for the inbound request and the upstream payload.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inbound chat request, one per HTTP call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_base64: Option<String>,
}

/// Why an inbound object was rejected before payload construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestFault {
    MissingPrompt,
}

impl ChatRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image_base64: None,
            audio_base64: None,
        }
    }

    /// Validate a decoded JSON object.
    ///
    /// `prompt` must be a non-empty string. Attachment fields that are not
    /// strings are treated as absent so they fall through to the silent-drop
    /// path instead of failing the text turn.
    pub fn from_object(object: &Map<String, Value>) -> Result<Self, RequestFault> {
        let prompt = match object.get("prompt") {
            Some(Value::String(p)) if !p.is_empty() => p.clone(),
            _ => return Err(RequestFault::MissingPrompt),
        };

        let attachment = |key: &str| object.get(key).and_then(Value::as_str).map(str::to_owned);

        Ok(Self {
            prompt,
            image_base64: attachment("imageBase64"),
            audio_base64: attachment("audioBase64"),
        })
    }
}

/// Data URI holder used by the image and audio parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaUrl {
    pub url: String,
}

/// One unit of a multimodal message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    Image { image_url: MediaUrl },
    #[serde(rename = "audio_url")]
    Audio { audio_url: MediaUrl },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        ContentPart::Text { text: text.into() }
    }

    pub fn image(url: String) -> Self {
        ContentPart::Image {
            image_url: MediaUrl { url },
        }
    }

    pub fn audio(url: String) -> Self {
        ContentPart::Audio {
            audio_url: MediaUrl { url },
        }
    }

    /// The data URI for media parts, `None` for text.
    pub fn media_url(&self) -> Option<&str> {
        match self {
            ContentPart::Text { .. } => None,
            ContentPart::Image { image_url } => Some(&image_url.url),
            ContentPart::Audio { audio_url } => Some(&audio_url.url),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

/// Request body sent to the upstream chat-completions endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatPayload {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

/// Final result of one proxied exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success {
        message: String,
    },
    Failure {
        status: u16,
        error: String,
        details: Option<String>,
    },
}

impl Outcome {
    pub fn status(&self) -> u16 {
        match self {
            Outcome::Success { .. } => 200,
            Outcome::Failure { status, .. } => *status,
        }
    }

    /// JSON body returned to the caller.
    pub fn body(&self) -> Value {
        match self {
            Outcome::Success { message } => serde_json::json!({ "message": message }),
            Outcome::Failure { error, details, .. } => {
                let mut body = Map::new();
                body.insert("error".into(), Value::String(error.clone()));
                if let Some(details) = details {
                    body.insert("details".into(), Value::String(details.clone()));
                }
                Value::Object(body)
            }
        }
    }
}
