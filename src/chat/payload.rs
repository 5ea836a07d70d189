//! Payload builder: inbound chat request → upstream chat payload.
//!
//! Pure transform, no I/O. Malformed attachments are dropped rather than
//! failing the request; the drops are returned alongside the payload so the
//! caller can report them.

use thiserror::Error;

use crate::chat::types::{ChatMessage, ChatPayload, ChatRequest, ContentPart};

pub const IMAGE_MIME: &str = "image/jpeg";
pub const AUDIO_MIME: &str = "audio/mp3";

/// Which attachment was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Audio,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::Audio => "audio",
        }
    }
}

/// Why an attachment failed the sanity check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DropReason {
    #[error("length {len} below minimum {min}")]
    TooShort { len: usize, min: usize },

    #[error("non-base64 character at offset {position}")]
    InvalidCharacter { position: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DroppedAttachment {
    pub kind: AttachmentKind,
    pub reason: DropReason,
}

/// Builder output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltPayload {
    pub payload: ChatPayload,
    pub dropped: Vec<DroppedAttachment>,
}

/// Maps chat requests to the upstream payload for a fixed model.
#[derive(Debug, Clone)]
pub struct PayloadBuilder {
    model: String,
    min_attachment_len: usize,
}

impl PayloadBuilder {
    pub fn new(model: impl Into<String>, min_attachment_len: usize) -> Self {
        Self {
            model: model.into(),
            min_attachment_len,
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the single-message payload. Text first, then image, then audio.
    pub fn build(&self, request: &ChatRequest) -> BuiltPayload {
        let mut content = vec![ContentPart::text(request.prompt.clone())];
        let mut dropped = Vec::new();

        let attachments = [
            (AttachmentKind::Image, request.image_base64.as_deref()),
            (AttachmentKind::Audio, request.audio_base64.as_deref()),
        ];

        for (kind, data) in attachments {
            let Some(data) = data else { continue };
            match check_base64(data, self.min_attachment_len) {
                Ok(()) => content.push(match kind {
                    AttachmentKind::Image => ContentPart::image(data_uri(IMAGE_MIME, data)),
                    AttachmentKind::Audio => ContentPart::audio(data_uri(AUDIO_MIME, data)),
                }),
                Err(reason) => dropped.push(DroppedAttachment { kind, reason }),
            }
        }

        BuiltPayload {
            payload: ChatPayload {
                model: self.model.clone(),
                messages: vec![ChatMessage {
                    role: "user".to_string(),
                    content,
                }],
            },
            dropped,
        }
    }
}

fn data_uri(mime: &str, data: &str) -> String {
    format!("data:{};base64,{}", mime, data)
}

/// Lightweight sanity check: minimum length and standard base64 alphabet.
/// Does not decode.
pub fn check_base64(data: &str, min_len: usize) -> Result<(), DropReason> {
    if data.len() < min_len {
        return Err(DropReason::TooShort {
            len: data.len(),
            min: min_len,
        });
    }
    match data
        .bytes()
        .position(|b| !(b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'='))
    {
        Some(position) => Err(DropReason::InvalidCharacter { position }),
        None => Ok(()),
    }
}
