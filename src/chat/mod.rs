//! Chat domain: request/payload types, the payload builder and the upstream
//! response adapter.
//!
//! # Data Flow
//! ```text
//! JSON object
//!     → types.rs (ChatRequest::from_object, field validation)
//!     → payload.rs (PayloadBuilder::build → ChatPayload + dropped attachments)
//!     → [upstream call]
//!     → extract.rs (ResponseAdapter → assistant message | ShapeFault)
//! ```

pub mod extract;
pub mod payload;
pub mod types;

pub use extract::{ChatCompletionsAdapter, ResponseAdapter, ShapeFault};
pub use payload::{AttachmentKind, BuiltPayload, DropReason, DroppedAttachment, PayloadBuilder};
pub use types::{ChatMessage, ChatPayload, ChatRequest, ContentPart, Outcome, RequestFault};
