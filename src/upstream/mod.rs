//! Upstream LLM provider access.
//!
//! # Responsibilities
//! - Issue exactly one chat-completions call per request
//! - Attach the bearer credential and attribution headers
//! - Hand back the raw status and body; interpretation is the handler's job
//!
//! # Design Decisions
//! - No retry and no fallback model
//! - No timeout unless one is configured

pub mod client;

pub use client::{ChatUpstream, HttpUpstream, UpstreamError, UpstreamReply};
