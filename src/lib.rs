//! Multimodal chat proxy library.
//!
//! Accepts a chat request (text plus optional base64 image/audio), builds a
//! multimodal chat-completions payload, forwards it to an upstream LLM API
//! and normalises the answer and every failure into a JSON envelope.

// Core
pub mod chat;
pub mod config;
pub mod http;

// Collaborators
pub mod secrets;
pub mod upstream;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
