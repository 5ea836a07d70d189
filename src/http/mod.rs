//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware stack)
//!     → cors.rs (outermost; stamps headers on every response)
//!     → request.rs (x-request-id generation and propagation)
//!     → handler.rs (preflight, validation, upstream call)
//!     → response.rs (status + JSON envelope, panic catch-all)
//!     → Send to client
//! ```

pub mod cors;
pub mod handler;
pub mod health;
pub mod request;
pub mod response;
pub mod server;

pub use request::X_REQUEST_ID;
pub use response::ProxyError;
pub use server::{AppState, HttpServer, ServerError};
