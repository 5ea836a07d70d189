//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Proxy handler produces:
//!     → diagnostics.rs (injected sink, per-request events)
//!     → metrics.rs (counters, histograms)
//! HTTP layer produces:
//!     → tower-http TraceLayer spans, tagged with x-request-id
//!
//! Consumers:
//!     → logging.rs subscriber (stdout)
//!     → Metrics endpoint (Prometheus scrape), optional
//! ```

pub mod diagnostics;
pub mod logging;
pub mod metrics;

pub use diagnostics::{DiagnosticSink, MemorySink, Severity, TracingSink};
