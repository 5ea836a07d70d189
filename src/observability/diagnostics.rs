//! Diagnostic side-channel.
//!
//! The handler reports through an injected [`DiagnosticSink`] instead of a
//! process-wide logger so tests can observe exactly what one request emitted.
//! Sink methods return nothing: a failing sink must not change a response.

use std::sync::Mutex;

pub trait DiagnosticSink: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Forwards to the global `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn debug(&self, message: &str) {
        tracing::debug!(target: "chat_proxy::diagnostics", "{}", message);
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "chat_proxy::diagnostics", "{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!(target: "chat_proxy::diagnostics", "{}", message);
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "chat_proxy::diagnostics", "{}", message);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Debug,
    Info,
    Warn,
    Error,
}

/// Records events in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(Severity, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(Severity, String)> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Messages recorded at `severity` that contain `needle`.
    pub fn matching(&self, severity: Severity, needle: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter(|(s, m)| *s == severity && m.contains(needle))
            .map(|(_, m)| m)
            .collect()
    }

    fn push(&self, severity: Severity, message: &str) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((severity, message.to_string()));
    }
}

impl DiagnosticSink for MemorySink {
    fn debug(&self, message: &str) {
        self.push(Severity::Debug, message);
    }

    fn info(&self, message: &str) {
        self.push(Severity::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(Severity::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(Severity::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_filters_by_severity() {
        let sink = MemorySink::new();
        sink.warn("dropped image attachment");
        sink.error("api key missing");
        sink.debug("dropped nothing");

        assert_eq!(sink.events().len(), 3);
        assert_eq!(
            sink.matching(Severity::Warn, "dropped"),
            vec!["dropped image attachment".to_string()]
        );
        assert!(sink.matching(Severity::Info, "").is_empty());
    }
}
