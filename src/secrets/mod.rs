//! Secret lookup.
//!
//! The upstream API key lives in an external store that may not have it.
//! Absence is a deployment fault and is reported by the handler, not here.

use std::collections::HashMap;

use async_trait::async_trait;

#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Fetch a secret by name. Blank values are reported as absent.
    async fn get(&self, name: &str) -> Option<String>;
}

/// Reads secrets from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvSecretStore;

#[async_trait]
impl SecretStore for EnvSecretStore {
    async fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

/// Fixed in-memory secrets.
#[derive(Debug, Clone, Default)]
pub struct StaticSecretStore {
    secrets: HashMap<String, String>,
}

impl StaticSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.secrets.insert(name.into(), value.into());
        self
    }
}

#[async_trait]
impl SecretStore for StaticSecretStore {
    async fn get(&self, name: &str) -> Option<String> {
        self.secrets
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}
