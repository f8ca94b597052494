//! Capability registry: intent → provider handle + operation name.
//!
//! Built once at startup from the configured provider processes.

use crate::config::ProvidersConfig;
use crate::providers::{ProviderError, StdioProvider, ToolProvider};
use crate::router::Intent;
use std::sync::Arc;
use std::time::Duration;

struct Registered {
    provider: Arc<dyn ToolProvider>,
    operation: String,
}

/// Read-only mapping from intent to the provider serving it. Entries keep
/// registration order, which follows the config's server list.
pub struct ProviderRegistry {
    entries: Vec<(Intent, Registered)>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Register a provider for an intent. A later registration for the same
    /// intent replaces the earlier one.
    pub fn register(
        &mut self,
        intent: Intent,
        provider: Arc<dyn ToolProvider>,
        operation: impl Into<String>,
    ) {
        let entry = Registered {
            provider,
            operation: operation.into(),
        };
        if let Some(existing) = self.entries.iter_mut().find(|(i, _)| *i == intent) {
            existing.1 = entry;
        } else {
            self.entries.push((intent, entry));
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered provider names, in registration order.
    pub fn provider_names(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(_, r)| r.provider.name().to_string())
            .collect()
    }

    /// Invoke the provider registered for the intent.
    pub async fn invoke(
        &self,
        intent: Intent,
        args: serde_json::Value,
    ) -> Result<String, ProviderError> {
        let (_, entry) = self
            .entries
            .iter()
            .find(|(i, _)| *i == intent)
            .ok_or(ProviderError::NotRegistered(intent.label()))?;
        entry.provider.invoke(&entry.operation, args).await
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the configured provider processes and build the registry. A provider
/// that fails to start or discover is logged and skipped; startup continues
/// with whatever connected.
pub async fn connect_providers(config: &ProvidersConfig) -> ProviderRegistry {
    let timeout = Duration::from_secs(config.timeout_secs);
    let mut registry = ProviderRegistry::new();
    let total = config.servers.len();
    for server in &config.servers {
        let Some(intent) = Intent::from_config(&server.intent) else {
            log::warn!(
                "provider {}: unknown intent {:?}, skipping",
                server.name,
                server.intent
            );
            continue;
        };
        let provider = match StdioProvider::spawn(server, timeout).await {
            Ok(p) => p,
            Err(e) => {
                log::warn!("provider {} unavailable: {}", server.name, e);
                continue;
            }
        };
        let operation = match &server.operation {
            Some(op) => op.clone(),
            None => match provider.list_operations().await {
                Ok(ops) => match ops.into_iter().next() {
                    Some(op) => op.name,
                    None => {
                        log::warn!("provider {} exposes no operations, skipping", server.name);
                        continue;
                    }
                },
                Err(e) => {
                    log::warn!("provider {}: listing operations failed: {}", server.name, e);
                    continue;
                }
            },
        };
        log::info!(
            "provider {} connected ({} -> {})",
            server.name,
            intent.label(),
            operation
        );
        registry.register(intent, Arc::new(provider), operation);
    }
    log::info!("connected {}/{} tool providers", registry.len(), total);
    registry
}
