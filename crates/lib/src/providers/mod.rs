//! Tool providers: external processes exposing named operations, invoked per
//! matched intent.
//!
//! Providers are spawned and discovered once at startup into a registry; a
//! provider that fails to start or discover is skipped and its intent answers
//! with a placeholder. No runtime reconfiguration; restart to pick up changes.

mod registry;
mod stdio;

pub use registry::{connect_providers, ProviderRegistry};
pub use stdio::StdioProvider;

use async_trait::async_trait;

/// One callable operation discovered from a provider.
#[derive(Debug, Clone)]
pub struct OperationInfo {
    pub name: String,
    pub description: Option<String>,
}

/// Handle to a tool provider: list operations and invoke one by name.
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Provider display name (e.g. "weather").
    fn name(&self) -> &str;

    /// List the operations the provider exposes.
    async fn list_operations(&self) -> Result<Vec<OperationInfo>, ProviderError>;

    /// Invoke one operation by name; returns the result text.
    async fn invoke(
        &self,
        operation: &str,
        args: serde_json::Value,
    ) -> Result<String, ProviderError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("provider call timed out")]
    Timeout,
    #[error("provider rpc error: {0}")]
    Rpc(String),
    #[error("malformed provider response: {0}")]
    Protocol(String),
    #[error("provider closed its output stream")]
    Closed,
    #[error("no provider registered for {0}")]
    NotRegistered(&'static str),
}
