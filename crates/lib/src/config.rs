//! Configuration types and loading.
//!
//! Config is loaded from a JSON file (e.g. `~/.courier/config.json`) and environment.
//! Secrets (Twilio credentials, Gemini API key) can be set in the file or overridden
//! by environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Top-level application config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Gateway server settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Carrier settings (Twilio WhatsApp).
    #[serde(default)]
    pub carrier: CarrierConfig,

    /// Fallback language-model settings (Gemini).
    #[serde(default)]
    pub llm: LlmConfig,

    /// Tool-provider processes and invocation timeout.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// Gateway bind and port settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// HTTP port for the webhook server (default 5000).
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Bind address (default "127.0.0.1"). Set to 0.0.0.0 or front with a tunnel so
    /// the carrier can reach the webhook.
    #[serde(default = "default_gateway_bind")]
    pub bind: String,
}

fn default_gateway_port() -> u16 {
    5000
}

fn default_gateway_bind() -> String {
    "127.0.0.1".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_gateway_port(),
            bind: default_gateway_bind(),
        }
    }
}

/// Twilio WhatsApp carrier config.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CarrierConfig {
    /// Twilio account SID. Overridden by TWILIO_ACCOUNT_SID env when set.
    pub account_sid: Option<String>,
    /// Twilio auth token. Overridden by TWILIO_AUTH_TOKEN env when set.
    pub auth_token: Option<String>,
    /// Sending WhatsApp number (e.g. "whatsapp:+14155238886"). Overridden by
    /// TWILIO_WHATSAPP_NUMBER env when set.
    pub whatsapp_number: Option<String>,
    /// Override for the Twilio API base URL (tests or regional endpoints).
    pub api_base: Option<String>,
    /// Maximum reply length in characters (WhatsApp limit, default 1600).
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
}

fn default_max_message_chars() -> usize {
    1600
}

impl Default for CarrierConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            whatsapp_number: None,
            api_base: None,
            max_message_chars: default_max_message_chars(),
        }
    }
}

/// Gemini fallback model config.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LlmConfig {
    /// Gemini API key. Overridden by GEMINI_API_KEY (or GOOGLE_API_KEY) env when set.
    pub api_key: Option<String>,
    /// Model name (default "gemini-2.5-flash").
    pub model: Option<String>,
    /// Override for the Generative Language API base URL.
    pub api_base: Option<String>,
}

/// Tool-provider list and shared invocation timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProvidersConfig {
    /// Timeout for a single provider call in seconds (default 30). Exceeding it is a
    /// provider failure for that intent, never fatal for the request.
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,

    /// Tool-provider processes to spawn at startup.
    #[serde(default)]
    pub servers: Vec<ProviderServerConfig>,
}

fn default_provider_timeout_secs() -> u64 {
    30
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_provider_timeout_secs(),
            servers: Vec::new(),
        }
    }
}

/// One tool-provider process: launch command plus the intent it serves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderServerConfig {
    /// Display name (e.g. "weather").
    pub name: String,
    /// Executable to spawn.
    pub command: String,
    /// Arguments for the executable.
    #[serde(default)]
    pub args: Vec<String>,
    /// Extra environment variables for the process (e.g. provider API keys).
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Intent this provider serves: "weather", "task", "financial", or "messaging".
    pub intent: String,
    /// Operation to invoke per routed message. When unset, the first operation
    /// discovered from the provider is used.
    pub operation: Option<String>,
}

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().and_then(|s| {
        let t = s.trim();
        if t.is_empty() {
            None
        } else {
            Some(t.to_string())
        }
    })
}

fn config_nonempty(value: Option<&String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Resolve the Twilio account SID: env TWILIO_ACCOUNT_SID overrides config.
pub fn resolve_twilio_account_sid(config: &Config) -> Option<String> {
    env_nonempty("TWILIO_ACCOUNT_SID")
        .or_else(|| config_nonempty(config.carrier.account_sid.as_ref()))
}

/// Resolve the Twilio auth token: env TWILIO_AUTH_TOKEN overrides config.
pub fn resolve_twilio_auth_token(config: &Config) -> Option<String> {
    env_nonempty("TWILIO_AUTH_TOKEN")
        .or_else(|| config_nonempty(config.carrier.auth_token.as_ref()))
}

/// Resolve the sending WhatsApp number: env TWILIO_WHATSAPP_NUMBER overrides config.
pub fn resolve_whatsapp_number(config: &Config) -> Option<String> {
    env_nonempty("TWILIO_WHATSAPP_NUMBER")
        .or_else(|| config_nonempty(config.carrier.whatsapp_number.as_ref()))
}

/// Resolve the Gemini API key: env GEMINI_API_KEY (then GOOGLE_API_KEY) overrides config.
pub fn resolve_gemini_api_key(config: &Config) -> Option<String> {
    env_nonempty("GEMINI_API_KEY")
        .or_else(|| env_nonempty("GOOGLE_API_KEY"))
        .or_else(|| config_nonempty(config.llm.api_key.as_ref()))
}

/// Resolve config path from env or default.
pub fn default_config_path() -> PathBuf {
    std::env::var("COURIER_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::home_dir()
                .map(|h| h.join(".courier").join("config.json"))
                .unwrap_or_else(|| PathBuf::from("config.json"))
        })
}

/// Load config from the default path (or COURIER_CONFIG_PATH). Missing file => default config.
/// Returns the config and the path that was used.
pub fn load_config(path: Option<PathBuf>) -> Result<(Config, PathBuf)> {
    let path = path.unwrap_or_else(default_config_path);
    let config = if !path.exists() {
        log::debug!("config file not found, using defaults: {}", path.display());
        Config::default()
    } else {
        let s = std::fs::read_to_string(&path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&s)
            .with_context(|| format!("parsing config from {}", path.display()))?
    };
    Ok((config, path))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_gateway_port_and_bind() {
        let g = GatewayConfig::default();
        assert_eq!(g.port, 5000);
        assert_eq!(g.bind, "127.0.0.1");
    }

    #[test]
    fn default_carrier_limit_and_provider_timeout() {
        let c = Config::default();
        assert_eq!(c.carrier.max_message_chars, 1600);
        assert_eq!(c.providers.timeout_secs, 30);
        assert!(c.providers.servers.is_empty());
    }

    #[test]
    fn parse_provider_servers() {
        let json = r#"{
            "providers": {
                "timeoutSecs": 10,
                "servers": [
                    {
                        "name": "weather",
                        "command": "uv",
                        "args": ["run", "weather.py"],
                        "env": {"OPENWEATHER_API_KEY": "k"},
                        "intent": "weather",
                        "operation": "get_forecast"
                    }
                ]
            }
        }"#;
        let config: Config = serde_json::from_str(json).expect("parse config");
        assert_eq!(config.providers.timeout_secs, 10);
        let server = &config.providers.servers[0];
        assert_eq!(server.name, "weather");
        assert_eq!(server.intent, "weather");
        assert_eq!(server.operation.as_deref(), Some("get_forecast"));
        assert_eq!(
            server.env.get("OPENWEATHER_API_KEY").map(String::as_str),
            Some("k")
        );
    }

    #[test]
    fn resolver_trims_config_values() {
        let mut config = Config::default();
        config.carrier.account_sid = Some("  AC123  ".to_string());
        config.carrier.auth_token = Some("   ".to_string());
        assert_eq!(resolve_twilio_account_sid(&config).as_deref(), Some("AC123"));
        assert_eq!(resolve_twilio_auth_token(&config), None);
    }
}
