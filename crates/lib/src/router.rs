//! Intent routing: classify message text against the keyword table and dispatch
//! each matched intent to its tool provider, falling back to the language model
//! when nothing matches.
//!
//! The keyword table is a static ordered list so the match order (and therefore
//! the composition order of the reply) is explicit and testable.

use crate::llm::FallbackModel;
use crate::providers::ProviderRegistry;
use std::sync::Arc;

/// Classification label for an inbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Intent {
    Weather,
    Task,
    Financial,
    Messaging,
    /// Fallback path: no keyword matched, route the raw text to the language model.
    General,
}

impl Intent {
    /// Human-readable section label used by the composer.
    pub fn label(&self) -> &'static str {
        match self {
            Intent::Weather => "Weather",
            Intent::Task => "Task",
            Intent::Financial => "Financial",
            Intent::Messaging => "Messaging",
            Intent::General => "General",
        }
    }

    /// Parse a config intent string ("weather", "task", "financial", "messaging").
    /// General is not configurable; it is the implicit fallback.
    pub fn from_config(s: &str) -> Option<Intent> {
        match s.trim().to_lowercase().as_str() {
            "weather" => Some(Intent::Weather),
            "task" => Some(Intent::Task),
            "financial" => Some(Intent::Financial),
            "messaging" => Some(Intent::Messaging),
            _ => None,
        }
    }
}

/// Ordered keyword table. Declaration order is the dispatch and composition order.
pub const KEYWORD_TABLE: &[(Intent, &[&str])] = &[
    (
        Intent::Weather,
        &[
            "weather", "forecast", "temperature", "climate", "rain", "sunny", "cloudy",
            "storm", "wind", "celsius", "fahrenheit",
        ],
    ),
    (
        Intent::Task,
        &[
            "task", "todo", "remind", "schedule", "deadline", "project", "organize",
            "priority",
        ],
    ),
    (
        Intent::Financial,
        &[
            "stock", "share price", "market cap", "ticker", "earnings", "dividend",
            "crypto",
        ],
    ),
    (
        Intent::Messaging,
        &["send a message", "whatsapp", "notify", "forward to"],
    ),
];

/// Case-insensitive substring match against the keyword table. Returns every
/// matched intent, in table order; empty when nothing matches.
pub fn match_intents(text: &str) -> Vec<Intent> {
    let lower = text.to_lowercase();
    KEYWORD_TABLE
        .iter()
        .filter(|(_, keywords)| keywords.iter().any(|k| lower.contains(k)))
        .map(|(intent, _)| *intent)
        .collect()
}

/// One labeled result for the composer: the intent plus its provider output or
/// placeholder text.
#[derive(Debug, Clone)]
pub struct RoutedSection {
    pub intent: Intent,
    pub text: String,
}

/// Routing outcome for one message.
#[derive(Debug, Clone)]
pub enum RouterOutput {
    /// One section per matched intent, in keyword-table order.
    Sections(Vec<RoutedSection>),
    /// No intent matched; the fallback model's reply.
    Fallback(String),
}

/// Reply used when the fallback model itself fails. All failures below the
/// webhook boundary degrade to text rather than propagate.
const FALLBACK_ERROR_REPLY: &str =
    "sorry, I could not process your request right now. please try again.";

/// Dispatches matched intents to providers and composes nothing itself; holds
/// only read-only handles, so one instance serves all messages.
pub struct Router {
    registry: Arc<ProviderRegistry>,
    fallback: Arc<dyn FallbackModel>,
}

impl Router {
    pub fn new(registry: Arc<ProviderRegistry>, fallback: Arc<dyn FallbackModel>) -> Self {
        Self { registry, fallback }
    }

    /// Route one message: invoke the provider for each matched intent sequentially,
    /// replacing failures with a placeholder so one bad provider never hides the
    /// others' results. With no match, ask the fallback model.
    pub async fn route(&self, text: &str) -> RouterOutput {
        let intents = match_intents(text);
        if intents.is_empty() {
            log::info!("no intent matched, using fallback model");
            let reply = match self.fallback.generate(text).await {
                Ok(t) => t,
                Err(e) => {
                    log::warn!("fallback model failed: {}", e);
                    FALLBACK_ERROR_REPLY.to_string()
                }
            };
            return RouterOutput::Fallback(reply);
        }

        log::info!(
            "matched intents: {:?}",
            intents.iter().map(Intent::label).collect::<Vec<_>>()
        );
        let mut sections = Vec::with_capacity(intents.len());
        for intent in intents {
            let args = serde_json::json!({ "query": text });
            let section_text = match self.registry.invoke(intent, args).await {
                Ok(out) => out,
                Err(e) => {
                    log::warn!("{} provider failed: {}", intent.label(), e);
                    format!("{} unavailable", intent.label().to_lowercase())
                }
            };
            sections.push(RoutedSection {
                intent,
                text: section_text,
            });
        }
        RouterOutput::Sections(sections)
    }
}
