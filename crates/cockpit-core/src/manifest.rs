//! Domain Manifest: static table of intents, persona text, and topic → source mappings.
//!
//! Pure data, no behavior beyond lookup. The manifest is loaded once at startup and
//! shared read-only (`Arc<DomainManifest>`). `intent_guidance` feeds the system prompt
//! sent to the Model Gateway; `resolve_source` backs source attribution on every reply.
//! Repurpose the service for another industry by swapping this table.

use serde::{Deserialize, Serialize};

/// One configured intent: a named category of user goal used to select a UI template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntentSpec {
    /// Unique identifier; the Surface Factory keys templates on this name.
    pub name: String,
    /// Human-readable classification hint, rendered into the system prompt.
    pub description: String,
    /// Prompt-guidance / documentation only; not used for programmatic matching.
    pub keywords: Vec<String>,
}

/// One entry in the ordered topic table. Lowercase `key` is matched by substring
/// containment against the lookup topic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub key: String,
    pub title: String,
    pub url: String,
}

/// Attribution resolved for a reply: where the answer's knowledge came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceAttribution {
    pub title: String,
    pub url: String,
    pub provider: String,
}

/// Static domain configuration: intents, persona, and source attribution table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainManifest {
    pub industry: String,
    /// Display name; doubles as the attribution `provider`.
    pub name: String,
    /// Persona block placed at the top of every system prompt.
    pub persona: String,
    /// Ordered: the first substring match wins in `resolve_source`.
    pub sources: Vec<SourceEntry>,
    pub intents: Vec<IntentSpec>,
}

impl DomainManifest {
    /// The default general-purpose manifest.
    pub fn universal() -> Self {
        Self {
            industry: "Universal Agent Tech".to_string(),
            name: "General Purpose Intelligence".to_string(),
            persona: "You are an A2UI Orchestration Agent. You are professional, concise, \
                      and data-driven. You never use filler phrases. You specialize in \
                      detecting user intent and returning structured knowledge."
                .to_string(),
            sources: vec![
                SourceEntry {
                    key: "tech".to_string(),
                    title: "Technology Roadmap".to_string(),
                    url: "https://example.com/tech".to_string(),
                },
                SourceEntry {
                    key: "news".to_string(),
                    title: "Market Updates".to_string(),
                    url: "https://example.com/news".to_string(),
                },
                SourceEntry {
                    key: "default".to_string(),
                    title: "Knowledge Base".to_string(),
                    url: "https://example.com/docs".to_string(),
                },
            ],
            intents: vec![
                intent("vision", "User wants to see high-level strategy, roadmaps, or future goals.", &["roadmap", "future", "strategy", "vision"]),
                intent("analytics", "User asks for data, metrics, stats, or performance charts.", &["stats", "metrics", "performance", "growth", "numbers"]),
                intent("directory", "User wants to see a list of items, team members, or project catalog.", &["list", "team", "projects", "catalog"]),
                intent("workflow", "User asks about steps, processes, or how things move from A to B.", &["steps", "process", "workflow", "journey"]),
                intent("quiz", "User wants an interactive knowledge check or quiz.", &["quiz", "test", "check knowledge"]),
                intent("weather", "User asks about the weather, temperature, or conditions.", &["weather", "temperature", "cloudy", "sunny"]),
                intent("stock", "User asks for stock market data, market price, or GOOGL info.", &["stock", "price", "market", "GOOGL"]),
                intent("time", "User asks for the current time, date, or clock status.", &["time", "date", "clock", "today"]),
            ],
        }
    }

    /// Prompt fragment enumerating every configured intent name and description,
    /// plus the always-present `greeting` and `general` pseudo-intents.
    /// Used verbatim inside the system prompt sent to the Model Gateway.
    pub fn intent_guidance(&self) -> String {
        let mut guidance = String::from(
            "## INTENT CLASSIFICATION\nAnalyze the request to determine one of these intents:\n",
        );
        for intent in &self.intents {
            guidance.push_str(&format!("- {}: {}\n", intent.name, intent.description));
        }
        guidance.push_str("- greeting: hello, hi, etc.\n");
        guidance.push_str("- general: everything else.\n");
        guidance
    }

    /// Case-insensitive substring match over the topic table, iterated in insertion
    /// order; the first matching key wins. Falls back to the `default` entry.
    /// Total: always returns a value, no side effects.
    pub fn resolve_source(&self, topic: &str) -> SourceAttribution {
        let topic_lower = topic.to_lowercase();
        let entry = self
            .sources
            .iter()
            .find(|s| topic_lower.contains(s.key.as_str()))
            .or_else(|| self.sources.iter().find(|s| s.key == "default"))
            .or_else(|| self.sources.first());
        match entry {
            Some(s) => SourceAttribution {
                title: s.title.clone(),
                url: s.url.clone(),
                provider: self.name.clone(),
            },
            // Empty source table: still attribute to the manifest itself.
            None => SourceAttribution {
                title: self.name.clone(),
                url: String::new(),
                provider: self.name.clone(),
            },
        }
    }

    /// True when `name` is one of the configured intents (pseudo-intents excluded).
    pub fn known_intent(&self, name: &str) -> bool {
        self.intents.iter().any(|i| i.name == name)
    }
}

fn intent(name: &str, description: &str, keywords: &[&str]) -> IntentSpec {
    IntentSpec {
        name: name.to_string(),
        description: description.to_string(),
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}
