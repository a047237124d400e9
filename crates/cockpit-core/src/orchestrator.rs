//! Intelligence Orchestrator: the end-to-end query-processing pipeline.
//!
//! Composes the Domain Manifest, Model Gateway, and Surface Factory:
//! build system prompt → invoke gateway (single attempt, bounded timeout) →
//! parse `{intent, text, keywords}` → build surface + resolve source.
//!
//! Any gateway or parse failure collapses into one FALLBACK path that still returns
//! the full response shape: intent `general`, a text explaining degraded operation,
//! the generic surface built from the raw query, and the `default` source. The
//! caller never needs to special-case "the agent is down" — `process_query` cannot
//! fail and there is no distinct error response shape.

use crate::error::GatewayError;
use crate::gateway::{ModelGateway, Turn};
use crate::manifest::{DomainManifest, SourceAttribution};
use crate::surface::{build_surface, Surface};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Default bound on the single suspending operation in the pipeline.
/// An unbounded hang is a defect, not a feature.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(30);

const FALLBACK_TEXT: &str = "I've processed your request.";

/// Parsed output of the Model Gateway call, with per-field defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelResult {
    pub intent: String,
    pub text: String,
    /// Comma-separated free text; reused as the surface `context` and as the
    /// source-attribution lookup key.
    pub keywords: String,
}

/// The raw shape the model is asked to return. All fields optional: missing
/// fields default rather than failing the whole reply.
#[derive(Debug, Deserialize)]
struct RawModelOutput {
    #[serde(default)]
    intent: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    keywords: Option<String>,
}

/// The full response contract returned to the service boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentReply {
    pub intent: String,
    pub text: String,
    pub surface: Surface,
    pub source: SourceAttribution,
    /// True when this reply came from a degraded path (gateway failure, malformed
    /// output, or a guardrail block). Internal marker only: the wire contract is
    /// `{intent, text, surface, source}` and clients never see this field.
    #[serde(skip)]
    pub degraded: bool,
}

/// Direction of an interaction-log payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogDirection {
    Inbound,
    Outbound,
}

/// Purely observational interaction logger; no core decision depends on it.
pub trait InteractionLog: Send + Sync {
    fn record(&self, direction: LogDirection, payload: &serde_json::Value);
}

/// The orchestration core. Read-only after construction; requests are processed
/// independently with no shared mutable state, so it can be shared across tasks
/// behind an `Arc` with no coordination.
pub struct Orchestrator {
    manifest: Arc<DomainManifest>,
    gateway: Arc<dyn ModelGateway>,
    call_timeout: Duration,
    interaction_log: Option<Arc<dyn InteractionLog>>,
}

impl Orchestrator {
    pub fn new(manifest: Arc<DomainManifest>, gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            manifest,
            gateway,
            call_timeout: DEFAULT_CALL_TIMEOUT,
            interaction_log: None,
        }
    }

    /// Bound the gateway call. Zero is clamped to one millisecond.
    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout.max(Duration::from_millis(1));
        self
    }

    pub fn with_interaction_log(mut self, log: Arc<dyn InteractionLog>) -> Self {
        self.interaction_log = Some(log);
        self
    }

    pub fn manifest(&self) -> &DomainManifest {
        &self.manifest
    }

    /// System prompt: persona + fixed JSON-response-format block + intent guidance.
    pub fn system_prompt(&self) -> String {
        format!(
            "{persona}\n\n\
             ## RESPONSE FORMAT\n\
             Respond ONLY with a valid JSON object.\n\
             {{\n  \"intent\": \"<intent_name>\",\n  \"text\": \"<conversational_response>\",\n  \"keywords\": \"<comma_separated_keywords_for_a2ui>\"\n}}\n\n\
             {guidance}",
            persona = self.manifest.persona,
            guidance = self.manifest.intent_guidance(),
        )
    }

    /// The single entry point the service boundary calls. Never returns an error:
    /// all internal failures are absorbed into the fallback reply.
    pub async fn process_query(&self, query: &str, history: &[Turn]) -> AgentReply {
        if let Some(log) = &self.interaction_log {
            log.record(
                LogDirection::Inbound,
                &serde_json::json!({ "query": query, "history_turns": history.len() }),
            );
        }

        let reply = match self.attempt(query, history).await {
            Ok(reply) => reply,
            Err(error) => {
                tracing::warn!(
                    target: "cockpit::orchestrator",
                    %error,
                    "model pipeline failed; serving fallback reply"
                );
                self.fallback_reply(query, &error)
            }
        };

        if let Some(log) = &self.interaction_log {
            log.record(
                LogDirection::Outbound,
                &serde_json::json!({
                    "intent": reply.intent,
                    "surface_id": reply.surface.surface_id,
                }),
            );
        }
        reply
    }

    /// The happy path: PROMPTED → PARSED → SURFACED. Any `Err` here collapses to FALLBACK.
    async fn attempt(&self, query: &str, history: &[Turn]) -> Result<AgentReply, GatewayError> {
        let system_prompt = self.system_prompt();

        let raw = tokio::time::timeout(
            self.call_timeout,
            self.gateway.generate(&system_prompt, history, query),
        )
        .await
        .map_err(|_| {
            GatewayError::Unavailable(format!(
                "gateway call exceeded {} ms",
                self.call_timeout.as_millis()
            ))
        })??;

        let result = parse_model_output(&raw, query)?;

        if !self.manifest.known_intent(&result.intent)
            && result.intent != "general"
            && result.intent != "greeting"
        {
            // Not an error: factory totality degrades this to the generic surface.
            tracing::info!(
                target: "cockpit::orchestrator",
                intent = %result.intent,
                "model returned an unconfigured intent"
            );
        }

        let surface = build_surface(&result.intent, &result.keywords);
        let source = self.manifest.resolve_source(&result.keywords);
        Ok(AgentReply {
            intent: result.intent,
            text: result.text,
            surface,
            source,
            degraded: false,
        })
    }

    /// FALLBACK: intent forced to `general`, text embeds the failure description,
    /// surface built from the raw query (the generic surface by construction, since
    /// `general` has no template), source resolved against the `default` topic.
    fn fallback_reply(&self, query: &str, error: &GatewayError) -> AgentReply {
        AgentReply {
            intent: "general".to_string(),
            text: format!("Running in fallback mode. Error: {error}"),
            surface: build_surface("general", query),
            source: self.manifest.resolve_source("default"),
            degraded: true,
        }
    }
}

/// Parse the gateway's text as the expected JSON object. A parse error (not JSON,
/// not an object, wrong field types) is `MalformedOutput`; individually missing
/// fields default: intent → `general`, text → generic message, keywords → the query.
fn parse_model_output(raw: &str, query: &str) -> Result<ModelResult, GatewayError> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| GatewayError::MalformedOutput(format!("expected intent/text/keywords object: {e}")))?;
    // Require an object before field extraction: serde would otherwise accept a
    // JSON array positionally, silently coercing it into the struct.
    if !value.is_object() {
        return Err(GatewayError::MalformedOutput(format!(
            "expected a JSON object, got {}",
            json_kind(&value)
        )));
    }
    let parsed: RawModelOutput = serde_json::from_value(value)
        .map_err(|e| GatewayError::MalformedOutput(format!("expected intent/text/keywords object: {e}")))?;
    Ok(ModelResult {
        intent: parsed.intent.unwrap_or_else(|| "general".to_string()),
        text: parsed.text.unwrap_or_else(|| FALLBACK_TEXT.to_string()),
        keywords: parsed.keywords.unwrap_or_else(|| query.to_string()),
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_applies_per_field_defaults() {
        let result = parse_model_output(r#"{"intent":"weather"}"#, "original query").unwrap();
        assert_eq!(result.intent, "weather");
        assert_eq!(result.text, FALLBACK_TEXT);
        assert_eq!(result.keywords, "original query");
    }

    #[test]
    fn parse_rejects_non_json() {
        let err = parse_model_output("not json", "q").unwrap_err();
        assert!(matches!(err, GatewayError::MalformedOutput(_)));
    }

    #[test]
    fn parse_rejects_wrongly_typed_fields() {
        // Schema deviation is malformed output, never a silent coercion.
        let err = parse_model_output(r#"{"intent": 42, "text": "ok"}"#, "q").unwrap_err();
        assert!(matches!(err, GatewayError::MalformedOutput(_)));
    }

    #[test]
    fn parse_rejects_json_arrays() {
        let err = parse_model_output(r#"["intent", "text"]"#, "q").unwrap_err();
        assert!(matches!(err, GatewayError::MalformedOutput(_)));
    }
}
