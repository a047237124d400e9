//! Model Gateway: the opaque language-model invocation capability.
//!
//! The core depends only on the [`ModelGateway`] trait: given a system prompt,
//! conversation history, and the current query, return raw text that is *requested*
//! (via `response_format`) to be JSON but is not guaranteed to be. The live
//! implementation speaks the OpenAI-compatible chat-completions wire format.
//!
//! Credentials are an injected capability ([`CredentialProvider`]) with an explicit
//! cache-and-expiry broker, never ambient global state, so tests can substitute both
//! the model and the token source.

use crate::error::GatewayError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

const DEFAULT_API_BASE: &str = "https://openrouter.ai/api/v1";
/// Routing targets: flash-class for short queries, pro-class for long ones.
pub const FLASH_MODEL: &str = "google/gemini-2.0-flash-001";
pub const PRO_MODEL: &str = "google/gemini-2.5-pro";

/// Role of one prior conversation turn. This is the core's own two-value
/// vocabulary; implementations map it to their wire vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Agent,
}

impl TurnRole {
    /// Wire mapping for OpenAI-compatible chat endpoints.
    pub fn wire_name(&self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Agent => "assistant",
        }
    }
}

/// One prior turn of the conversation, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub text: String,
}

/// Opaque model invocation capability. One call per request; no retry inside the
/// core (a single failure goes straight to fallback to bound worst-case latency).
#[async_trait::async_trait]
pub trait ModelGateway: Send + Sync {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[Turn],
        query: &str,
    ) -> Result<String, GatewayError>;
}

/// Smart model routing: flash-class for short queries, pro-class for complex ones.
/// Returns the model name and a short reason for the audit log.
pub fn route_model(query: &str) -> (&'static str, &'static str) {
    if query.split_whitespace().count() < 20 {
        (FLASH_MODEL, "flash-class for efficient response")
    } else {
        (PRO_MODEL, "pro-class for complex reasoning")
    }
}

// ---------------------------------------------------------------------------
// Credentials: injected capability with explicit cache + expiry
// ---------------------------------------------------------------------------

/// Credential capability the gateway draws its bearer token and project identity from.
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, GatewayError>;
    fn project_id(&self) -> String;
}

/// Fetches a fresh token plus its time-to-live. Implementations: a static
/// environment key, or an external exchange in deployments that need one.
#[async_trait::async_trait]
pub trait TokenSource: Send + Sync {
    async fn fetch(&self) -> Result<(String, Duration), GatewayError>;
}

struct CachedToken {
    token: String,
    expires_at: Instant,
}

/// Token broker with internal cache fields and an explicit expiry check.
/// A token is reused only while it has more than [`TokenBroker::EXPIRY_SKEW`]
/// of validity left.
pub struct TokenBroker<S> {
    source: S,
    project_id: String,
    cached: RwLock<Option<CachedToken>>,
}

impl<S: TokenSource> TokenBroker<S> {
    /// Safety margin: refresh when less than this much validity remains.
    pub const EXPIRY_SKEW: Duration = Duration::from_secs(60);

    pub fn new(source: S, project_id: impl Into<String>) -> Self {
        Self {
            source,
            project_id: project_id.into(),
            cached: RwLock::new(None),
        }
    }
}

#[async_trait::async_trait]
impl<S: TokenSource> CredentialProvider for TokenBroker<S> {
    async fn access_token(&self) -> Result<String, GatewayError> {
        if let Some(cached) = self.cached.read().await.as_ref() {
            if cached.expires_at > Instant::now() + Self::EXPIRY_SKEW {
                return Ok(cached.token.clone());
            }
        }
        let (token, ttl) = self.source.fetch().await?;
        *self.cached.write().await = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + ttl,
        });
        tracing::debug!(target: "cockpit::gateway", "refreshed gateway access token");
        Ok(token)
    }

    fn project_id(&self) -> String {
        self.project_id.clone()
    }
}

/// Token source backed by an environment variable (`COCKPIT_API_KEY`, falling back
/// to `OPENROUTER_API_KEY`). Static keys get a long nominal TTL.
pub struct EnvTokenSource;

#[async_trait::async_trait]
impl TokenSource for EnvTokenSource {
    async fn fetch(&self) -> Result<(String, Duration), GatewayError> {
        let key = std::env::var("COCKPIT_API_KEY")
            .or_else(|_| std::env::var("OPENROUTER_API_KEY"))
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                GatewayError::Unavailable(
                    "no API key configured (set COCKPIT_API_KEY or OPENROUTER_API_KEY)".to_string(),
                )
            })?;
        Ok((key, Duration::from_secs(3000)))
    }
}

// ---------------------------------------------------------------------------
// Live gateway (OpenAI-compatible chat completions)
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    response_format: ResponseFormat,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// Live Model Gateway against a managed OpenAI-compatible endpoint.
///
/// When no model is pinned, each call is routed by [`route_model`]. JSON output is
/// requested via `response_format`, but callers must still treat the returned text
/// as untrusted (the orchestrator owns parse-failure recovery).
pub struct ManagedModelGateway {
    credentials: Arc<dyn CredentialProvider>,
    client: reqwest::Client,
    api_base: String,
    model: Option<String>,
}

impl ManagedModelGateway {
    pub fn new(credentials: Arc<dyn CredentialProvider>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            credentials,
            client,
            api_base: DEFAULT_API_BASE.to_string(),
            model: None,
        }
    }

    /// Pin a model instead of per-query routing.
    pub fn with_model(mut self, model: &str) -> Self {
        self.model = Some(model.to_string());
        self
    }

    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait::async_trait]
impl ModelGateway for ManagedModelGateway {
    async fn generate(
        &self,
        system_prompt: &str,
        history: &[Turn],
        query: &str,
    ) -> Result<String, GatewayError> {
        let token = self.credentials.access_token().await?;

        let model = match &self.model {
            Some(pinned) => pinned.clone(),
            None => {
                let (routed, reason) = route_model(query);
                tracing::debug!(target: "cockpit::gateway", model = routed, reason, "routed model");
                routed.to_string()
            }
        };

        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ChatMessage {
            role: "system".to_string(),
            content: system_prompt.to_string(),
        });
        for turn in history {
            messages.push(ChatMessage {
                role: turn.role.wire_name().to_string(),
                content: turn.text.clone(),
            });
        }
        messages.push(ChatMessage {
            role: "user".to_string(),
            content: query.to_string(),
        });

        let body = ChatRequest {
            model,
            messages,
            response_format: ResponseFormat { kind: "json_object" },
            temperature: Some(0.3),
        };

        let url = format!("{}/chat/completions", self.api_base);
        let res = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", token))
            .header("X-Title", self.credentials.project_id())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Unavailable(format!("request failed: {e}")))?;

        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(GatewayError::Unavailable(format!(
                "endpoint returned {status}: {body}"
            )));
        }

        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| GatewayError::MalformedOutput(format!("response envelope: {e}")))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| GatewayError::MalformedOutput("empty choices".to_string()))
    }
}
