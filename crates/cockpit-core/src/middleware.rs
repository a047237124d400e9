//! Middleware chain: explicit, ordered cross-cutting stages around the core call.
//!
//! Cost guardrails and reply caching are peripheral pipeline stages, modeled as an
//! ordered list of `(request, next) → response` stages wrapped around
//! `Orchestrator::process_query` — never as implicit function-wrapping. The chain is
//! empty by default, which keeps the core pipeline testable in isolation. Every stage
//! must uphold the response contract: short-circuiting still returns a full, valid
//! [`AgentReply`].

use crate::gateway::Turn;
use crate::manifest::DomainManifest;
use crate::orchestrator::{AgentReply, Orchestrator};
use crate::surface::standard_surface;
use dashmap::DashMap;
use std::sync::Arc;

/// One query as seen by the middleware chain.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query: String,
    pub history: Vec<Turn>,
}

/// A cross-cutting stage. Call `next.run(request)` to continue the chain, or
/// return a reply directly to short-circuit.
#[async_trait::async_trait]
pub trait QueryMiddleware: Send + Sync {
    async fn handle(&self, request: QueryRequest, next: Next<'_>) -> AgentReply;
}

/// Continuation handed to each stage: the remaining stages plus the terminal
/// orchestrator call.
pub struct Next<'a> {
    stages: &'a [Arc<dyn QueryMiddleware>],
    orchestrator: &'a Orchestrator,
}

impl Next<'_> {
    pub async fn run(self, request: QueryRequest) -> AgentReply {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                stage
                    .handle(
                        request,
                        Next {
                            stages: rest,
                            orchestrator: self.orchestrator,
                        },
                    )
                    .await
            }
            None => {
                self.orchestrator
                    .process_query(&request.query, &request.history)
                    .await
            }
        }
    }
}

/// The orchestrator wrapped in its (possibly empty) middleware chain. This is what
/// the service boundary holds.
pub struct QueryPipeline {
    orchestrator: Arc<Orchestrator>,
    stages: Vec<Arc<dyn QueryMiddleware>>,
}

impl QueryPipeline {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            stages: Vec::new(),
        }
    }

    /// Append a stage; stages run in insertion order, outermost first.
    pub fn with_stage(mut self, stage: Arc<dyn QueryMiddleware>) -> Self {
        self.stages.push(stage);
        self
    }

    pub async fn process(&self, request: QueryRequest) -> AgentReply {
        Next {
            stages: &self.stages,
            orchestrator: self.orchestrator.as_ref(),
        }
        .run(request)
        .await
    }
}

// ---------------------------------------------------------------------------
// Cost guardrails
// ---------------------------------------------------------------------------

/// Enforces a per-request budget on model calls. A blocked request does not become
/// a protocol error: the stage returns the generic surface with an explanatory text,
/// keeping the response contract intact.
pub struct CostGuard {
    manifest: Arc<DomainManifest>,
    budget_limit: f64,
}

impl CostGuard {
    pub fn new(manifest: Arc<DomainManifest>, budget_limit: f64) -> Self {
        Self {
            manifest,
            budget_limit,
        }
    }

    /// Flat per-call floor plus a length component. A real deployment would check
    /// project quotas here; the shape of the decision is what matters to the chain.
    fn estimate(request: &QueryRequest) -> f64 {
        let words: usize = request.query.split_whitespace().count()
            + request
                .history
                .iter()
                .map(|t| t.text.split_whitespace().count())
                .sum::<usize>();
        0.01 + words as f64 * 0.0005
    }
}

#[async_trait::async_trait]
impl QueryMiddleware for CostGuard {
    async fn handle(&self, request: QueryRequest, next: Next<'_>) -> AgentReply {
        let estimated = Self::estimate(&request);
        if estimated > self.budget_limit {
            tracing::warn!(
                target: "cockpit::cost",
                estimated,
                budget = self.budget_limit,
                "request blocked by cost guardrails"
            );
            return AgentReply {
                intent: "general".to_string(),
                text: format!(
                    "Request blocked by cost guardrails: estimated ${estimated:.4} exceeds budget ${:.4}.",
                    self.budget_limit
                ),
                surface: standard_surface(&request.query),
                source: self.manifest.resolve_source("default"),
                degraded: true,
            };
        }
        tracing::debug!(target: "cockpit::cost", estimated, "request within budget");
        next.run(request).await
    }
}

// ---------------------------------------------------------------------------
// Reply cache
// ---------------------------------------------------------------------------

/// Serves previously computed replies for identical normalized queries.
/// Exact-match stand-in for a semantic cache; requests carrying history are
/// never cached (the reply depends on the turns, not just the query), and
/// neither are degraded replies (a transient outage must not outlive itself
/// in the cache).
pub struct ReplyCache {
    entries: DashMap<String, AgentReply>,
    max_entries: usize,
}

const DEFAULT_CACHE_CAPACITY: usize = 1024;

impl ReplyCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Once `max_entries` distinct queries are cached, further misses pass
    /// through uncached rather than grow the map without bound.
    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries,
        }
    }

    fn normalize(query: &str) -> String {
        query.trim().to_lowercase()
    }
}

impl Default for ReplyCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl QueryMiddleware for ReplyCache {
    async fn handle(&self, request: QueryRequest, next: Next<'_>) -> AgentReply {
        if !request.history.is_empty() {
            return next.run(request).await;
        }
        let key = Self::normalize(&request.query);
        if let Some(cached) = self.entries.get(&key) {
            tracing::debug!(target: "cockpit::cache", "serving cached reply");
            return cached.clone();
        }
        let reply = next.run(request).await;
        if reply.degraded {
            tracing::debug!(target: "cockpit::cache", "not caching degraded reply");
        } else if self.entries.len() < self.max_entries {
            self.entries.insert(key, reply.clone());
        }
        reply
    }
}

// ---------------------------------------------------------------------------
// Shadow A/B routing
// ---------------------------------------------------------------------------

/// Runs a shadow orchestrator next to the production path on every request and
/// logs the comparison. The caller always receives the production reply; the
/// shadow result only feeds the `cockpit::shadow` log stream, so a candidate
/// model or prompt can be evaluated on live traffic without user impact.
pub struct ShadowRouter {
    shadow: Arc<Orchestrator>,
}

impl ShadowRouter {
    pub fn new(shadow: Arc<Orchestrator>) -> Self {
        Self { shadow }
    }
}

#[async_trait::async_trait]
impl QueryMiddleware for ShadowRouter {
    async fn handle(&self, request: QueryRequest, next: Next<'_>) -> AgentReply {
        let started = std::time::Instant::now();
        let shadow_request = request.clone();
        let (production, shadow) = tokio::join!(
            next.run(request),
            self.shadow
                .process_query(&shadow_request.query, &shadow_request.history),
        );
        tracing::info!(
            target: "cockpit::shadow",
            latency_ms = started.elapsed().as_millis() as u64,
            production_intent = %production.intent,
            shadow_intent = %shadow.intent,
            production_surface = %production.surface.surface_id,
            shadow_surface = %shadow.surface.surface_id,
            intents_agree = production.intent == shadow.intent,
            "shadow comparison"
        );
        production
    }
}
