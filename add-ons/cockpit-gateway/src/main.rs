//! Axum-based service boundary for the cockpit orchestration core.
//!
//! Holds the model API key (the frontend never sees it), wires the middleware
//! chain (cost guard, reply cache, optional shadow routing) around the
//! orchestrator per RuntimeConfig, and logs every interaction. All model/parse failures were absorbed by the
//! core, so `POST /api/v1/agent/query` answers 200 with a well-formed reply
//! even when the model endpoint is down.

mod handlers;
mod interaction_log;

use axum::routing::{get, post};
use axum::Router;
use cockpit_core::{
    CostGuard, CredentialProvider, DomainManifest, EnvTokenSource, ManagedModelGateway,
    Orchestrator, QueryPipeline, ReplyCache, RuntimeConfig, ShadowRouter, TokenBroker,
};
use interaction_log::TracingInteractionLog;
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<QueryPipeline>,
}

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/agent/query", post(handlers::agent_query))
        .route("/api/v1/health", get(handlers::health))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Assemble manifest → credentials → gateway → orchestrator → middleware chain.
fn build_pipeline(config: &RuntimeConfig) -> Arc<QueryPipeline> {
    let manifest = Arc::new(DomainManifest::universal());

    let credentials: Arc<dyn CredentialProvider> =
        Arc::new(TokenBroker::new(EnvTokenSource, manifest.name.clone()));
    let mut gateway = ManagedModelGateway::new(Arc::clone(&credentials));
    if let Some(model) = &config.model {
        gateway = gateway.with_model(model);
    }
    if let Some(api_base) = &config.api_base {
        gateway = gateway.with_api_base(api_base);
    }

    let orchestrator = Arc::new(
        Orchestrator::new(Arc::clone(&manifest), Arc::new(gateway))
            .with_call_timeout(Duration::from_secs(config.call_timeout_secs))
            .with_interaction_log(Arc::new(TracingInteractionLog)),
    );

    // Stage order: cost guard first so blocked requests never touch the cache;
    // the shadow router sits innermost so cached or blocked requests are not
    // mirrored to the candidate model.
    let mut pipeline = QueryPipeline::new(orchestrator);
    if config.cost_guard_enabled() {
        pipeline = pipeline.with_stage(Arc::new(CostGuard::new(
            Arc::clone(&manifest),
            config.cost_budget,
        )));
    }
    if config.cache_enabled {
        pipeline = pipeline.with_stage(Arc::new(ReplyCache::new()));
    }
    if let Some(shadow_model) = &config.shadow_model {
        let mut shadow_gateway =
            ManagedModelGateway::new(Arc::clone(&credentials)).with_model(shadow_model);
        if let Some(api_base) = &config.api_base {
            shadow_gateway = shadow_gateway.with_api_base(api_base);
        }
        // No interaction log on the shadow path: only the comparison is recorded.
        let shadow = Arc::new(
            Orchestrator::new(Arc::clone(&manifest), Arc::new(shadow_gateway))
                .with_call_timeout(Duration::from_secs(config.call_timeout_secs)),
        );
        pipeline = pipeline.with_stage(Arc::new(ShadowRouter::new(shadow)));
    }
    Arc::new(pipeline)
}

/// Init tracing; when COCKPIT_INTERACTION_LOG_DIR is set, tee the
/// `cockpit::interaction` target to a daily-rolling file. The returned guard
/// must stay alive for the writer to flush.
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,cockpit=debug"));
    let stdout_layer = tracing_subscriber::fmt::layer().with_filter(env_filter);

    match std::env::var("COCKPIT_INTERACTION_LOG_DIR").ok().filter(|d| !d.trim().is_empty()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "interactions.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(
                    tracing_subscriber::filter::Targets::new()
                        .with_target("cockpit::interaction", tracing::Level::INFO),
                );
            tracing_subscriber::registry()
                .with(stdout_layer)
                .with(file_layer)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry().with(stdout_layer).init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // API keys stay in the backend; clients never receive or send them.
    if let Err(e) = dotenvy::dotenv() {
        eprintln!("[cockpit-gateway] .env not loaded: {e} (using system environment)");
    }
    let _log_guard = init_tracing();

    if std::env::var("COCKPIT_API_KEY").is_err() && std::env::var("OPENROUTER_API_KEY").is_err() {
        tracing::warn!(
            target: "cockpit::http",
            "no model API key configured; every query will serve the fallback surface"
        );
    }

    let config = RuntimeConfig::from_env();
    let state = AppState {
        pipeline: build_pipeline(&config),
    };

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(target: "cockpit::http", port = config.port, "cockpit gateway listening");
    axum::serve(listener, app(state)).await?;
    Ok(())
}
