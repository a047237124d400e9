//! cockpit-core: intent-to-surface orchestration core.
//!
//! Accepts a natural-language query, classifies its intent via an opaque Model
//! Gateway, and maps the model's structured payload onto one of a fixed set of
//! declarative UI surfaces. The contract the rest of the stack relies on:
//! `process_query` always returns a complete, well-formed reply — gateway and
//! parse failures degrade to the generic surface, never to an error.

mod config;
mod error;
mod gateway;
mod manifest;
mod middleware;
mod orchestrator;
mod surface;

pub use config::RuntimeConfig;
pub use error::GatewayError;
pub use gateway::{
    route_model, CredentialProvider, EnvTokenSource, ManagedModelGateway, ModelGateway,
    TokenBroker, TokenSource, Turn, TurnRole, FLASH_MODEL, PRO_MODEL,
};
pub use manifest::{DomainManifest, IntentSpec, SourceAttribution, SourceEntry};
pub use middleware::{
    CostGuard, Next, QueryMiddleware, QueryPipeline, QueryRequest, ReplyCache, ShadowRouter,
};
pub use orchestrator::{
    AgentReply, InteractionLog, LogDirection, ModelResult, Orchestrator, DEFAULT_CALL_TIMEOUT,
};
pub use surface::{build_surface, standard_surface, Component, Surface};
