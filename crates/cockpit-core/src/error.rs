//! Error taxonomy for the orchestration core.
//!
//! Both variants are recovered locally by the orchestrator's fallback path and never
//! propagate past `process_query`. An unknown intent name is deliberately *not* an
//! error: the Surface Factory's totality absorbs it into the generic surface.

use thiserror::Error;

/// Failures talking to, or trusting the output of, the Model Gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Auth, network, or timeout failure before a usable response arrived.
    #[error("model gateway unavailable: {0}")]
    Unavailable(String),
    /// The gateway answered, but not with the expected `{intent, text, keywords}` JSON shape.
    #[error("malformed model output: {0}")]
    MalformedOutput(String),
}
