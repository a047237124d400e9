//! Interaction log: observational record of (direction, payload) pairs.
//!
//! Emitted as `tracing` events under the `cockpit::interaction` target so
//! deployments can tee them to a rolling file (see the appender wiring in main)
//! without the core knowing where they go. No core decision depends on this.

use cockpit_core::{InteractionLog, LogDirection};

pub struct TracingInteractionLog;

impl InteractionLog for TracingInteractionLog {
    fn record(&self, direction: LogDirection, payload: &serde_json::Value) {
        let direction = match direction {
            LogDirection::Inbound => "inbound",
            LogDirection::Outbound => "outbound",
        };
        tracing::info!(
            target: "cockpit::interaction",
            direction,
            payload = %payload,
            "interaction"
        );
    }
}
