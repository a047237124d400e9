//! Runtime configuration loaded from the environment.
//!
//! Change behavior without code edits. Unset or invalid values fall back to the
//! defaults documented on each field.

use serde::{Deserialize, Serialize};

/// Runtime toggles for the orchestration core and its service boundary.
///
/// | Env | Default | Description |
/// |-----|---------|-------------|
/// | COCKPIT_MODEL | (unset) | Pin one model; unset = per-query flash/pro routing. |
/// | COCKPIT_SHADOW_MODEL | (unset) | Candidate model mirrored on live traffic; replies are logged, never served. |
/// | COCKPIT_API_BASE | (unset) | Override the model endpoint base URL. |
/// | COCKPIT_CALL_TIMEOUT_SECS | 30 | Bound on the single gateway call per request. |
/// | COCKPIT_COST_BUDGET | 0.10 | Per-request budget for the cost guard; 0 disables the stage. |
/// | COCKPIT_CACHE_ENABLED | true | Reply cache stage for history-free queries. |
/// | COCKPIT_PORT | 8080 | Service boundary listen port. |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    pub model: Option<String>,
    pub shadow_model: Option<String>,
    pub api_base: Option<String>,
    pub call_timeout_secs: u64,
    pub cost_budget: f64,
    pub cache_enabled: bool,
    pub port: u16,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            model: None,
            shadow_model: None,
            api_base: None,
            call_timeout_secs: 30,
            cost_budget: 0.10,
            cache_enabled: true,
            port: 8080,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            model: env_opt_string("COCKPIT_MODEL"),
            shadow_model: env_opt_string("COCKPIT_SHADOW_MODEL"),
            api_base: env_opt_string("COCKPIT_API_BASE"),
            call_timeout_secs: env_u64("COCKPIT_CALL_TIMEOUT_SECS", defaults.call_timeout_secs)
                .max(1),
            cost_budget: env_f64("COCKPIT_COST_BUDGET", defaults.cost_budget).max(0.0),
            cache_enabled: env_bool("COCKPIT_CACHE_ENABLED", defaults.cache_enabled),
            port: env_u64("COCKPIT_PORT", defaults.port as u64).min(u16::MAX as u64) as u16,
        }
    }

    /// Cost guard is active only with a positive budget.
    pub fn cost_guard_enabled(&self) -> bool {
        self.cost_budget > 0.0
    }
}

fn env_bool(name: &str, default: bool) -> bool {
    match std::env::var(name) {
        Ok(v) => v.trim().eq_ignore_ascii_case("true") || (v.trim().is_empty() && default),
        Err(_) => default,
    }
}

fn env_u64(name: &str, default: u64) -> u64 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_f64(name: &str, default: f64) -> f64 {
    match std::env::var(name) {
        Ok(v) => v.trim().parse().unwrap_or(default),
        Err(_) => default,
    }
}

fn env_opt_string(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
