//! Surface Factory: maps an intent name + context string to a declarative UI surface.
//!
//! Totality is the contract: `build_surface` is a pure, total function. Every known
//! intent maps to a hand-authored template; any other string (including the
//! `general`/`greeting` pseudo-intents and the empty string) maps to the generic
//! `standard-surface`. The factory can never fail, which is what lets the rest of the
//! pipeline absorb arbitrarily malformed upstream intent classification by degrading
//! to the generic surface instead of erroring out. No template performs I/O.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// One node in a surface's component tree. `kind` is drawn from a small fixed
/// vocabulary (`Text`, `Card`, `StatBar`, `List`); only `Card`-like containers
/// carry children. The tree is shallow in practice but depth is not capped here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub props: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Component>>,
}

/// The UI contract returned in place of free text: a template id plus an ordered
/// component list (rendering order is meaningful).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Surface {
    pub surface_id: String,
    pub content: Vec<Component>,
}

impl Component {
    pub fn text(text: impl Into<String>, variant: &str) -> Self {
        Self::leaf("Text", json!({ "text": text.into(), "variant": variant }))
    }

    pub fn stat_bar(label: &str, value: u64, color: &str) -> Self {
        Self::leaf("StatBar", json!({ "label": label, "value": value, "color": color }))
    }

    pub fn list(title: &str, items: &[&str]) -> Self {
        Self::leaf("List", json!({ "title": title, "items": items }))
    }

    pub fn card(title: &str, children: Vec<Component>) -> Self {
        Self {
            kind: "Card".to_string(),
            props: as_map(json!({ "title": title })),
            children: Some(children),
        }
    }

    /// Card container without a title (props omitted on the wire).
    pub fn bare_card(children: Vec<Component>) -> Self {
        Self {
            kind: "Card".to_string(),
            props: Map::new(),
            children: Some(children),
        }
    }

    fn leaf(kind: &str, props: Value) -> Self {
        Self {
            kind: kind.to_string(),
            props: as_map(props),
            children: None,
        }
    }
}

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Maps an intent to a high-fidelity surface template parameterized by `context`.
/// Unrecognized intents fall through to [`standard_surface`].
pub fn build_surface(intent: &str, context: &str) -> Surface {
    match intent {
        "analytics" => Surface {
            surface_id: "analytics-view".to_string(),
            content: vec![
                Component::text(format!("Analytics: {context}"), "h2"),
                Component::stat_bar("Performance Index", 85, "#3b82f6"),
                Component::stat_bar("Growth Rate", 12, "#10b981"),
            ],
        },
        "vision" => Surface {
            surface_id: "vision-roadmap".to_string(),
            content: vec![
                Component::text("Strategic Roadmap", "h2"),
                Component::card(
                    "Phase 1: Foundation",
                    vec![Component::text("Laying the global infrastructure for A2UI.", "body")],
                ),
                Component::card(
                    "Phase 2: Scale",
                    vec![Component::text("Expanding intelligence to niche industries.", "body")],
                ),
            ],
        },
        "directory" => Surface {
            surface_id: "directory-list".to_string(),
            content: vec![
                Component::text("Project Directory", "h2"),
                Component::list(
                    "Active Items",
                    &["Global Supply Chain", "Healthcare Dashboard", "Fintech Bridge"],
                ),
            ],
        },
        "weather" => Surface {
            surface_id: "weather-widget".to_string(),
            content: vec![
                Component::text(format!("Current Weather: {context}"), "h2"),
                Component::stat_bar("Temperature", 72, "#f59e0b"),
                Component::stat_bar("Humidity", 45, "#3b82f6"),
            ],
        },
        "stock" => Surface {
            surface_id: "stock-ticker".to_string(),
            content: vec![
                Component::text(format!("Market Data: {context}"), "h2"),
                Component::card(
                    "GOOGL (Alphabet Inc.)",
                    vec![
                        Component::text("$142.50 (+2.4%)", "h1"),
                        Component::stat_bar("Volume", 85, "#10b981"),
                    ],
                ),
            ],
        },
        "time" => Surface {
            surface_id: "time-display".to_string(),
            content: vec![
                Component::text("System Clock", "h2"),
                Component::bare_card(vec![
                    Component::text("10:14 PM GMT-8", "h1"),
                    Component::text("Tuesday, Jan 27, 2026", "body"),
                ]),
            ],
        },
        _ => standard_surface(context),
    }
}

/// The generic fallback surface: one Card/Text pair echoing the context.
/// Every intent without a template (including `general`) lands here.
pub fn standard_surface(context: &str) -> Surface {
    Surface {
        surface_id: "standard-surface".to_string(),
        content: vec![Component::card(
            "Intelligence Node",
            vec![Component::text(
                format!("Generated responsive UI for: {context}"),
                "body",
            )],
        )],
    }
}
