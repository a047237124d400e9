//! HTTP handlers: the thin boundary between the wire and the query pipeline.
//!
//! `POST /api/v1/agent/query` delegates to the pipeline and always answers 200
//! under normal operation — gateway and parse failures were already absorbed into
//! the fallback reply by the core, so there is no error response shape here.

use crate::AppState;
use axum::extract::State;
use axum::Json;
use cockpit_core::{AgentReply, QueryRequest, Turn};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct QueryBody {
    pub query: String,
    /// Prior turns, oldest first. Absent = zero turns.
    #[serde(default)]
    pub history: Vec<Turn>,
}

pub async fn agent_query(
    State(state): State<AppState>,
    Json(body): Json<QueryBody>,
) -> Json<AgentReply> {
    let trace_id = Uuid::new_v4();
    tracing::info!(
        target: "cockpit::http",
        %trace_id,
        query_chars = body.query.chars().count(),
        history_turns = body.history.len(),
        "query received"
    );

    let reply = state
        .pipeline
        .process(QueryRequest {
            query: body.query,
            history: body.history,
        })
        .await;

    tracing::info!(
        target: "cockpit::http",
        %trace_id,
        intent = %reply.intent,
        surface_id = %reply.surface.surface_id,
        "query answered"
    );
    Json(reply)
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

#[cfg(test)]
mod tests {
    use crate::{app, AppState};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use cockpit_core::{
        DomainManifest, GatewayError, ModelGateway, Orchestrator, QueryPipeline, Turn,
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    struct ScriptedGateway {
        reply: Result<String, String>,
    }

    #[async_trait::async_trait]
    impl ModelGateway for ScriptedGateway {
        async fn generate(
            &self,
            _system_prompt: &str,
            _history: &[Turn],
            _query: &str,
        ) -> Result<String, GatewayError> {
            self.reply
                .clone()
                .map_err(GatewayError::Unavailable)
        }
    }

    fn test_state(reply: Result<String, String>) -> AppState {
        let manifest = Arc::new(DomainManifest::universal());
        let orchestrator = Arc::new(Orchestrator::new(
            manifest,
            Arc::new(ScriptedGateway { reply }),
        ));
        AppState {
            pipeline: Arc::new(QueryPipeline::new(orchestrator)),
        }
    }

    async fn post_query(state: AppState, body: serde_json::Value) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/agent/query")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app(state).oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn query_endpoint_returns_the_full_reply_shape() {
        let state = test_state(Ok(
            r#"{"intent":"weather","text":"It's sunny","keywords":"weather today"}"#.to_string(),
        ));
        let (status, json) =
            post_query(state, serde_json::json!({ "query": "weather?" })).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["intent"], "weather");
        assert_eq!(json["surface"]["surfaceId"], "weather-widget");
        assert_eq!(json["source"]["provider"], "General Purpose Intelligence");
    }

    #[tokio::test]
    async fn gateway_failure_is_still_a_200_with_fallback_body() {
        let state = test_state(Err("model endpoint down".to_string()));
        let (status, json) = post_query(
            state,
            serde_json::json!({
                "query": "hi",
                "history": [{ "role": "user", "text": "earlier" }],
            }),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["intent"], "general");
        assert_eq!(json["surface"]["surfaceId"], "standard-surface");
        assert!(json["text"].as_str().unwrap().contains("model endpoint down"));
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let request = Request::builder()
            .uri("/api/v1/health")
            .body(Body::empty())
            .unwrap();
        let response = app(test_state(Ok("{}".to_string())))
            .oneshot(request)
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
