//! HTTP/WebSocket gateway for oxtutor.
//!
//! A deliberately thin surface: session lifecycle over HTTP, everything
//! else over the WebSocket. The interesting machinery lives in the
//! session and ws modules; the reasoning itself is oxtutor-cognitive's.

pub mod session;
pub mod ws;

use axum::extract::ws::rejection::WebSocketUpgradeRejection;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{any, get, post};
use axum::Router;
use oxtutor_cognitive::{LoopConfig, TriggerDetector};
use oxtutor_config::AppConfig;
use oxtutor_core::{Provider, StudentRepository, Transcriber, VisionAnalyzer};
use serde::{Deserialize, Serialize};
use session::SessionManager;
use std::sync::Arc;
use tracing::{info, warn};
use ws::SessionWiring;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub config: AppConfig,
    pub provider: Arc<dyn Provider>,
    pub repository: Arc<dyn StudentRepository>,
    pub transcriber: Arc<dyn Transcriber>,
    pub vision: Arc<dyn VisionAnalyzer>,
    pub sessions: SessionManager,
}

impl GatewayState {
    fn wiring(&self) -> SessionWiring {
        SessionWiring {
            provider: self.provider.clone(),
            repository: self.repository.clone(),
            transcriber: self.transcriber.clone(),
            vision: self.vision.clone(),
            model: self.config.model.clone(),
            loop_config: LoopConfig {
                max_tool_iterations: self.config.observation.max_tool_iterations,
                cycle_cooldown_seconds: self.config.observation.cycle_cooldown_seconds,
                temperature: self.config.temperature,
            },
            triggers: TriggerDetector::new(
                self.config.observation.silence_threshold_seconds,
                self.config.observation.visual_change_threshold,
            ),
        }
    }
}

type SharedState = Arc<GatewayState>;

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/session/start", post(session_start_handler))
        .route("/session/{session_id}/stop", post(session_stop_handler))
        .route("/ws/{session_id}", any(ws_handler))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let api_key = config.api_key.clone().unwrap_or_default();
    if api_key.is_empty() {
        warn!("No API key configured — reasoner calls will fail until one is set");
    }
    let provider: Arc<dyn Provider> =
        Arc::new(oxtutor_providers::OpenAiCompatProvider::openrouter(&api_key));
    let repository: Arc<dyn StudentRepository> = Arc::new(
        oxtutor_store::SqliteStudentStore::new(&config.store.db_path).await?,
    );
    let transcriber: Arc<dyn Transcriber> = Arc::new(oxtutor_providers::HttpTranscriber::new(
        &config.transcription.endpoint,
        &config.transcription.model,
    ));
    let vision: Arc<dyn VisionAnalyzer> = Arc::new(oxtutor_providers::VisionDescriber::new(
        "https://openrouter.ai/api/v1",
        &api_key,
        &config.model,
    ));

    let state = Arc::new(GatewayState {
        config,
        provider,
        repository,
        transcriber,
        vision,
        sessions: SessionManager::new(),
    });

    let app = build_router(state);
    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    active_sessions: usize,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        active_sessions: state.sessions.len().await,
    })
}

#[derive(Deserialize)]
struct StartParams {
    #[serde(default)]
    student_id: String,
}

#[derive(Serialize)]
struct StartResponse {
    session_id: String,
    student_id: String,
}

async fn session_start_handler(
    State(state): State<SharedState>,
    Query(params): Query<StartParams>,
) -> Response {
    if params.student_id.is_empty() {
        return (StatusCode::BAD_REQUEST, "student_id is required").into_response();
    }

    match state
        .sessions
        .start(
            &params.student_id,
            state.config.observation.interval_seconds,
            state.repository.as_ref(),
        )
        .await
    {
        Ok(handle) => Json(StartResponse {
            session_id: handle.session_id.clone(),
            student_id: handle.student_id.clone(),
        })
        .into_response(),
        Err(e) => {
            warn!(error = %e, "Failed to start session");
            (StatusCode::INTERNAL_SERVER_ERROR, "failed to start session").into_response()
        }
    }
}

async fn session_stop_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
) -> StatusCode {
    if state.sessions.stop(&session_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

async fn ws_handler(
    State(state): State<SharedState>,
    Path(session_id): Path<String>,
    upgrade: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    // Session lookup first: an unknown id is a 404 whether or not the
    // request carries valid upgrade headers.
    let Some(handle) = state.sessions.get(&session_id).await else {
        return (StatusCode::NOT_FOUND, "unknown session").into_response();
    };
    let upgrade = match upgrade {
        Ok(upgrade) => upgrade,
        Err(rejection) => return rejection.into_response(),
    };
    if !handle.try_connect() {
        return (StatusCode::CONFLICT, "session already has a client").into_response();
    }

    let wiring = state.wiring();
    upgrade.on_upgrade(move |socket| async move {
        ws::run_session(socket, handle, wiring).await;
        // The socket owned the session; closing it ends the session so
        // the manager never holds a stopped loop a client could rebind.
        state.sessions.stop(&session_id).await;
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use oxtutor_core::error::{CollaboratorError, ProviderError};
    use oxtutor_core::provider::{ProviderRequest, ProviderResponse};
    use oxtutor_core::Message;
    use oxtutor_store::InMemoryStudentStore;
    use tower::ServiceExt;

    struct SilentProvider;

    #[async_trait]
    impl Provider for SilentProvider {
        fn name(&self) -> &str {
            "silent"
        }
        async fn complete(
            &self,
            _request: ProviderRequest,
        ) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: Message::assistant("watching"),
                finish_reason: Some("stop".into()),
                model: "mock".into(),
                usage: None,
            })
        }
    }

    struct NoopTranscriber;

    #[async_trait]
    impl Transcriber for NoopTranscriber {
        async fn transcribe(&self, _audio: &[u8]) -> Result<String, CollaboratorError> {
            Ok(String::new())
        }
    }

    struct NoopVision;

    #[async_trait]
    impl VisionAnalyzer for NoopVision {
        async fn analyze(&self, _image: &str, _ctx: &str) -> Result<String, CollaboratorError> {
            Ok(String::new())
        }
    }

    fn test_state() -> SharedState {
        Arc::new(GatewayState {
            config: AppConfig::default(),
            provider: Arc::new(SilentProvider),
            repository: Arc::new(InMemoryStudentStore::new()),
            transcriber: Arc::new(NoopTranscriber),
            vision: Arc::new(NoopVision),
            sessions: SessionManager::new(),
        })
    }

    #[tokio::test]
    async fn health_endpoint_reports_ok() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn session_start_requires_student_id() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/session/start")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn session_start_then_stop() {
        let state = test_state();
        let app = build_router(state.clone());

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/session/start?student_id=alice")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let session_id = parsed["session_id"].as_str().unwrap().to_string();
        assert_eq!(parsed["student_id"], "alice");
        assert_eq!(state.sessions.len().await, 1);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/session/{session_id}/stop"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.sessions.len().await, 0);

        // Stopping again is a 404, not an error.
        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/session/{session_id}/stop"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn ws_route_rejects_unknown_session() {
        let app = build_router(test_state());
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/ws/no-such-session")
                    .header("upgrade", "websocket")
                    .header("connection", "upgrade")
                    .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
                    .header("sec-websocket-version", "13")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
