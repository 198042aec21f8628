//! HTTP API server.
//!
//! Exposes the question pipeline and the actor lookup over REST.

use crate::capabilities::MovieAttribute;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::error::CineError;
use crate::orchestrator::Orchestrator;
use crate::question::{Question, QuestionType};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::warn;

/// Shared application state.
pub struct AppState {
    orchestrator: Orchestrator,
}

impl AppState {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);

    let state = Arc::new(AppState::new(Orchestrator::new(&settings)?));
    let app = router(state);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("Cinequery API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Root", "GET  /");
    Output::kv("Ask", "POST /ask");
    Output::kv("Get Actor", "GET  /get_actor/{title}");
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/ask", post(ask))
        .route("/get_actor/{title}", get(get_actor))
        .layer(cors)
        .with_state(state)
}

// === Request/Response Types ===

#[derive(Deserialize)]
struct AskRequest {
    #[serde(default)]
    question: Option<String>,
    #[serde(rename = "type")]
    kind: QuestionType,
    #[serde(rename = "correlationToken", default)]
    correlation_token: Option<String>,
}

#[derive(Serialize)]
struct ActorResponse {
    actor: String,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// HTTP status for a failed request.
fn status_for(error: &CineError) -> StatusCode {
    match error {
        CineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        CineError::ToolNotFound(_) | CineError::InvalidToolArguments { .. } => StatusCode::BAD_GATEWAY,
        CineError::DeadlineExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
        e if e.is_provider_unavailable() => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(error: CineError) -> axum::response::Response {
    let status = status_for(&error);
    warn!("Request failed with {}: {}", status, error);
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// === Handlers ===

async fn root() -> impl IntoResponse {
    Json(serde_json::json!({ "message": "Cinequery is up" }))
}

async fn ask(State(state): State<Arc<AppState>>, Json(req): Json<AskRequest>) -> impl IntoResponse {
    let question = Question::new(req.question.unwrap_or_default(), req.kind)
        .with_correlation_token(req.correlation_token);

    match state.orchestrator.ask(&question).await {
        Ok(answer) => Json(answer).into_response(),
        Err(e) => error_response(e),
    }
}

async fn get_actor(State(state): State<Arc<AppState>>, Path(title): Path<String>) -> impl IntoResponse {
    match state
        .orchestrator
        .lookup(&MovieAttribute::Actor.tool_name(), &title)
        .await
    {
        Ok(outcome) => Json(ActorResponse {
            actor: outcome.into_text(),
        })
        .into_response(),
        Err(e) => error_response(e),
    }
}
