//! HTTP gateway for voxloop.
//!
//! Exposes the conversational endpoint (`POST /`) and a health check.
//! Built on Axum.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::extract::rejection::JsonRejection;
use axum::{
    Router,
    extract::State,
    http::{Method, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, warn};

use voxloop_agent::AgentLoop;
use voxloop_config::AppConfig;
use voxloop_core::context::{ProcessDefaults, RequestContext, RequestOverrides, UserInput};
use voxloop_core::error::{Error, HistoryError};
use voxloop_core::history::HistoryStore;

/// Inline base64 images make requests large.
const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub agent: Arc<AgentLoop>,
    pub defaults: Arc<ProcessDefaults>,
}

pub type SharedState = Arc<GatewayState>;

/// Assemble the loop from configuration: provider, default tools and the
/// configured history backend.
pub async fn build_agent(config: &AppConfig) -> Result<AgentLoop, HistoryError> {
    let history = voxloop_history::open_backend(
        &config.history.backend,
        &config.history.resolved_path(),
    )
    .await?;
    info!(backend = history.name(), "History backend ready");

    let provider = Arc::new(voxloop_providers::OpenAiCompatProvider::new());
    let tools = Arc::new(voxloop_tools::default_registry());
    Ok(AgentLoop::new(provider, tools, history).with_limits(&config.agent))
}

/// Build the Axum router with all gateway routes.
pub fn build_router(state: SharedState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE])
        .max_age(Duration::from_secs(3600));

    Router::new()
        .route("/", post(chat_handler))
        .route("/health", get(health_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the gateway HTTP server.
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    let agent = Arc::new(build_agent(&config).await?);
    let state = Arc::new(GatewayState {
        agent,
        defaults: Arc::new(config.process_defaults()),
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
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Body of `POST /`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub chat_id: String,

    #[serde(default)]
    pub input: String,

    /// Caller's current date/time, passed verbatim into the system prompt
    pub date: String,

    /// Base64-encoded JPEG images
    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    pub config: Option<RequestOverrides>,
}

#[derive(Serialize)]
struct ChatResponse {
    response: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// A failed request as seen by the caller. Details stay in the logs.
struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidInput(reason) => ApiError {
                status: StatusCode::BAD_REQUEST,
                message: reason,
            },
            Error::Provider(_) => ApiError {
                status: StatusCode::BAD_GATEWAY,
                message: "The language model could not be reached".into(),
            },
            _ => ApiError {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "Failed to process the request".into(),
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorBody { error: self.message })).into_response()
    }
}

async fn chat_handler(
    State(state): State<SharedState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, ApiError> {
    let Json(request) = payload.map_err(|rejection| {
        warn!(error = %rejection.body_text(), "Rejected malformed chat request");
        ApiError {
            status: StatusCode::BAD_REQUEST,
            message: "Malformed request body".into(),
        }
    })?;

    info!(
        chat_id = %request.chat_id,
        input_len = request.input.len(),
        images = request.images.len(),
        "Chat request received"
    );

    let ctx = RequestContext::new(
        request.chat_id,
        UserInput {
            text: request.input,
            images: request.images,
        },
        request.date,
        state.defaults.clone(),
    )
    .with_overrides(request.config.unwrap_or_default());

    match state.agent.run(&ctx).await {
        Ok(response) => Ok(Json(ChatResponse { response })),
        Err(e) => {
            if e.is_client_error() {
                warn!(conversation_id = %ctx.conversation_id, error = %e, "Chat request rejected");
            } else {
                error!(conversation_id = %ctx.conversation_id, error = %e, "Turn failed");
            }
            Err(e.into())
        }
    }
}
