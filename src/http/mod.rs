//! Axum HTTP surface.
//!
//! `HttpServer::run()` drives the axum event loop; the [`CancellationToken`]
//! is wired to axum's graceful shutdown.
//!
//! ## URL layout
//!
//! ```text
//! GET  /                                  service banner
//! GET  /health
//! GET  /api/agents
//! POST /api/agents/initialize             verify every persona's assistant
//! GET  /api/agents/shared/vector-store
//! GET  /api/agents/{id}
//! POST /api/agents/{id}/chat
//! POST /api/agents/{id}/chat/stream       text/event-stream
//! POST /api/agents/{id}/upload-file       multipart field `file`
//! GET  /api/agents/{id}/files
//! ```

mod api;
mod error;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::conversation::{ConversationClient, PollSettings};
use crate::documents::DocumentClient;
use crate::error::AppError;
use crate::personas::PersonaRegistry;
use crate::provider::AssistantsProvider;

/// Largest accepted upload body.
const UPLOAD_BODY_LIMIT: usize = 32 * 1024 * 1024;

// ── Shared request state ──────────────────────────────────────────────────────

/// Router state injected into every handler via [`axum::extract::State`].
///
/// Cheap to clone; nothing in it is mutated after startup.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<PersonaRegistry>,
    pub conversations: ConversationClient,
    pub documents: DocumentClient,
}

impl AppState {
    pub fn new(
        registry: PersonaRegistry,
        provider: AssistantsProvider,
        poll: PollSettings,
        vector_store_id: impl Into<String>,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            conversations: ConversationClient::new(provider.clone(), poll),
            documents: DocumentClient::new(provider, vector_store_id),
        }
    }
}

// ── Server ────────────────────────────────────────────────────────────────────

pub struct HttpServer {
    bind_addr: String,
    state: AppState,
    allowed_origins: Vec<String>,
}

impl HttpServer {
    pub fn new(bind_addr: impl Into<String>, state: AppState, allowed_origins: Vec<String>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            state,
            allowed_origins,
        }
    }

    pub async fn run(self, shutdown: CancellationToken) -> Result<(), AppError> {
        let router = build_router(self.state, &self.allowed_origins);
        let bind_addr = self.bind_addr;

        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| AppError::Server(format!("bind failed on {bind_addr}: {e}")))?;

        info!(%bind_addr, "persona relay listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| AppError::Server(format!("axum server error: {e}")))?;

        info!("persona relay shut down");
        Ok(())
    }
}

// ── Router ────────────────────────────────────────────────────────────────────

pub fn build_router(state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/",                                get(api::root))
        .route("/health",                          get(api::health))
        .route("/api/agents",                      get(api::list_agents))
        .route("/api/agents/initialize",           post(api::initialize_agents))
        .route("/api/agents/shared/vector-store",  get(api::shared_vector_store))
        .route("/api/agents/{id}",                 get(api::get_agent))
        .route("/api/agents/{id}/chat",            post(api::chat))
        .route("/api/agents/{id}/chat/stream",     post(api::chat_stream))
        .route(
            "/api/agents/{id}/upload-file",
            post(api::upload_file).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/agents/{id}/files",           get(api::list_files))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

/// Any origin when the list is empty or contains `*`, otherwise exactly the
/// listed origins.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let base = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o.trim() == "*") {
        return base.allow_origin(Any);
    }

    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o.trim()) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();
    base.allow_origin(AllowOrigin::list(parsed))
}
