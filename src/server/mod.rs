//! HTTP server for the ingestion and retrieval pipeline

pub mod routes;
pub mod state;

use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::net::SocketAddr;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::Config;
use crate::error::Result;
use crate::types::ReadyResponse;
use state::AppState;

/// Ingestion and retrieval HTTP server
pub struct RagServer {
    config: Config,
    state: AppState,
}

impl RagServer {
    /// Create a new server
    pub fn new(config: Config) -> Result<Self> {
        let state = AppState::new(config.clone())?;
        Ok(Self { config, state })
    }

    /// Get the shared application state
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with all routes
    fn build_router(&self) -> Router {
        // CORS layer - must be added first (outermost)
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        Router::new()
            // Health checks
            .route("/health", get(health_check))
            .route("/ready", get(readiness))
            // API routes with body limit for multipart uploads
            .nest("/api", routes::api_routes(self.config.server.max_upload_size))
            .with_state(self.state.clone())
            // Middleware layers (order matters - applied bottom to top)
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(cors)
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = format!("{}:{}", self.config.server.host, self.config.server.port)
            .parse()
            .map_err(|e| crate::error::Error::Config(format!("Invalid address: {}", e)))?;

        let router = self.build_router();

        tracing::info!("Starting server on http://{}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| crate::error::Error::Config(format!("Failed to bind: {}", e)))?;

        axum::serve(listener, router)
            .await
            .map_err(|e| crate::error::Error::Internal(format!("Server error: {}", e)))?;

        Ok(())
    }

    /// Get the server address
    pub fn address(&self) -> String {
        format!("{}:{}", self.config.server.host, self.config.server.port)
    }
}

/// Liveness endpoint
async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

/// Readiness endpoint probing every downstream dependency
async fn readiness(State(state): State<AppState>) -> (StatusCode, Json<ReadyResponse>) {
    let (embedding, vector_index, object_store) = tokio::join!(
        state.embedder().health_check(),
        state.vector_index().health_check(),
        state.object_store().health_check(),
    );

    let embedding = embedding.unwrap_or(false);
    let vector_index = vector_index.unwrap_or(false);
    let object_store = object_store.unwrap_or(false);
    let ready = embedding && vector_index && object_store;

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ReadyResponse {
            ready,
            embedding,
            vector_index,
            object_store,
        }),
    )
}
