//! API routes for the ingestion and retrieval server

pub mod documents;
pub mod retrieve;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use crate::server::state::AppState;

/// Build all API routes
pub fn api_routes(max_upload_size: usize) -> Router<AppState> {
    Router::new()
        // Document management - upload gets a larger body limit
        .route(
            "/users/:user_id/documents",
            post(documents::upload_document).layer(DefaultBodyLimit::max(max_upload_size)),
        )
        .route("/users/:user_id/documents", get(documents::list_documents))
        .route(
            "/users/:user_id/documents/:document_id",
            delete(documents::delete_document),
        )
        // Retrieval
        .route("/users/:user_id/retrieve", post(retrieve::retrieve))
        // Info
        .route("/info", get(info))
}

/// API info endpoint
async fn info() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "name": "notebook-rag",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Document ingestion and retrieval pipeline for grounded question answering",
        "endpoints": {
            "POST /api/users/:user_id/documents": "Upload and ingest a document",
            "GET /api/users/:user_id/documents": "List the user's documents",
            "DELETE /api/users/:user_id/documents/:document_id": "Delete a document",
            "POST /api/users/:user_id/retrieve": "Retrieve ranked passages for a query"
        },
        "supported_file_types": ["pdf", "doc", "docx", "md", "markdown", "txt"]
    }))
}
