//! Error types for the ingestion and retrieval pipeline

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline errors
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Extraction failed on malformed input
    #[error("Failed to extract '{filename}': {message}")]
    Extraction { filename: String, message: String },

    /// Unsupported file type
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// Embedding service unreachable after retries
    #[error("Embedding service unavailable: {0}")]
    EmbeddingUnavailable(String),

    /// Object store request failed
    #[error("Object store error: {0}")]
    ObjectStore(String),

    /// Vector index request failed
    #[error("Vector index error: {0}")]
    VectorStore(String),

    /// Relational constraint violation at metadata commit
    #[error("Metadata conflict: {0}")]
    MetadataConflict(String),

    /// Document not found (or not owned by the caller)
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create an extraction error
    pub fn extraction(filename: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Extraction {
            filename: filename.into(),
            message: message.into(),
        }
    }

    /// Create an embedding-unavailable error
    pub fn embedding_unavailable(message: impl Into<String>) -> Self {
        Self::EmbeddingUnavailable(message.into())
    }

    /// Create an object store error
    pub fn object_store(message: impl Into<String>) -> Self {
        Self::ObjectStore(message.into())
    }

    /// Create a vector index error
    pub fn vector_store(message: impl Into<String>) -> Self {
        Self::VectorStore(message.into())
    }

    /// Create a metadata conflict error
    pub fn metadata_conflict(message: impl Into<String>) -> Self {
        Self::MetadataConflict(message.into())
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // 4xx messages are actionable and echoed to the caller; 5xx detail
        // stays in the log and the body carries a generic message.
        let (status, error_type, message) = match &self {
            Error::Config(msg) => (StatusCode::BAD_REQUEST, "config_error", msg.clone()),
            Error::Extraction { filename, message } => (
                StatusCode::BAD_REQUEST,
                "extraction_error",
                format!("Failed to extract '{}': {}", filename, message),
            ),
            Error::UnsupportedFileType(ext) => (
                StatusCode::BAD_REQUEST,
                "unsupported_type",
                format!("Unsupported file type: {}", ext),
            ),
            Error::EmbeddingUnavailable(msg) => {
                tracing::error!("Embedding service unavailable: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "embedding_unavailable",
                    "Embedding service is unavailable".to_string(),
                )
            }
            Error::ObjectStore(msg) => {
                tracing::error!("Object store failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "object_store_error",
                    "Object storage request failed".to_string(),
                )
            }
            Error::VectorStore(msg) => {
                tracing::error!("Vector index failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    "vector_store_error",
                    "Vector index request failed".to_string(),
                )
            }
            Error::MetadataConflict(msg) => {
                tracing::error!("Metadata commit failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "metadata_conflict",
                    "Metadata commit failed".to_string(),
                )
            }
            Error::DocumentNotFound(id) => (
                StatusCode::NOT_FOUND,
                "not_found",
                format!("Document not found: {}", id),
            ),
            Error::Io(err) => {
                tracing::error!("IO failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "io_error",
                    "Internal server error".to_string(),
                )
            }
            Error::Json(err) => (StatusCode::BAD_REQUEST, "json_error", err.to_string()),
            Error::Http(err) => {
                tracing::error!("Upstream request failed: {}", err);
                (
                    StatusCode::BAD_GATEWAY,
                    "http_error",
                    "Upstream request failed".to_string(),
                )
            }
            Error::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "type": error_type,
                "message": message,
            }
        }));

        (status, body).into_response()
    }
}
