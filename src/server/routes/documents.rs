//! Document management endpoints

use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::server::state::AppState;
use crate::types::{Document, DocumentListResponse};

/// POST /api/users/:user_id/documents - Upload and ingest a document
pub async fn upload_document(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<Document>)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::internal(format!("Failed to read multipart field: {}", e)))?
    {
        let filename = match field.file_name() {
            Some(name) => name.to_string(),
            // Not a file part; skip form fields
            None => continue,
        };

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::internal(format!("Failed to read '{}': {}", filename, e)))?;

        tracing::info!(
            "Upload from user {}: {} ({} bytes)",
            user_id,
            filename,
            data.len()
        );

        let document = state
            .coordinator()
            .ingest_document(user_id, &filename, data)
            .await?;

        return Ok((StatusCode::CREATED, Json(document)));
    }

    Err(Error::Config(
        "Upload must include a file field with a filename".to_string(),
    ))
}

/// GET /api/users/:user_id/documents - List the user's documents, newest first
pub async fn list_documents(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<DocumentListResponse>> {
    let documents = state.metadata().list_documents(&user_id)?;
    Ok(Json(DocumentListResponse::new(documents)))
}

/// DELETE /api/users/:user_id/documents/:document_id - Delete a document
///
/// Responds 404 for both unknown documents and documents owned by someone
/// else, so callers cannot probe for other users' document ids.
pub async fn delete_document(
    State(state): State<AppState>,
    Path((user_id, document_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    state
        .coordinator()
        .delete_document(&user_id, &document_id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
