//! Response types for the HTTP surface

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::Document;

/// A retrieved passage with provenance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Passage {
    /// Chunk ID
    pub chunk_id: Uuid,
    /// Document ID
    pub document_id: Uuid,
    /// Source document name
    pub document_name: String,
    /// Chunk ordinal within its document
    pub position: u32,
    /// Passage text
    pub text: String,
    /// Cosine similarity score
    pub score: f32,
}

/// Response from a retrieval request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveResponse {
    /// Passages ordered by descending score
    pub passages: Vec<Passage>,
    /// Composed context string (if requested)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl RetrieveResponse {
    /// Create a new retrieval response
    pub fn new(passages: Vec<Passage>, context: Option<String>, processing_time_ms: u64) -> Self {
        Self {
            passages,
            context,
            processing_time_ms,
        }
    }
}

/// Response listing a user's documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentListResponse {
    /// Documents, newest first
    pub documents: Vec<Document>,
    /// Total count
    pub count: usize,
}

impl DocumentListResponse {
    /// Create a list response from documents
    pub fn new(documents: Vec<Document>) -> Self {
        let count = documents.len();
        Self { documents, count }
    }
}

/// Per-dependency readiness report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadyResponse {
    /// True when every dependency is reachable
    pub ready: bool,
    /// Embedding service reachable
    pub embedding: bool,
    /// Vector index reachable
    pub vector_index: bool,
    /// Object store reachable
    pub object_store: bool,
}
