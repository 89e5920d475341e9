//! Vector index provider trait for storing and searching embeddings

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::Result;

/// An embedded chunk ready for indexing
///
/// The `id` is shared with the chunk row in metadata storage so index
/// points can be deleted by the same keys later.
#[derive(Debug, Clone)]
pub struct VectorRecord {
    /// Point id
    pub id: Uuid,
    /// Embedding vector
    pub vector: Vec<f32>,
    /// Owning document
    pub document_id: Uuid,
    /// Owning user
    pub owner_id: Uuid,
    /// Zero-based position of the chunk within its document
    pub position: u32,
    /// Chunk text, carried in the point payload for retrieval
    pub text: String,
}

/// Search hit from the index
#[derive(Debug, Clone)]
pub struct VectorHit {
    /// Matched point id
    pub chunk_id: Uuid,
    /// Document the chunk belongs to
    pub document_id: Uuid,
    /// Position of the chunk within its document
    pub position: u32,
    /// Chunk text from the point payload
    pub text: String,
    /// Similarity score (higher is more similar)
    pub score: f32,
}

/// Trait for vector storage and similarity search
///
/// Implementations:
/// - `QdrantIndex`: Qdrant server over its REST API
#[async_trait]
pub trait VectorIndexProvider: Send + Sync {
    /// Insert or overwrite points
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()>;

    /// Delete points by id
    async fn delete_by_ids(&self, ids: &[Uuid]) -> Result<()>;

    /// Search for the closest points, restricted to a single owner
    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        owner_id: &Uuid,
    ) -> Result<Vec<VectorHit>>;

    /// Create the backing collection when it does not exist yet
    async fn ensure_collection(&self, dimensions: usize) -> Result<()>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
