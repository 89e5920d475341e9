//! Provider abstractions for embeddings, vector indexing, and object storage
//!
//! This module provides trait-based abstractions over the external services
//! the pipeline depends on, with HTTP implementations for Ollama, Qdrant,
//! and S3-compatible stores.

pub mod embedding;
pub mod object_store;
pub mod ollama;
pub mod qdrant;
pub mod s3;
pub mod vector_index;

pub use embedding::EmbeddingProvider;
pub use object_store::ObjectStoreProvider;
pub use ollama::OllamaEmbedder;
pub use qdrant::QdrantIndex;
pub use s3::S3ObjectStore;
pub use vector_index::{VectorHit, VectorIndexProvider, VectorRecord};
