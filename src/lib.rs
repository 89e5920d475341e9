//! notebook-rag: Document ingestion and retrieval pipeline for grounded question answering
//!
//! This crate turns uploaded documents into retrievable passages: content is
//! extracted, chunked with overlap, embedded, and persisted across an object
//! store (original bytes), a vector index (embeddings), and a relational
//! metadata store (ownership). Retrieval embeds a query and returns ranked,
//! owner-scoped passages for a downstream generator.

pub mod config;
pub mod error;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use ingestion::IngestionCoordinator;
pub use retrieval::Retriever;
pub use types::{
    document::{ChunkRecord, Document, FileType},
    query::RetrieveRequest,
    response::{Passage, RetrieveResponse},
};
