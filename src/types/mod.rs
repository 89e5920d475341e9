//! Core types for the ingestion and retrieval pipeline

pub mod document;
pub mod query;
pub mod response;

pub use document::{ChunkRecord, Document, FileType, UNKNOWN_SIZE};
pub use query::RetrieveRequest;
pub use response::{DocumentListResponse, Passage, ReadyResponse, RetrieveResponse};
