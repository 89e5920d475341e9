//! Document ingestion pipeline with multi-format extraction and chunking

mod chunker;
mod coordinator;
mod extractor;

pub use chunker::TextChunker;
pub use coordinator::IngestionCoordinator;
pub use extractor::{hash_content, ContentExtractor};
