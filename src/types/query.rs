//! Retrieval request types

use serde::{Deserialize, Serialize};

/// Retrieval request against a user's indexed documents
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrieveRequest {
    /// Free-text query
    pub query: String,

    /// Number of passages to retrieve (default: 3)
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Include the composed context string in the response (default: false)
    #[serde(default)]
    pub include_context: bool,
}

fn default_top_k() -> usize {
    3
}

impl RetrieveRequest {
    /// Create a new retrieval request with default options
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            top_k: default_top_k(),
            include_context: false,
        }
    }

    /// Set the number of passages to retrieve
    pub fn with_top_k(mut self, k: usize) -> Self {
        self.top_k = k;
        self
    }
}
