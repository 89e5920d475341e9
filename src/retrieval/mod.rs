//! Retrieval orchestration for owner-scoped similarity search
//!
//! Embeds the query, searches the vector index restricted to one owner, and
//! resolves hits to document metadata for provenance.

use std::collections::HashMap;
use std::sync::Arc;

use uuid::Uuid;

use crate::error::Result;
use crate::providers::{EmbeddingProvider, VectorIndexProvider};
use crate::storage::MetadataStore;
use crate::types::Passage;

/// Retrieves ranked passages for a query
pub struct Retriever {
    embedder: Arc<dyn EmbeddingProvider>,
    vector_index: Arc<dyn VectorIndexProvider>,
    metadata: Arc<MetadataStore>,
}

impl Retriever {
    /// Create a new retriever
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        vector_index: Arc<dyn VectorIndexProvider>,
        metadata: Arc<MetadataStore>,
    ) -> Self {
        Self {
            embedder,
            vector_index,
            metadata,
        }
    }

    /// Retrieve the closest passages for a query, scoped to one owner
    ///
    /// Returns up to `top_k` passages ordered by descending score. Fewer
    /// come back when the owner's index holds fewer entries. Hits whose
    /// document no longer exists in metadata are dropped.
    pub async fn retrieve(
        &self,
        owner_id: &Uuid,
        query: &str,
        top_k: usize,
    ) -> Result<Vec<Passage>> {
        let query_vector = self.embedder.embed(query).await?;

        let hits = self
            .vector_index
            .search(&query_vector, top_k, owner_id)
            .await?;

        if hits.is_empty() {
            return Ok(Vec::new());
        }

        let document_ids: Vec<Uuid> = hits.iter().map(|h| h.document_id).collect();
        let names: HashMap<Uuid, String> = self
            .metadata
            .document_names(owner_id, &document_ids)?
            .into_iter()
            .collect();

        let mut passages: Vec<Passage> = hits
            .into_iter()
            .filter_map(|hit| match names.get(&hit.document_id) {
                Some(name) => Some(Passage {
                    chunk_id: hit.chunk_id,
                    document_id: hit.document_id,
                    document_name: name.clone(),
                    position: hit.position,
                    text: hit.text,
                    score: hit.score,
                }),
                None => {
                    tracing::warn!(
                        "Dropping hit {} for unknown document {}",
                        hit.chunk_id,
                        hit.document_id
                    );
                    None
                }
            })
            .collect();

        passages.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Ok(passages)
    }
}

/// Join passage texts in ranked order, separated by blank lines
///
/// Pure assembly over an already-ranked sequence; the generation step that
/// consumes the result lives outside this crate.
pub fn assemble_context(passages: &[Passage]) -> String {
    passages
        .iter()
        .map(|p| p.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n")
}
