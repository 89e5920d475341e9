//! Ingestion coordinator driving a document through the pipeline
//!
//! Stage order is fixed: extract, chunk, embed, object store, vector index,
//! metadata. The metadata commit comes last so a row only ever describes a
//! document whose bytes and vectors are already durable. Failures after a
//! side effect trigger best-effort cleanup of what was already written.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tokio::time::timeout;
use uuid::Uuid;

use crate::config::IngestionConfig;
use crate::error::{Error, Result};
use crate::providers::{
    EmbeddingProvider, ObjectStoreProvider, VectorIndexProvider, VectorRecord,
};
use crate::storage::MetadataStore;
use crate::types::{ChunkRecord, Document};

use super::chunker::TextChunker;
use super::extractor::{hash_content, ContentExtractor};

/// Coordinates one document's path through extraction, embedding, and storage
pub struct IngestionCoordinator {
    chunker: TextChunker,
    embedder: Arc<dyn EmbeddingProvider>,
    vector_index: Arc<dyn VectorIndexProvider>,
    object_store: Arc<dyn ObjectStoreProvider>,
    metadata: Arc<MetadataStore>,
    batch_size: usize,
    stage_timeout: Duration,
}

impl IngestionCoordinator {
    /// Create a new coordinator
    pub fn new(
        config: &IngestionConfig,
        batch_size: usize,
        embedder: Arc<dyn EmbeddingProvider>,
        vector_index: Arc<dyn VectorIndexProvider>,
        object_store: Arc<dyn ObjectStoreProvider>,
        metadata: Arc<MetadataStore>,
    ) -> Self {
        Self {
            chunker: TextChunker::new(config.chunk_size, config.chunk_overlap),
            embedder,
            vector_index,
            object_store,
            metadata,
            batch_size: batch_size.max(1),
            stage_timeout: Duration::from_secs(config.stage_timeout_secs),
        }
    }

    /// Ingest an uploaded document for a user
    ///
    /// Returns the committed document record. On failure nothing the caller
    /// can observe is left behind: writes that already happened are cleaned
    /// up before the error propagates.
    pub async fn ingest_document(
        &self,
        owner_id: Uuid,
        filename: &str,
        data: Bytes,
    ) -> Result<Document> {
        // Reject unsupported types before any store is touched
        let file_type = ContentExtractor::detect_type(filename)?;
        let size = data.len() as i64;

        tracing::info!(
            "[{}] Starting ingestion ({} bytes, {})",
            filename,
            size,
            file_type.display_name()
        );

        let content_hash = hash_content(&data);
        tracing::info!("[{}] Content hash {}", filename, &content_hash[..12]);

        // Extraction runs on a blocking thread; PDF and DOCX parsing is CPU work
        let extract_filename = filename.to_string();
        let extract_data = data.clone();
        let text = match timeout(
            self.stage_timeout,
            tokio::task::spawn_blocking(move || {
                ContentExtractor::extract(&extract_filename, file_type, &extract_data)
            }),
        )
        .await
        {
            Ok(Ok(result)) => result?,
            Ok(Err(e)) => {
                return Err(Error::internal(format!("Extraction task failed: {}", e)));
            }
            Err(_) => {
                tracing::error!(
                    "[{}] TIMEOUT: extraction took >{}s",
                    filename,
                    self.stage_timeout.as_secs()
                );
                return Err(Error::extraction(
                    filename,
                    format!("Extraction timeout after {}s", self.stage_timeout.as_secs()),
                ));
            }
        };

        let chunks = self.chunker.chunk(&text);
        if chunks.is_empty() {
            return Err(Error::extraction(filename, "No chunkable text content"));
        }
        tracing::info!(
            "[{}] Created {} chunks, generating embeddings...",
            filename,
            chunks.len()
        );

        let embeddings = self.embed_chunks(filename, &chunks).await?;

        tracing::info!("[{}] Storing original bytes in object store...", filename);
        let key = format!("{}/{}", owner_id, filename);
        let content_type = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string();
        let object_location = match timeout(
            self.stage_timeout,
            self.object_store.put(&key, data, &content_type),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                tracing::error!(
                    "[{}] TIMEOUT: object store put took >{}s",
                    filename,
                    self.stage_timeout.as_secs()
                );
                return Err(Error::object_store(format!(
                    "Object store timeout after {}s",
                    self.stage_timeout.as_secs()
                )));
            }
        };

        let document = Document::new(
            filename.to_string(),
            file_type,
            size,
            object_location,
            owner_id,
        );

        let mut chunk_records = Vec::with_capacity(chunks.len());
        let mut vector_records = Vec::with_capacity(chunks.len());
        for (position, (text, vector)) in chunks.into_iter().zip(embeddings).enumerate() {
            let chunk = ChunkRecord::new(position as u32, document.id);
            vector_records.push(VectorRecord {
                id: chunk.id,
                vector,
                document_id: document.id,
                owner_id,
                position: position as u32,
                text,
            });
            chunk_records.push(chunk);
        }

        tracing::info!(
            "[{}] Indexing {} chunks in vector index...",
            filename,
            vector_records.len()
        );
        let upsert_result = match timeout(
            self.stage_timeout,
            self.vector_index.upsert(&vector_records),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(Error::vector_store(format!(
                "Vector index timeout after {}s",
                self.stage_timeout.as_secs()
            ))),
        };
        if let Err(e) = upsert_result {
            tracing::error!("[{}] Vector indexing failed: {}", filename, e);
            self.cleanup_object(&key).await;
            return Err(e);
        }

        if let Err(e) = self
            .metadata
            .insert_document_with_chunks(&document, &chunk_records)
        {
            tracing::error!("[{}] Metadata commit failed: {}", filename, e);
            let chunk_ids: Vec<Uuid> = chunk_records.iter().map(|c| c.id).collect();
            self.cleanup_vectors(&chunk_ids).await;
            self.cleanup_object(&key).await;
            return Err(e);
        }

        tracing::info!(
            "[{}] COMPLETE: document {} with {} chunks",
            filename,
            document.id,
            chunk_records.len()
        );

        Ok(document)
    }

    /// Delete a user's document from all three stores
    ///
    /// Metadata goes last, so a failure part-way leaves the document listed
    /// and the delete can simply be retried.
    pub async fn delete_document(&self, owner_id: &Uuid, document_id: &Uuid) -> Result<()> {
        let document = self
            .metadata
            .get_document(owner_id, document_id)?
            .ok_or_else(|| Error::DocumentNotFound(document_id.to_string()))?;

        let chunk_ids = self.metadata.chunk_ids_for_document(document_id)?;

        tracing::info!(
            "[{}] Deleting document {} ({} chunks)",
            document.name,
            document_id,
            chunk_ids.len()
        );

        match timeout(
            self.stage_timeout,
            self.vector_index.delete_by_ids(&chunk_ids),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::vector_store(format!(
                    "Vector index timeout after {}s",
                    self.stage_timeout.as_secs()
                )));
            }
        }

        let key = object_key(&document.object_location);
        match timeout(self.stage_timeout, self.object_store.delete(key)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(Error::object_store(format!(
                    "Object store timeout after {}s",
                    self.stage_timeout.as_secs()
                )));
            }
        }

        self.metadata.delete_document(document_id)?;

        tracing::info!("[{}] Document {} deleted", document.name, document_id);
        Ok(())
    }

    async fn embed_chunks(&self, filename: &str, chunks: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(chunks.len());
        let total_batches = chunks.len().div_ceil(self.batch_size);

        for (batch_num, batch) in chunks.chunks(self.batch_size).enumerate() {
            match timeout(self.stage_timeout, self.embedder.embed_batch(batch)).await {
                Ok(Ok(batch_embeddings)) => embeddings.extend(batch_embeddings),
                Ok(Err(e)) => {
                    tracing::error!(
                        "[{}] Embedding batch {}/{} failed: {}",
                        filename,
                        batch_num + 1,
                        total_batches,
                        e
                    );
                    return Err(e);
                }
                Err(_) => {
                    tracing::error!(
                        "[{}] TIMEOUT: embedding batch {}/{} took >{}s",
                        filename,
                        batch_num + 1,
                        total_batches,
                        self.stage_timeout.as_secs()
                    );
                    return Err(Error::embedding_unavailable(format!(
                        "Embedding timeout after {}s",
                        self.stage_timeout.as_secs()
                    )));
                }
            }
        }

        Ok(embeddings)
    }

    async fn cleanup_vectors(&self, chunk_ids: &[Uuid]) {
        if let Err(e) = self.vector_index.delete_by_ids(chunk_ids).await {
            tracing::warn!(
                "Cleanup of {} vector points failed: {}",
                chunk_ids.len(),
                e
            );
        }
    }

    async fn cleanup_object(&self, key: &str) {
        if let Err(e) = self.object_store.delete(key).await {
            tracing::warn!("Cleanup of object '{}' failed: {}", key, e);
        }
    }
}

/// Strip the bucket prefix off a stored `bucket/key` location
fn object_key(location: &str) -> &str {
    location.split_once('/').map(|(_, key)| key).unwrap_or(location)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::HashMap;

    use crate::providers::VectorHit;

    struct FakeEmbedder {
        dims: usize,
        fail: bool,
    }

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
            if self.fail {
                return Err(Error::embedding_unavailable("embedder down"));
            }
            Ok(vec![0.5; self.dims])
        }

        fn dimensions(&self) -> usize {
            self.dims
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(!self.fail)
        }

        fn name(&self) -> &str {
            "fake-embedder"
        }
    }

    #[derive(Default)]
    struct FakeIndex {
        points: Mutex<HashMap<Uuid, VectorRecord>>,
        fail_upsert: bool,
    }

    #[async_trait]
    impl VectorIndexProvider for FakeIndex {
        async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
            if self.fail_upsert {
                return Err(Error::vector_store("index down"));
            }
            let mut points = self.points.lock();
            for record in records {
                points.insert(record.id, record.clone());
            }
            Ok(())
        }

        async fn delete_by_ids(&self, ids: &[Uuid]) -> Result<()> {
            let mut points = self.points.lock();
            for id in ids {
                points.remove(id);
            }
            Ok(())
        }

        async fn search(
            &self,
            _query_vector: &[f32],
            top_k: usize,
            owner_id: &Uuid,
        ) -> Result<Vec<VectorHit>> {
            let points = self.points.lock();
            let mut hits: Vec<VectorHit> = points
                .values()
                .filter(|p| p.owner_id == *owner_id)
                .map(|p| VectorHit {
                    chunk_id: p.id,
                    document_id: p.document_id,
                    position: p.position,
                    text: p.text.clone(),
                    score: 1.0,
                })
                .collect();
            hits.truncate(top_k);
            Ok(hits)
        }

        async fn ensure_collection(&self, _dimensions: usize) -> Result<()> {
            Ok(())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "fake-index"
        }
    }

    #[derive(Default)]
    struct FakeObjectStore {
        objects: Mutex<HashMap<String, Bytes>>,
        fail_put: bool,
    }

    #[async_trait]
    impl ObjectStoreProvider for FakeObjectStore {
        async fn put(&self, key: &str, data: Bytes, _content_type: &str) -> Result<String> {
            if self.fail_put {
                return Err(Error::object_store("store down"));
            }
            self.objects.lock().insert(key.to_string(), data);
            Ok(format!("test-bucket/{}", key))
        }

        async fn delete(&self, key: &str) -> Result<()> {
            self.objects.lock().remove(key);
            Ok(())
        }

        async fn ensure_bucket(&self) -> Result<()> {
            Ok(())
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        fn name(&self) -> &str {
            "fake-store"
        }
    }

    struct Fixture {
        coordinator: IngestionCoordinator,
        index: Arc<FakeIndex>,
        store: Arc<FakeObjectStore>,
        metadata: Arc<MetadataStore>,
    }

    fn fixture(embed_fail: bool, upsert_fail: bool, put_fail: bool) -> Fixture {
        let config = IngestionConfig {
            chunk_size: 50,
            chunk_overlap: 10,
            stage_timeout_secs: 5,
        };
        let index = Arc::new(FakeIndex {
            fail_upsert: upsert_fail,
            ..Default::default()
        });
        let store = Arc::new(FakeObjectStore {
            fail_put: put_fail,
            ..Default::default()
        });
        let metadata = Arc::new(MetadataStore::in_memory().unwrap());

        let coordinator = IngestionCoordinator::new(
            &config,
            4,
            Arc::new(FakeEmbedder {
                dims: 4,
                fail: embed_fail,
            }),
            index.clone(),
            store.clone(),
            metadata.clone(),
        );

        Fixture {
            coordinator,
            index,
            store,
            metadata,
        }
    }

    #[tokio::test]
    async fn test_ingest_commits_all_three_stores() {
        let f = fixture(false, false, false);
        let owner_id = Uuid::new_v4();
        let data = Bytes::from_static(b"a short note about nothing in particular");

        let document = f
            .coordinator
            .ingest_document(owner_id, "notes.txt", data.clone())
            .await
            .unwrap();

        assert_eq!(document.name, "notes.txt");
        assert_eq!(document.size, data.len() as i64);
        assert_eq!(
            document.object_location,
            format!("test-bucket/{}/notes.txt", owner_id)
        );

        let stored = f
            .metadata
            .get_document(&owner_id, &document.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, document.id);

        let chunk_ids = f.metadata.chunk_ids_for_document(&document.id).unwrap();
        assert!(!chunk_ids.is_empty());

        let points = f.index.points.lock();
        assert_eq!(points.len(), chunk_ids.len());
        for id in &chunk_ids {
            assert!(points.contains_key(id));
        }

        let objects = f.store.objects.lock();
        assert_eq!(
            objects.get(&format!("{}/notes.txt", owner_id)),
            Some(&data)
        );
    }

    #[tokio::test]
    async fn test_ingest_records_chunk_positions_in_order() {
        let f = fixture(false, false, false);
        let owner_id = Uuid::new_v4();
        let text = format!(
            "{}\n\n{}\n\n{}",
            "first paragraph with words".repeat(2),
            "second paragraph with words".repeat(2),
            "third paragraph with words".repeat(2)
        );

        let document = f
            .coordinator
            .ingest_document(owner_id, "multi.txt", Bytes::from(text))
            .await
            .unwrap();

        let chunk_ids = f.metadata.chunk_ids_for_document(&document.id).unwrap();
        assert!(chunk_ids.len() > 1);

        let points = f.index.points.lock();
        for (position, id) in chunk_ids.iter().enumerate() {
            let point = points.get(id).unwrap();
            assert_eq!(point.position, position as u32);
            assert_eq!(point.document_id, document.id);
            assert_eq!(point.owner_id, owner_id);
        }
    }

    #[tokio::test]
    async fn test_unsupported_type_is_rejected_before_any_write() {
        let f = fixture(false, false, false);

        let err = f
            .coordinator
            .ingest_document(Uuid::new_v4(), "binary.exe", Bytes::from_static(b"MZ"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::UnsupportedFileType(_)));
        assert!(f.store.objects.lock().is_empty());
        assert!(f.index.points.lock().is_empty());
        assert_eq!(f.metadata.document_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_embedding_failure_leaves_no_artifacts() {
        let f = fixture(true, false, false);

        let err = f
            .coordinator
            .ingest_document(Uuid::new_v4(), "notes.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::EmbeddingUnavailable(_)));
        assert!(f.store.objects.lock().is_empty());
        assert!(f.index.points.lock().is_empty());
        assert_eq!(f.metadata.document_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_vector_failure_cleans_up_stored_object() {
        let f = fixture(false, true, false);

        let err = f
            .coordinator
            .ingest_document(Uuid::new_v4(), "notes.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::VectorStore(_)));
        assert!(f.store.objects.lock().is_empty());
        assert_eq!(f.metadata.document_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_object_store_failure_stops_before_indexing() {
        let f = fixture(false, false, true);

        let err = f
            .coordinator
            .ingest_document(Uuid::new_v4(), "notes.txt", Bytes::from_static(b"hello"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ObjectStore(_)));
        assert!(f.index.points.lock().is_empty());
        assert_eq!(f.metadata.document_count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_delete_document_removes_everything() {
        let f = fixture(false, false, false);
        let owner_id = Uuid::new_v4();

        let document = f
            .coordinator
            .ingest_document(owner_id, "notes.txt", Bytes::from_static(b"hello world"))
            .await
            .unwrap();

        f.coordinator
            .delete_document(&owner_id, &document.id)
            .await
            .unwrap();

        assert!(f
            .metadata
            .get_document(&owner_id, &document.id)
            .unwrap()
            .is_none());
        assert!(f.index.points.lock().is_empty());
        assert!(f.store.objects.lock().is_empty());
    }

    #[tokio::test]
    async fn test_delete_is_owner_scoped() {
        let f = fixture(false, false, false);
        let owner_id = Uuid::new_v4();

        let document = f
            .coordinator
            .ingest_document(owner_id, "notes.txt", Bytes::from_static(b"hello world"))
            .await
            .unwrap();

        let err = f
            .coordinator
            .delete_document(&Uuid::new_v4(), &document.id)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DocumentNotFound(_)));

        // The document is untouched
        assert!(f
            .metadata
            .get_document(&owner_id, &document.id)
            .unwrap()
            .is_some());
        assert!(!f.index.points.lock().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unknown_document_is_not_found() {
        let f = fixture(false, false, false);

        let err = f
            .coordinator
            .delete_document(&Uuid::new_v4(), &Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::DocumentNotFound(_)));
    }

    #[test]
    fn test_object_key_strips_bucket() {
        assert_eq!(object_key("documents/owner/file.txt"), "owner/file.txt");
        assert_eq!(object_key("bare-key"), "bare-key");
    }
}
