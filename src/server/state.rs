//! Application state for the ingestion and retrieval server

use std::sync::Arc;

use crate::config::Config;
use crate::error::Result;
use crate::ingestion::IngestionCoordinator;
use crate::providers::{
    EmbeddingProvider, ObjectStoreProvider, OllamaEmbedder, QdrantIndex, S3ObjectStore,
    VectorIndexProvider,
};
use crate::retrieval::Retriever;
use crate::storage::MetadataStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    /// Configuration
    config: Config,
    /// Metadata store for document and chunk records
    metadata: Arc<MetadataStore>,
    /// Embedding provider
    embedder: Arc<dyn EmbeddingProvider>,
    /// Vector index provider
    vector_index: Arc<dyn VectorIndexProvider>,
    /// Object store provider
    object_store: Arc<dyn ObjectStoreProvider>,
    /// Ingestion coordinator
    coordinator: Arc<IngestionCoordinator>,
    /// Retrieval orchestrator
    retriever: Arc<Retriever>,
}

impl AppState {
    /// Create new application state
    pub fn new(config: Config) -> Result<Self> {
        tracing::info!("Initializing application state...");

        let metadata = Arc::new(MetadataStore::new(&config.storage.database_path)?);
        tracing::info!(
            "Metadata store initialized at {}",
            config.storage.database_path.display()
        );

        let embedder: Arc<dyn EmbeddingProvider> =
            Arc::new(OllamaEmbedder::new(&config.embedding));
        tracing::info!(
            "Embedding provider initialized ({} via {})",
            config.embedding.model,
            config.embedding.base_url
        );

        let vector_index: Arc<dyn VectorIndexProvider> =
            Arc::new(QdrantIndex::new(&config.vector_index));
        tracing::info!(
            "Vector index initialized (collection '{}' at {})",
            config.vector_index.collection,
            config.vector_index.base_url
        );

        let object_store: Arc<dyn ObjectStoreProvider> =
            Arc::new(S3ObjectStore::new(&config.object_store));
        tracing::info!(
            "Object store initialized (bucket '{}' at {})",
            config.object_store.bucket,
            config.object_store.endpoint
        );

        let coordinator = Arc::new(IngestionCoordinator::new(
            &config.ingestion,
            config.embedding.batch_size,
            embedder.clone(),
            vector_index.clone(),
            object_store.clone(),
            metadata.clone(),
        ));

        let retriever = Arc::new(Retriever::new(
            embedder.clone(),
            vector_index.clone(),
            metadata.clone(),
        ));

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                metadata,
                embedder,
                vector_index,
                object_store,
                coordinator,
                retriever,
            }),
        })
    }

    /// Get configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get metadata store
    pub fn metadata(&self) -> &Arc<MetadataStore> {
        &self.inner.metadata
    }

    /// Get embedding provider
    pub fn embedder(&self) -> &Arc<dyn EmbeddingProvider> {
        &self.inner.embedder
    }

    /// Get vector index provider
    pub fn vector_index(&self) -> &Arc<dyn VectorIndexProvider> {
        &self.inner.vector_index
    }

    /// Get object store provider
    pub fn object_store(&self) -> &Arc<dyn ObjectStoreProvider> {
        &self.inner.object_store
    }

    /// Get ingestion coordinator
    pub fn coordinator(&self) -> &Arc<IngestionCoordinator> {
        &self.inner.coordinator
    }

    /// Get retrieval orchestrator
    pub fn retriever(&self) -> &Arc<Retriever> {
        &self.inner.retriever
    }
}
