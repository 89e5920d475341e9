//! Configuration for the ingestion and retrieval service

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};

/// Environment variable pointing at an alternative config file
pub const CONFIG_PATH_ENV: &str = "NOTEBOOK_RAG_CONFIG";

/// Main service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,
    /// Ingestion pipeline configuration
    #[serde(default)]
    pub ingestion: IngestionConfig,
    /// Embedding service configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Vector index configuration
    #[serde(default)]
    pub vector_index: VectorIndexConfig,
    /// Object store configuration
    #[serde(default)]
    pub object_store: ObjectStoreConfig,
    /// Metadata store configuration
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Config {
    /// Load configuration from the file named by `NOTEBOOK_RAG_CONFIG`, or the
    /// default location; falls back to defaults when no file exists.
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| Self::default_path());

        if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            let config: Self = toml::from_str(&content)
                .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
            tracing::info!("Loaded configuration from {}", path.display());
            config.validate()?;
            Ok(config)
        } else {
            tracing::info!(
                "No configuration file at {}, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    /// Default config file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("notebook-rag")
            .join("config.toml")
    }

    /// Reject settings that cannot produce a working pipeline
    pub fn validate(&self) -> Result<()> {
        if self.ingestion.chunk_overlap >= self.ingestion.chunk_size {
            return Err(Error::Config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.ingestion.chunk_overlap, self.ingestion.chunk_size
            )));
        }
        if self.embedding.dimensions == 0 {
            return Err(Error::Config("embedding dimensions must be non-zero".to_string()));
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Ingestion pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Target chunk size in characters
    pub chunk_size: usize,
    /// Overlap between chunks in characters (must stay below chunk_size)
    pub chunk_overlap: usize,
    /// Deadline for each store call within one ingestion, in seconds
    pub stage_timeout_secs: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            stage_timeout_secs: 120,
        }
    }
}

/// Embedding service (Ollama) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Ollama base URL
    pub base_url: String,
    /// Embedding model name
    pub model: String,
    /// Embedding dimensions (1024 for mxbai-embed-large)
    pub dimensions: usize,
    /// Passages per request batch
    pub batch_size: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
    /// Number of retries for failed requests
    pub max_retries: u32,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "mxbai-embed-large".to_string(),
            dimensions: 1024,
            batch_size: 32,
            timeout_secs: 60,
            max_retries: 2,
        }
    }
}

/// Vector index (Qdrant) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorIndexConfig {
    /// Qdrant base URL
    pub base_url: String,
    /// Collection name
    pub collection: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for VectorIndexConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:6333".to_string(),
            collection: "chunks".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Object store (S3-compatible) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    /// Endpoint URL (MinIO in development)
    pub endpoint: String,
    /// Region used for request signing
    pub region: String,
    /// Bucket holding original documents
    pub bucket: String,
    /// Access key id
    pub access_key: String,
    /// Secret access key
    pub secret_key: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for ObjectStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:9000".to_string(),
            region: "us-east-1".to_string(),
            bucket: "documents".to_string(),
            access_key: "minioadmin".to_string(),
            secret_key: "minioadmin".to_string(),
            timeout_secs: 30,
        }
    }
}

/// Metadata store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite database path
    pub database_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let database_path = dirs::data_local_dir()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from("/")))
            .join("notebook-rag")
            .join("metadata.db");

        Self { database_path }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overlap_must_stay_below_chunk_size() {
        let mut config = Config::default();
        config.ingestion.chunk_overlap = config.ingestion.chunk_size;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            host = "127.0.0.1"
            port = 9090
            max_upload_size = 1048576

            [embedding]
            base_url = "http://embed:11434"
            model = "mxbai-embed-large"
            dimensions = 1024
            batch_size = 16
            timeout_secs = 30
            max_retries = 1
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 9090);
        assert_eq!(config.embedding.batch_size, 16);
        // Unlisted sections keep their defaults
        assert_eq!(config.vector_index.collection, "chunks");
        assert_eq!(config.ingestion.chunk_size, 1000);
    }
}
