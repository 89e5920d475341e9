//! Object store provider trait for raw document bytes

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;

/// Trait for durable object storage
///
/// Implementations:
/// - `S3ObjectStore`: S3-compatible store (MinIO, AWS S3)
#[async_trait]
pub trait ObjectStoreProvider: Send + Sync {
    /// Store an object and return its location
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String>;

    /// Delete an object
    async fn delete(&self, key: &str) -> Result<()>;

    /// Create the backing bucket when it does not exist yet
    async fn ensure_bucket(&self) -> Result<()>;

    /// Check if the provider is healthy
    async fn health_check(&self) -> Result<bool>;

    /// Get provider name for logging
    fn name(&self) -> &str;
}
