//! Qdrant vector index provider over the Qdrant REST API

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::VectorIndexConfig;
use crate::error::{Error, Result};

use super::vector_index::{VectorHit, VectorIndexProvider, VectorRecord};

/// Qdrant REST client
pub struct QdrantIndex {
    /// HTTP client
    client: Client,
    /// Configuration
    config: VectorIndexConfig,
}

#[derive(Serialize)]
struct UpsertPointsRequest {
    points: Vec<PointStruct>,
}

#[derive(Serialize, Clone)]
struct PointStruct {
    id: String,
    vector: Vec<f32>,
    payload: PointPayload,
}

#[derive(Serialize, Deserialize, Clone)]
struct PointPayload {
    document_id: String,
    owner_id: String,
    position: u32,
    text: String,
}

#[derive(Serialize)]
struct DeletePointsRequest {
    points: Vec<String>,
}

#[derive(Serialize)]
struct SearchRequest {
    vector: Vec<f32>,
    limit: usize,
    with_payload: bool,
    filter: SearchFilter,
}

#[derive(Serialize)]
struct SearchFilter {
    must: Vec<FieldCondition>,
}

#[derive(Serialize)]
struct FieldCondition {
    key: String,
    #[serde(rename = "match")]
    matches: MatchValue,
}

#[derive(Serialize)]
struct MatchValue {
    value: String,
}

#[derive(Deserialize)]
struct SearchResponse {
    result: Vec<ScoredPoint>,
}

#[derive(Deserialize)]
struct ScoredPoint {
    id: String,
    score: f32,
    payload: Option<PointPayload>,
}

#[derive(Serialize)]
struct CreateCollectionRequest {
    vectors: VectorParams,
}

#[derive(Serialize)]
struct VectorParams {
    size: usize,
    distance: String,
}

impl QdrantIndex {
    /// Create a new Qdrant client
    pub fn new(config: &VectorIndexConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .pool_max_idle_per_host(5)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            config: config.clone(),
        }
    }

    fn collection_url(&self) -> String {
        format!(
            "{}/collections/{}",
            self.config.base_url, self.config.collection
        )
    }

    fn record_to_point(record: &VectorRecord) -> PointStruct {
        PointStruct {
            id: record.id.to_string(),
            vector: record.vector.clone(),
            payload: PointPayload {
                document_id: record.document_id.to_string(),
                owner_id: record.owner_id.to_string(),
                position: record.position,
                text: record.text.clone(),
            },
        }
    }
}

#[async_trait]
impl VectorIndexProvider for QdrantIndex {
    async fn upsert(&self, records: &[VectorRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        // wait=true makes the write durable before the response returns
        let url = format!("{}/points?wait=true", self.collection_url());
        let points: Vec<PointStruct> = records.iter().map(Self::record_to_point).collect();

        // Batch upserts (max 100 points per request)
        for batch in points.chunks(100) {
            let request = UpsertPointsRequest {
                points: batch.to_vec(),
            };

            let response = self
                .client
                .put(&url)
                .json(&request)
                .send()
                .await
                .map_err(|e| Error::vector_store(format!("Qdrant upsert failed: {}", e)))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::vector_store(format!(
                    "Qdrant upsert failed ({}): {}",
                    status, body
                )));
            }
        }

        Ok(())
    }

    async fn delete_by_ids(&self, ids: &[Uuid]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }

        let url = format!("{}/points/delete?wait=true", self.collection_url());
        let request = DeletePointsRequest {
            points: ids.iter().map(|id| id.to_string()).collect(),
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("Qdrant delete failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_store(format!(
                "Qdrant delete failed ({}): {}",
                status, body
            )));
        }

        Ok(())
    }

    async fn search(
        &self,
        query_vector: &[f32],
        top_k: usize,
        owner_id: &Uuid,
    ) -> Result<Vec<VectorHit>> {
        let url = format!("{}/points/search", self.collection_url());

        let request = SearchRequest {
            vector: query_vector.to_vec(),
            limit: top_k,
            with_payload: true,
            filter: SearchFilter {
                must: vec![FieldCondition {
                    key: "owner_id".to_string(),
                    matches: MatchValue {
                        value: owner_id.to_string(),
                    },
                }],
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("Qdrant search failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_store(format!(
                "Qdrant search failed ({}): {}",
                status, body
            )));
        }

        let search_response: SearchResponse = response
            .json()
            .await
            .map_err(|e| Error::vector_store(format!("Failed to parse Qdrant response: {}", e)))?;

        let mut hits = Vec::new();
        for point in search_response.result {
            let chunk_id = match Uuid::parse_str(&point.id) {
                Ok(id) => id,
                Err(_) => {
                    tracing::warn!("Invalid UUID point id: {}", point.id);
                    continue;
                }
            };

            let payload = match point.payload {
                Some(payload) => payload,
                None => {
                    tracing::warn!("Qdrant point {} returned without payload", point.id);
                    continue;
                }
            };

            let document_id = match Uuid::parse_str(&payload.document_id) {
                Ok(id) => id,
                Err(_) => {
                    tracing::warn!("Invalid document_id in payload of point {}", point.id);
                    continue;
                }
            };

            hits.push(VectorHit {
                chunk_id,
                document_id,
                position: payload.position,
                text: payload.text,
                score: point.score,
            });
        }

        tracing::debug!("Qdrant search returned {} hits", hits.len());
        Ok(hits)
    }

    async fn ensure_collection(&self, dimensions: usize) -> Result<()> {
        let url = self.collection_url();

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("Qdrant collection check failed: {}", e)))?;

        if response.status().is_success() {
            return Ok(());
        }

        if response.status() != reqwest::StatusCode::NOT_FOUND {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_store(format!(
                "Qdrant collection check failed ({}): {}",
                status, body
            )));
        }

        tracing::info!(
            "Creating Qdrant collection '{}' with {} dimensions",
            self.config.collection,
            dimensions
        );

        let request = CreateCollectionRequest {
            vectors: VectorParams {
                size: dimensions,
                distance: "Cosine".to_string(),
            },
        };

        let response = self
            .client
            .put(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::vector_store(format!("Qdrant collection create failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::vector_store(format!(
                "Qdrant collection create failed ({}): {}",
                status, body
            )));
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/healthz", self.config.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "qdrant"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn test_config(base_url: String) -> VectorIndexConfig {
        VectorIndexConfig {
            base_url,
            ..Default::default()
        }
    }

    fn test_record(id: Uuid, owner_id: Uuid) -> VectorRecord {
        VectorRecord {
            id,
            vector: vec![0.1, 0.2],
            document_id: Uuid::new_v4(),
            owner_id,
            position: 0,
            text: "chunk text".to_string(),
        }
    }

    #[tokio::test]
    async fn test_upsert_puts_points() {
        let server = MockServer::start_async().await;
        let id = Uuid::new_v4();
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/chunks/points")
                    .query_param("wait", "true")
                    .body_contains(id.to_string());
                then.status(200).json_body(json!({"status": "ok"}));
            })
            .await;

        let index = QdrantIndex::new(&test_config(server.base_url()));
        index
            .upsert(&[test_record(id, Uuid::new_v4())])
            .await
            .unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_upsert_surfaces_server_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/chunks/points");
                then.status(500).body("internal error");
            })
            .await;

        let index = QdrantIndex::new(&test_config(server.base_url()));
        let err = index
            .upsert(&[test_record(Uuid::new_v4(), Uuid::new_v4())])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::VectorStore(_)));
    }

    #[tokio::test]
    async fn test_search_filters_by_owner_and_parses_hits() {
        let server = MockServer::start_async().await;
        let owner_id = Uuid::new_v4();
        let chunk_id = Uuid::new_v4();
        let document_id = Uuid::new_v4();

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/chunks/points/search")
                    .json_body_partial(format!(
                        r#"{{"filter": {{"must": [{{"key": "owner_id", "match": {{"value": "{}"}}}}]}}}}"#,
                        owner_id
                    ));
                then.status(200).json_body(json!({
                    "result": [{
                        "id": chunk_id.to_string(),
                        "score": 0.87,
                        "payload": {
                            "document_id": document_id.to_string(),
                            "owner_id": owner_id.to_string(),
                            "position": 2,
                            "text": "matched chunk"
                        }
                    }]
                }));
            })
            .await;

        let index = QdrantIndex::new(&test_config(server.base_url()));
        let hits = index.search(&[0.5, 0.5], 3, &owner_id).await.unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, chunk_id);
        assert_eq!(hits[0].document_id, document_id);
        assert_eq!(hits[0].position, 2);
        assert_eq!(hits[0].text, "matched chunk");
        assert!((hits[0].score - 0.87).abs() < f32::EPSILON);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_search_skips_points_without_payload() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/collections/chunks/points/search");
                then.status(200).json_body(json!({
                    "result": [{"id": Uuid::new_v4().to_string(), "score": 0.5}]
                }));
            })
            .await;

        let index = QdrantIndex::new(&test_config(server.base_url()));
        let hits = index.search(&[0.5], 3, &Uuid::new_v4()).await.unwrap();

        assert!(hits.is_empty());
    }

    #[tokio::test]
    async fn test_delete_by_ids_posts_points() {
        let server = MockServer::start_async().await;
        let id = Uuid::new_v4();
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/collections/chunks/points/delete")
                    .query_param("wait", "true")
                    .body_contains(id.to_string());
                then.status(200).json_body(json!({"status": "ok"}));
            })
            .await;

        let index = QdrantIndex::new(&test_config(server.base_url()));
        index.delete_by_ids(&[id]).await.unwrap();

        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_ensure_collection_creates_missing_collection() {
        let server = MockServer::start_async().await;
        let check = server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/chunks");
                then.status(404);
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/collections/chunks")
                    .json_body_partial(r#"{"vectors": {"size": 8, "distance": "Cosine"}}"#);
                then.status(200).json_body(json!({"status": "ok"}));
            })
            .await;

        let index = QdrantIndex::new(&test_config(server.base_url()));
        index.ensure_collection(8).await.unwrap();

        check.assert_async().await;
        create.assert_async().await;
    }

    #[tokio::test]
    async fn test_ensure_collection_skips_existing_collection() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/collections/chunks");
                then.status(200).json_body(json!({"result": {}}));
            })
            .await;
        let create = server
            .mock_async(|when, then| {
                when.method(PUT).path("/collections/chunks");
                then.status(200);
            })
            .await;

        let index = QdrantIndex::new(&test_config(server.base_url()));
        index.ensure_collection(8).await.unwrap();

        assert_eq!(create.hits_async().await, 0);
    }
}
