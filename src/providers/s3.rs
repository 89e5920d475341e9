//! S3-compatible object store provider
//!
//! Talks to MinIO or AWS S3 through the S3 REST API with AWS Signature V4
//! authentication, using pure-Rust signing (`hmac` + `sha2`). Objects are
//! addressed path-style (`/{bucket}/{key}`), which is what MinIO expects.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::Client;
use sha2::{Digest, Sha256};

use crate::config::ObjectStoreConfig;
use crate::error::{Error, Result};

use super::object_store::ObjectStoreProvider;

type HmacSha256 = Hmac<Sha256>;

/// S3 REST client with SigV4 request signing
pub struct S3ObjectStore {
    /// HTTP client
    client: Client,
    /// Configuration
    config: ObjectStoreConfig,
}

/// Headers computed for one signed request
struct SignedRequest {
    authorization: String,
    amz_date: String,
    payload_hash: String,
}

impl S3ObjectStore {
    /// Create a new S3 object store client
    pub fn new(config: &ObjectStoreConfig) -> Self {
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

    fn host(&self) -> String {
        self.config
            .endpoint
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/')
            .to_string()
    }

    fn scheme(&self) -> &str {
        if self.config.endpoint.starts_with("https://") {
            "https"
        } else {
            "http"
        }
    }

    /// URL and canonical URI for an object key
    fn object_url(&self, key: &str) -> (String, String) {
        let encoded_key = key.split('/').map(uri_encode).collect::<Vec<_>>().join("/");
        let canonical_uri = format!("/{}/{}", self.config.bucket, encoded_key);
        let url = format!("{}://{}{}", self.scheme(), self.host(), canonical_uri);
        (url, canonical_uri)
    }

    /// URL and canonical URI for the bucket itself
    fn bucket_url(&self) -> (String, String) {
        let canonical_uri = format!("/{}", self.config.bucket);
        let url = format!("{}://{}{}", self.scheme(), self.host(), canonical_uri);
        (url, canonical_uri)
    }

    /// Sign a request with an empty canonical query string
    fn sign(&self, method: &str, canonical_uri: &str, payload_hash: &str) -> SignedRequest {
        let now = Utc::now();
        let date_stamp = now.format("%Y%m%d").to_string();
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let host = self.host();

        let canonical_headers = format!(
            "host:{}\nx-amz-content-sha256:{}\nx-amz-date:{}\n",
            host, payload_hash, amz_date
        );
        let signed_headers = "host;x-amz-content-sha256;x-amz-date";

        let canonical_request = format!(
            "{}\n{}\n\n{}\n{}\n{}",
            method, canonical_uri, canonical_headers, signed_headers, payload_hash
        );

        let credential_scope = format!("{}/{}/s3/aws4_request", date_stamp, self.config.region);
        let string_to_sign = format!(
            "AWS4-HMAC-SHA256\n{}\n{}\n{}",
            amz_date,
            credential_scope,
            hex_sha256(canonical_request.as_bytes())
        );

        let signing_key = derive_signing_key(
            &self.config.secret_key,
            &date_stamp,
            &self.config.region,
            "s3",
        );
        let signature = hex_hmac_sha256(&signing_key, string_to_sign.as_bytes());

        let authorization = format!(
            "AWS4-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.config.access_key, credential_scope, signed_headers, signature
        );

        SignedRequest {
            authorization,
            amz_date,
            payload_hash: payload_hash.to_string(),
        }
    }
}

#[async_trait]
impl ObjectStoreProvider for S3ObjectStore {
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<String> {
        let (url, canonical_uri) = self.object_url(key);
        let size = data.len();
        let payload_hash = hex_sha256(&data);
        let signed = self.sign("PUT", &canonical_uri, &payload_hash);

        let response = self
            .client
            .put(&url)
            .header("Authorization", &signed.authorization)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("x-amz-date", &signed.amz_date)
            .header("Content-Type", content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| Error::object_store(format!("S3 put failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::object_store(format!(
                "S3 put failed ({}): {}",
                status, body
            )));
        }

        tracing::debug!("Stored object '{}' ({} bytes)", key, size);
        Ok(format!("{}/{}", self.config.bucket, key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let (url, canonical_uri) = self.object_url(key);
        let payload_hash = hex_sha256(b"");
        let signed = self.sign("DELETE", &canonical_uri, &payload_hash);

        let response = self
            .client
            .delete(&url)
            .header("Authorization", &signed.authorization)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("x-amz-date", &signed.amz_date)
            .send()
            .await
            .map_err(|e| Error::object_store(format!("S3 delete failed: {}", e)))?;

        // S3 answers 204 whether or not the key existed
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::object_store(format!(
                "S3 delete failed ({}): {}",
                status, body
            )));
        }

        Ok(())
    }

    async fn ensure_bucket(&self) -> Result<()> {
        let (url, canonical_uri) = self.bucket_url();
        let payload_hash = hex_sha256(b"");
        let signed = self.sign("HEAD", &canonical_uri, &payload_hash);

        let response = self
            .client
            .head(&url)
            .header("Authorization", &signed.authorization)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("x-amz-date", &signed.amz_date)
            .send()
            .await
            .map_err(|e| Error::object_store(format!("S3 bucket check failed: {}", e)))?;

        if response.status().is_success() {
            return Ok(());
        }

        if response.status() != reqwest::StatusCode::NOT_FOUND {
            return Err(Error::object_store(format!(
                "S3 bucket check failed ({})",
                response.status()
            )));
        }

        tracing::info!("Creating S3 bucket '{}'", self.config.bucket);

        let signed = self.sign("PUT", &canonical_uri, &payload_hash);
        let response = self
            .client
            .put(&url)
            .header("Authorization", &signed.authorization)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("x-amz-date", &signed.amz_date)
            .send()
            .await
            .map_err(|e| Error::object_store(format!("S3 bucket create failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::object_store(format!(
                "S3 bucket create failed ({}): {}",
                status, body
            )));
        }

        Ok(())
    }

    async fn health_check(&self) -> Result<bool> {
        let (url, canonical_uri) = self.bucket_url();
        let payload_hash = hex_sha256(b"");
        let signed = self.sign("HEAD", &canonical_uri, &payload_hash);

        match self
            .client
            .head(&url)
            .header("Authorization", &signed.authorization)
            .header("x-amz-content-sha256", &signed.payload_hash)
            .header("x-amz-date", &signed.amz_date)
            .send()
            .await
        {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    fn name(&self) -> &str {
        "s3"
    }
}

/// Compute the hex-encoded SHA-256 hash of data
fn hex_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute HMAC-SHA256 of data with the given key
fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// Compute hex-encoded HMAC-SHA256
fn hex_hmac_sha256(key: &[u8], data: &[u8]) -> String {
    hex::encode(hmac_sha256(key, data))
}

/// Derive the AWS SigV4 signing key for a given date, region, and service
///
/// ```text
/// kDate    = HMAC("AWS4" + secret, dateStamp)
/// kRegion  = HMAC(kDate, region)
/// kService = HMAC(kRegion, service)
/// kSigning = HMAC(kService, "aws4_request")
/// ```
fn derive_signing_key(secret_key: &str, date_stamp: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(
        format!("AWS4{}", secret_key).as_bytes(),
        date_stamp.as_bytes(),
    );
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

/// URI-encode a string per RFC 3986, keeping unreserved characters
/// (`A-Z a-z 0-9 - _ . ~`) as-is
fn uri_encode(s: &str) -> String {
    let mut result = String::new();
    for byte in s.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                result.push(byte as char);
            }
            _ => {
                result.push_str(&format!("%{:02X}", byte));
            }
        }
    }
    result
}
