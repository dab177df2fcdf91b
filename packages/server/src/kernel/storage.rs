//! Object storage for uploaded document blobs.
//!
//! Production talks to a Supabase-style storage HTTP API; development and
//! tests use the in-memory store. Blob paths follow
//! `documents/<user_id>/<document_id>/<filename>`.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

/// The bucket holding uploaded documents.
pub const DOCUMENTS_BUCKET: &str = "documents";

/// Canonical blob path for an uploaded document.
pub fn blob_path(user_id: Uuid, document_id: Uuid, filename: &str) -> String {
    format!("documents/{user_id}/{document_id}/{filename}")
}

#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn put(&self, bucket: &str, path: &str, bytes: &[u8], content_type: &str) -> Result<()>;

    async fn get(&self, bucket: &str, path: &str) -> Result<Vec<u8>>;

    /// Time-limited download URL for clients.
    async fn signed_url(&self, bucket: &str, path: &str, expires_in_secs: u64) -> Result<String>;
}

/// HTTP client against a Supabase-style storage API.
pub struct HttpBlobStore {
    base_url: String,
    service_key: String,
    client: reqwest::Client,
}

impl HttpBlobStore {
    pub fn new(base_url: impl Into<String>, service_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            service_key: service_key.into(),
            client: reqwest::Client::new(),
        }
    }

    fn object_url(&self, bucket: &str, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket, path)
    }
}

#[async_trait]
impl BlobStore for HttpBlobStore {
    async fn put(&self, bucket: &str, path: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        let response = self
            .client
            .post(self.object_url(bucket, path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .header(reqwest::header::CONTENT_TYPE, content_type)
            .body(bytes.to_vec())
            .send()
            .await
            .context("storage unreachable")?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(anyhow!("storage upload failed: {status} {detail}"));
        }
        Ok(())
    }

    async fn get(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(self.object_url(bucket, path))
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .send()
            .await
            .context("storage unreachable")?
            .error_for_status()
            .context("storage download failed")?;

        Ok(response.bytes().await?.to_vec())
    }

    async fn signed_url(&self, bucket: &str, path: &str, expires_in_secs: u64) -> Result<String> {
        let url = format!(
            "{}/storage/v1/object/sign/{}/{}?expiresIn={}",
            self.base_url, bucket, path, expires_in_secs
        );
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.service_key)
            .header("apikey", &self.service_key)
            .send()
            .await
            .context("storage unreachable")?
            .error_for_status()
            .context("storage sign failed")?;

        let body: serde_json::Value = response.json().await?;
        let signed = body
            .get("signedURL")
            .and_then(|v| v.as_str())
            .ok_or_else(|| anyhow!("storage sign response missing signedURL"))?;
        Ok(format!("{}{}", self.base_url, signed))
    }
}

/// In-memory store for development and tests.
#[derive(Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<String, (Vec<u8>, String)>>,
}

impl MemoryBlobStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn key(bucket: &str, path: &str) -> String {
        format!("{bucket}/{path}")
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bucket: &str, path: &str, bytes: &[u8], content_type: &str) -> Result<()> {
        self.objects
            .write()
            .await
            .insert(Self::key(bucket, path), (bytes.to_vec(), content_type.to_string()));
        Ok(())
    }

    async fn get(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(&Self::key(bucket, path))
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| anyhow!("blob not found: {bucket}/{path}"))
    }

    async fn signed_url(&self, bucket: &str, path: &str, expires_in_secs: u64) -> Result<String> {
        if !self.objects.read().await.contains_key(&Self::key(bucket, path)) {
            return Err(anyhow!("blob not found: {bucket}/{path}"));
        }
        Ok(format!("memory://{bucket}/{path}?expiresIn={expires_in_secs}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_paths_are_scoped_by_user_and_document() {
        let user = Uuid::nil();
        let doc = Uuid::nil();
        assert_eq!(
            blob_path(user, doc, "term-sheet.pdf"),
            format!("documents/{user}/{doc}/term-sheet.pdf")
        );
    }

    #[tokio::test]
    async fn memory_store_roundtrip() {
        let store = MemoryBlobStore::new();
        store
            .put(DOCUMENTS_BUCKET, "a/b.pdf", b"bytes", "application/pdf")
            .await
            .unwrap();
        assert_eq!(store.get(DOCUMENTS_BUCKET, "a/b.pdf").await.unwrap(), b"bytes");
        assert!(store.get(DOCUMENTS_BUCKET, "missing").await.is_err());

        let url = store.signed_url(DOCUMENTS_BUCKET, "a/b.pdf", 3600).await.unwrap();
        assert!(url.starts_with("memory://documents/a/b.pdf"));
    }
}
