pub mod cos;
pub mod memory;
pub mod traits;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::{
    config::CosConfig,
    content_type,
    error::{BridgeError, Result},
    models::storage::{ObjectAcl, ObjectInfo, PutObjectRequest, StorageClass},
};

pub use cos::CosBlobStore;
pub use memory::MemoryBlobStore;
pub use traits::BlobStore;

/// Caller-facing wrapper around a [`BlobStore`] backend. Only `put_object` and
/// `upload` return errors; the bucket check, list, delete and presign calls report
/// failure through their return value and a log line.
#[derive(Clone)]
pub struct BlobStoreClient {
    backend: Arc<dyn BlobStore>,
    config: CosConfig,
}

impl BlobStoreClient {
    /// Connects to Tencent COS using the configured credentials.
    pub async fn connect(config: CosConfig) -> Result<Self> {
        let backend = CosBlobStore::new(&config).await?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    pub fn with_backend(config: CosConfig, backend: Arc<dyn BlobStore>) -> Self {
        Self { backend, config }
    }

    /// In-memory client for dry runs; URLs are still built from `config`.
    pub fn in_memory(config: CosConfig) -> Self {
        let backend = MemoryBlobStore::new(config.bucket.clone());
        Self::with_backend(config, Arc::new(backend))
    }

    pub fn config(&self) -> &CosConfig {
        &self.config
    }

    pub fn backend(&self) -> &Arc<dyn BlobStore> {
        &self.backend
    }

    /// Head-bucket reachability check.
    pub async fn test_connection(&self) -> bool {
        match self.backend.head_bucket().await {
            Ok(()) => {
                log::info!("✅ Connected to bucket: {}", self.config.bucket);
                true
            }
            Err(e) => {
                log::error!("❌ Bucket {} unreachable: {}", self.config.bucket, e);
                false
            }
        }
    }

    /// Stores bytes and returns the ETag. A response without an ETag counts as failure.
    pub async fn put_object(
        &self,
        body: Vec<u8>,
        key: &str,
        content_type: &str,
        acl: Option<ObjectAcl>,
        storage_class: StorageClass,
    ) -> Result<String> {
        let mut request =
            PutObjectRequest::new(key, body, content_type).with_storage_class(storage_class);
        if let Some(acl) = acl {
            request = request.with_acl(acl);
        }

        let output = self.backend.put_object(request).await?;
        output
            .etag
            .filter(|etag| !etag.is_empty())
            .ok_or_else(|| BridgeError::Storage(format!("upload of {} was not confirmed (no ETag)", key)))
    }

    /// Standard-class upload; returns the object's public URL.
    pub async fn upload(&self, body: Vec<u8>, key: &str, content_type: &str) -> Result<String> {
        self.put_object(body, key, content_type, None, StorageClass::Standard)
            .await?;
        let url = self.object_url(key);
        log::debug!("📤 Uploaded {}", url);
        Ok(url)
    }

    /// Uploads a local file. The content type defaults to the one implied by the
    /// file extension; returns the object's public URL.
    pub async fn upload_file(
        &self,
        path: impl AsRef<Path>,
        key: &str,
        content_type: Option<&str>,
        acl: Option<ObjectAcl>,
    ) -> Result<String> {
        let path = path.as_ref();
        let body = tokio::fs::read(path).await.map_err(|e| BridgeError::Validation {
            message: format!("Cannot read {}: {}", path.display(), e),
            details: Some(serde_json::json!({ "path": path.display().to_string() })),
        })?;
        let content_type = content_type
            .map(str::to_string)
            .unwrap_or_else(|| content_type::for_path(path).to_string());

        log::info!(
            "📤 Uploading {} ({} bytes, {}) to {}",
            path.display(),
            body.len(),
            content_type,
            key
        );
        self.put_object(body, key, &content_type, acl, StorageClass::Standard)
            .await?;
        Ok(self.object_url(key))
    }

    /// Objects under `prefix`, in store order. Empty on failure.
    pub async fn list_objects(&self, prefix: &str, max_keys: usize) -> Vec<ObjectInfo> {
        match self.backend.list_objects(prefix, max_keys).await {
            Ok(objects) => objects,
            Err(e) => {
                log::error!("❌ Listing '{}' failed: {}", prefix, e);
                Vec::new()
            }
        }
    }

    pub async fn delete_object(&self, key: &str) -> bool {
        match self.backend.delete_object(key).await {
            Ok(()) => {
                log::info!("🗑️  Deleted object: {}", key);
                true
            }
            Err(e) => {
                log::error!("❌ Deleting {} failed: {}", key, e);
                false
            }
        }
    }

    /// Time-limited GET URL, or an empty string when signing fails.
    pub async fn presigned_url(&self, key: &str, expires_secs: u64) -> String {
        match self
            .backend
            .presign_get(key, Duration::from_secs(expires_secs))
            .await
        {
            Ok(url) => url,
            Err(e) => {
                log::error!("❌ Presigning {} failed: {}", key, e);
                String::new()
            }
        }
    }

    pub fn object_url(&self, key: &str) -> String {
        self.config.object_url(key)
    }
}
