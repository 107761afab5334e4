use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{BridgeError, Result},
    models::storage::{ObjectAcl, ObjectInfo, PutObjectOutput, PutObjectRequest, StorageClass},
    storage::traits::BlobStore,
};

#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub etag: String,
    pub acl: Option<ObjectAcl>,
    pub storage_class: StorageClass,
    pub last_modified: DateTime<Utc>,
}

/// Process-local store used for dry runs and tests. Keys are kept sorted so
/// listings come back in the same order as a real bucket.
pub struct MemoryBlobStore {
    bucket: String,
    objects: RwLock<BTreeMap<String, StoredObject>>,
}

impl MemoryBlobStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn head_bucket(&self) -> Result<()> {
        Ok(())
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput> {
        let etag = format!("\"{}\"", Uuid::new_v4().simple());
        let object = StoredObject {
            body: request.body,
            content_type: request.content_type,
            etag: etag.clone(),
            acl: request.acl,
            storage_class: request.storage_class,
            last_modified: Utc::now(),
        };
        self.objects.write().await.insert(request.key, object);
        Ok(PutObjectOutput { etag: Some(etag) })
    }

    async fn list_objects(&self, prefix: &str, max_keys: usize) -> Result<Vec<ObjectInfo>> {
        let objects = self.objects.read().await;
        Ok(objects
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .take(max_keys)
            .map(|(key, object)| ObjectInfo {
                key: key.clone(),
                size: object.body.len() as u64,
                last_modified: Some(object.last_modified),
                etag: Some(object.etag.clone()),
            })
            .collect())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String> {
        if !self.objects.read().await.contains_key(key) {
            return Err(BridgeError::Storage(format!("NoSuchKey: {}", key)));
        }
        let expires_at = Utc::now().timestamp() + expires_in.as_secs() as i64;
        Ok(format!(
            "memory://{}/{}?expires={}&sign={}",
            self.bucket,
            key,
            expires_at,
            Uuid::new_v4().simple()
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_respects_prefix_and_limit() {
        let store = MemoryBlobStore::new("test");
        for key in ["a/1.png", "a/2.png", "a/3.png", "b/1.png"] {
            store
                .put_object(PutObjectRequest::new(key, vec![1, 2], "image/png"))
                .await
                .unwrap();
        }
        let listed = store.list_objects("a/", 2).await.unwrap();
        let keys: Vec<&str> = listed.iter().map(|o| o.key.as_str()).collect();
        assert_eq!(keys, vec!["a/1.png", "a/2.png"]);
        assert_eq!(listed[0].size, 2);
    }

    #[tokio::test]
    async fn test_presign_requires_existing_key() {
        let store = MemoryBlobStore::new("test");
        assert!(store.presign_get("missing", Duration::from_secs(60)).await.is_err());
        store
            .put_object(PutObjectRequest::new("k", vec![0], "image/png"))
            .await
            .unwrap();
        let url = store.presign_get("k", Duration::from_secs(60)).await.unwrap();
        assert!(url.starts_with("memory://test/k?expires="));
    }
}
