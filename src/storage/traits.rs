use crate::{
    error::Result,
    models::storage::{ObjectInfo, PutObjectOutput, PutObjectRequest},
};
use async_trait::async_trait;
use std::time::Duration;

/// Raw object-store operations. Implementations report failures as errors;
/// [`super::BlobStoreClient`] turns them into the caller-facing contract.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn head_bucket(&self) -> Result<()>;

    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput>;

    async fn list_objects(&self, prefix: &str, max_keys: usize) -> Result<Vec<ObjectInfo>>;

    async fn delete_object(&self, key: &str) -> Result<()>;

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String>;
}
