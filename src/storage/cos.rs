use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::{retry::RetryConfig, timeout::TimeoutConfig, Credentials, Region},
    error::{ProvideErrorMetadata, SdkError},
    presigning::PresigningConfig,
    primitives::ByteStream,
    types::{ObjectCannedAcl, StorageClass as SdkStorageClass},
    Client,
};
use chrono::{DateTime, Utc};

use crate::{
    config::CosConfig,
    error::{BridgeError, Result},
    models::storage::{ObjectInfo, PutObjectOutput, PutObjectRequest},
    storage::traits::BlobStore,
};

/// Tencent COS through its S3-compatible API.
pub struct CosBlobStore {
    client: Client,
    bucket: String,
}

impl CosBlobStore {
    pub async fn new(config: &CosConfig) -> Result<Self> {
        config.validate()?;

        let secret_id = config
            .secret_id
            .clone()
            .ok_or_else(|| BridgeError::Configuration("COS secret id is required".into()))?;
        let secret_key = config
            .secret_key
            .clone()
            .ok_or_else(|| BridgeError::Configuration("COS secret key is required".into()))?;

        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(Credentials::new(
                secret_id,
                secret_key,
                None,
                None,
                "tencent-cos",
            ))
            .region(Region::new(config.region.clone()))
            .endpoint_url(config.endpoint())
            .retry_config(
                RetryConfig::standard().with_max_attempts(max_attempts(config.max_retries)),
            )
            .timeout_config(
                TimeoutConfig::builder()
                    .operation_timeout(config.timeout())
                    .build(),
            )
            .load()
            .await;

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(false)
            .build();

        log::debug!(
            "COS client ready for bucket {} at {}",
            config.bucket,
            config.endpoint()
        );

        Ok(Self {
            client: Client::from_conf(s3_config),
            bucket: config.bucket.clone(),
        })
    }
}

/// The SDK counts the first try as an attempt.
fn max_attempts(max_retries: u32) -> u32 {
    max_retries.saturating_add(1)
}

fn sdk_error<E, R>(operation: &str, err: SdkError<E, R>) -> BridgeError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    match &err {
        SdkError::TimeoutError(_) => BridgeError::Timeout(format!("COS {} timed out", operation)),
        SdkError::DispatchFailure(failure) => {
            if failure.is_timeout() {
                BridgeError::Timeout(format!("COS {} timed out", operation))
            } else {
                BridgeError::Transport(format!("COS {}: {:?}", operation, failure))
            }
        }
        _ => match err.as_service_error() {
            Some(service_error) => BridgeError::Storage(format!(
                "COS {} failed: {} - {}",
                operation,
                service_error.code().unwrap_or("unknown"),
                service_error.message().unwrap_or("no message")
            )),
            None => BridgeError::Storage(format!("COS {} failed: {}", operation, err)),
        },
    }
}

fn to_utc(value: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(value.secs(), value.subsec_nanos())
}

#[async_trait]
impl BlobStore for CosBlobStore {
    async fn head_bucket(&self) -> Result<()> {
        self.client
            .head_bucket()
            .bucket(&self.bucket)
            .send()
            .await
            .map_err(|e| sdk_error("head bucket", e))?;
        Ok(())
    }

    async fn put_object(&self, request: PutObjectRequest) -> Result<PutObjectOutput> {
        let mut builder = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&request.key)
            .content_type(&request.content_type)
            .storage_class(SdkStorageClass::from(request.storage_class.as_str()))
            .body(ByteStream::from(request.body));

        if let Some(acl) = request.acl {
            builder = builder.acl(ObjectCannedAcl::from(acl.as_str()));
        }

        let output = builder
            .send()
            .await
            .map_err(|e| sdk_error("put object", e))?;

        Ok(PutObjectOutput {
            etag: output.e_tag().map(String::from),
        })
    }

    async fn list_objects(&self, prefix: &str, max_keys: usize) -> Result<Vec<ObjectInfo>> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(i32::try_from(max_keys).unwrap_or(i32::MAX))
            .send()
            .await
            .map_err(|e| sdk_error("list objects", e))?;

        Ok(output
            .contents()
            .iter()
            .filter_map(|object| {
                Some(ObjectInfo {
                    key: object.key()?.to_string(),
                    size: object.size().unwrap_or(0).max(0) as u64,
                    last_modified: object.last_modified().and_then(to_utc),
                    etag: object.e_tag().map(String::from),
                })
            })
            .collect())
    }

    async fn delete_object(&self, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| sdk_error("delete object", e))?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> Result<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| BridgeError::validation(format!("Invalid presign expiry: {}", e)))?;

        let request = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| sdk_error("presign", e))?;

        Ok(request.uri().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_attempts_includes_first_try_and_saturates() {
        assert_eq!(max_attempts(0), 1);
        assert_eq!(max_attempts(3), 4);
        assert_eq!(max_attempts(u32::MAX), u32::MAX);
    }

    #[tokio::test]
    async fn test_new_requires_credentials() {
        let err = CosBlobStore::new(&CosConfig::new()).await.err().unwrap();
        assert!(matches!(err, BridgeError::Configuration(_)));
    }
}
