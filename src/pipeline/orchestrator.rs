use std::collections::HashSet;

use crate::{
    config::PipelineConfig,
    content_type,
    error::{BridgeError, ErrorInfo, Result},
    logger,
    models::{BatchOutcome, FetchResult, UploadRequest, UploadResult},
    pipeline::{
        fetch::FetchStage,
        keys,
        upload::{UploadStage, UploadTask},
    },
    storage::BlobStoreClient,
};

/// Fetch-then-upload pipeline for batches of remote images.
///
/// The HTTP pool and the upload workers live only for the duration of one
/// call; dropping the returned future (for example on a caller timeout)
/// releases both.
#[derive(Clone)]
pub struct BatchUploader {
    store: BlobStoreClient,
    config: PipelineConfig,
}

impl BatchUploader {
    pub fn new(store: BlobStoreClient, config: PipelineConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &BlobStoreClient {
        &self.store
    }

    /// Pairs each URL with its label. Mismatched lengths fail before any
    /// network traffic.
    pub async fn upload_images_batch(
        &self,
        image_urls: &[String],
        labels: &[String],
    ) -> Result<BatchOutcome> {
        if image_urls.len() != labels.len() {
            return Err(BridgeError::InputMismatch {
                urls: image_urls.len(),
                labels: labels.len(),
            });
        }

        let requests = image_urls
            .iter()
            .zip(labels)
            .map(|(url, label)| UploadRequest::new(url.clone(), label.clone()))
            .collect();
        self.upload_batch(requests).await
    }

    pub async fn upload_batch(&self, requests: Vec<UploadRequest>) -> Result<BatchOutcome> {
        let mut timer = logger::timer("batch upload");
        let total = requests.len();

        let fetch_stage = FetchStage::new(&self.config)?;
        let urls: Vec<String> = requests.iter().map(|r| r.source_url.clone()).collect();
        let fetched = fetch_stage.fetch_all(&urls).await;

        let mut results: Vec<Option<UploadResult>> = vec![None; total];
        let mut tasks = Vec::new();
        let mut claimed_keys = HashSet::new();
        for (request, fetch) in requests.iter().zip(fetched) {
            let FetchResult {
                index,
                payload,
                error,
            } = fetch;
            match payload {
                Some(payload) => {
                    let content_type = content_type::resolve(
                        payload.content_type.as_deref(),
                        &payload.bytes,
                        content_type::DEFAULT_IMAGE_TYPE,
                    );
                    let key = self.key_for(request, &content_type);
                    // Two items resolving to one key would overwrite each other.
                    if !claimed_keys.insert(key.clone()) {
                        log::warn!("⚠️  Duplicate object key {} at item {}", key, index);
                        let error = BridgeError::Validation {
                            message: format!("object key {} is already used in this batch", key),
                            details: Some(serde_json::json!({ "key": key })),
                        };
                        results[index] =
                            Some(UploadResult::failure(index, Some(key), error.to_info()));
                        continue;
                    }
                    tasks.push(UploadTask {
                        index,
                        key,
                        payload: payload.bytes,
                        content_type,
                    });
                }
                None => {
                    let error = error
                        .unwrap_or_else(|| BridgeError::Transport("download failed".into()).to_info());
                    results[index] = Some(UploadResult::failure(index, None, error));
                }
            }
        }

        let upload_stage = UploadStage::new(self.store.clone(), self.config.upload_workers);
        for uploaded in upload_stage.upload_all(tasks).await {
            let index = uploaded.index;
            results[index] = Some(uploaded);
        }

        let merged: Vec<UploadResult> = results
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    UploadResult::failure(
                        index,
                        None,
                        BridgeError::Storage("item produced no result".into()).to_info(),
                    )
                })
            })
            .collect();

        let elapsed = timer.stop();
        let outcome = BatchOutcome::new(merged, elapsed.as_millis() as u64);
        log::info!(
            "📊 Batch finished: {}/{} uploaded in {}ms ({:.2} images/s)",
            outcome.success_count,
            outcome.total_count,
            outcome.elapsed_ms,
            outcome.throughput()
        );
        Ok(outcome)
    }

    /// Single-image upload: a batch of one. Returns the public URL or the
    /// item's diagnostic.
    pub async fn upload_from_url(
        &self,
        url: &str,
        label: &str,
    ) -> std::result::Result<String, ErrorInfo> {
        let outcome = self
            .upload_batch(vec![UploadRequest::new(url, label)])
            .await
            .map_err(ErrorInfo::from)?;

        match outcome.results.into_iter().next() {
            Some(UploadResult { url: Some(url), .. }) => Ok(url),
            Some(UploadResult {
                error: Some(error), ..
            }) => Err(error),
            _ => Err(BridgeError::Storage("upload produced no result".into()).to_info()),
        }
    }

    fn key_for(&self, request: &UploadRequest, content_type: &str) -> String {
        let extension = content_type::extension_for(content_type);
        match request.target_key_hint.as_deref() {
            Some(hint) => {
                keys::hinted_key(&self.config.key_prefix, &request.label, hint, extension)
            }
            None => keys::object_key(&self.config.key_prefix, &request.label, extension),
        }
    }
}
