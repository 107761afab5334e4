use serde::{Deserialize, Serialize};

use crate::error::ErrorInfo;

/// One item of a batch upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub source_url: String,
    pub label: String,
    /// Explicit object key (relative to the batch prefix). When absent the key
    /// is derived from the label plus a random suffix.
    pub target_key_hint: Option<String>,
}

impl UploadRequest {
    pub fn new(source_url: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
            label: label.into(),
            target_key_hint: None,
        }
    }

    pub fn with_key_hint(mut self, hint: impl Into<String>) -> Self {
        self.target_key_hint = Some(hint.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FetchedPayload {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

/// Outcome of one download; exactly one of `payload` / `error` is set.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub index: usize,
    pub payload: Option<FetchedPayload>,
    pub error: Option<ErrorInfo>,
}

impl FetchResult {
    pub fn success(index: usize, payload: FetchedPayload) -> Self {
        Self {
            index,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn failure(index: usize, error: ErrorInfo) -> Self {
        Self {
            index,
            payload: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.payload.is_some()
    }
}

/// Outcome of one upload; exactly one of `url` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub url: Option<String>,
    pub error: Option<ErrorInfo>,
}

impl UploadResult {
    pub fn success(index: usize, key: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            index,
            key: Some(key.into()),
            url: Some(url.into()),
            error: None,
        }
    }

    pub fn failure(index: usize, key: Option<String>, error: ErrorInfo) -> Self {
        Self {
            index,
            key,
            url: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.url.is_some()
    }
}

/// Index-aligned results of a batch plus its counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub results: Vec<UploadResult>,
    pub success_count: usize,
    pub total_count: usize,
    pub elapsed_ms: u64,
}

impl BatchOutcome {
    pub fn new(results: Vec<UploadResult>, elapsed_ms: u64) -> Self {
        let success_count = results.iter().filter(|r| r.is_success()).count();
        Self {
            total_count: results.len(),
            success_count,
            results,
            elapsed_ms,
        }
    }

    pub fn failure_count(&self) -> usize {
        self.total_count - self.success_count
    }

    /// URLs in input order, `None` where the item failed.
    pub fn urls(&self) -> Vec<Option<&str>> {
        self.results.iter().map(|r| r.url.as_deref()).collect()
    }

    /// Items per second over the whole batch.
    pub fn throughput(&self) -> f64 {
        if self.elapsed_ms == 0 {
            return self.total_count as f64;
        }
        self.total_count as f64 / (self.elapsed_ms as f64 / 1000.0)
    }
}
