use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use reqwest::{header, Client};
use tokio::sync::Semaphore;

use crate::{
    config::PipelineConfig,
    error::{BridgeError, Result},
    models::{FetchResult, FetchedPayload},
};

/// Downloads every source URL at once over one pooled client. A failing URL
/// only fails its own slot.
pub struct FetchStage {
    client: Client,
    connections: Arc<Semaphore>,
    timeout: Duration,
}

impl FetchStage {
    pub fn new(config: &PipelineConfig) -> Result<Self> {
        let client = Client::builder()
            .pool_max_idle_per_host(config.max_idle_connections)
            .connect_timeout(config.fetch_timeout())
            .build()
            .map_err(|e| BridgeError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            connections: Arc::new(Semaphore::new(config.max_connections.max(1))),
            timeout: config.fetch_timeout(),
        })
    }

    /// One result per URL, in input order.
    pub async fn fetch_all(&self, urls: &[String]) -> Vec<FetchResult> {
        log::info!("📥 Downloading {} images...", urls.len());

        let fetches = urls
            .iter()
            .enumerate()
            .map(|(index, url)| async move {
                match self.fetch_one(url).await {
                    Ok(payload) => FetchResult::success(index, payload),
                    Err(e) => {
                        log::warn!("⚠️  Download failed {}: {}", url, e);
                        FetchResult::failure(index, e.to_info())
                    }
                }
            });

        join_all(fetches).await
    }

    async fn fetch_one(&self, url: &str) -> Result<FetchedPayload> {
        let _permit = self
            .connections
            .acquire()
            .await
            .map_err(|_| BridgeError::Transport("fetch pool closed".into()))?;

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| BridgeError::from_http(e, url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BridgeError::RemoteStatus {
                status: status.as_u16(),
                body: body.chars().take(256).collect(),
            });
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(String::from);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| BridgeError::from_http(e, url))?;

        log::debug!("Downloaded {} ({} bytes)", url, bytes.len());
        Ok(FetchedPayload {
            bytes: bytes.to_vec(),
            content_type,
        })
    }
}
