use reqwest::{header, Client};
use serde_json::Value;

use crate::{
    config::JimengConfig,
    error::{BridgeError, Result},
    models::{GenerationRequest, GenerationResponse, RawGenerationResponse},
};

/// Longest slice of an error body carried into diagnostics.
const MAX_ERROR_BODY: usize = 2048;

#[derive(Clone)]
pub struct ImageClient {
    client: Client,
    config: JimengConfig,
    session_id: String,
}

impl ImageClient {
    pub fn new(config: JimengConfig) -> Result<Self> {
        config.validate()?;
        let session_id = config
            .session_id
            .clone()
            .ok_or_else(|| BridgeError::Configuration("JIMENG_SESSION_ID is required".into()))?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| BridgeError::Configuration(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config,
            session_id,
        })
    }

    pub fn config(&self) -> &JimengConfig {
        &self.config
    }

    /// Runs one generation. `request` has already been range-checked, so every
    /// error here comes from the remote side.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        let url = self.config.generations_url();
        log::info!(
            "🎨 Generating images with model {} ({}x{}, strength {})",
            request.model,
            request.width,
            request.height,
            request.sample_strength
        );
        log::debug!("Generation prompt: {}", request.prompt);

        let response = self
            .client
            .post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.session_id))
            .json(&request.to_payload())
            .send()
            .await
            .map_err(|e| {
                log::error!("❌ Generation request failed: {}", e);
                BridgeError::from_http(e, "generation request")
            })?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate_utf8(&mut body, MAX_ERROR_BODY);
            log::error!("❌ Generation API returned {}: {}", status, body);
            return Err(BridgeError::RemoteStatus {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| BridgeError::from_http(e, "generation response"))?;

        let raw: RawGenerationResponse = serde_json::from_value(body.clone())?;
        if raw.data.is_empty() {
            log::warn!("⚠️  Generation API returned no images");
            return Err(BridgeError::EmptyResult {
                message: "the API returned no image data".into(),
                raw: Some(body),
            });
        }

        let response = GenerationResponse::from_raw(request, raw);
        log::info!("✅ Generated {} images", response.image_count);
        Ok(response)
    }
}

fn truncate_utf8(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_session() {
        let err = ImageClient::new(JimengConfig::new()).err().unwrap();
        assert!(matches!(err, BridgeError::Configuration(_)));
        assert!(ImageClient::new(JimengConfig::new().with_session_id("s")).is_ok());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let mut text = "ééé".to_string();
        truncate_utf8(&mut text, 3);
        assert_eq!(text, "é");
    }
}
