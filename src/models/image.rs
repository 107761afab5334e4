use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;

use crate::config::JimengConfig;
use crate::error::{BridgeError, ErrorInfo, Result};
use crate::jimeng::ImageModel;

/// Arguments of the `generate_images` tool as sent by the host. Everything but
/// the prompt falls back to configured defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GenerateImagesArgs {
    #[serde(default)]
    pub prompt: String,
    pub model: Option<String>,
    #[serde(alias = "negativePrompt")]
    pub negative_prompt: Option<String>,
    pub width: Option<i64>,
    pub height: Option<i64>,
    #[serde(alias = "sampleStrength")]
    pub sample_strength: Option<f64>,
}

/// A validated generation request. Only constructed through [`GenerationRequest::new`]
/// or [`GenerationRequest::from_args`], both of which enforce the parameter ranges.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt: String,
    pub model: ImageModel,
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub sample_strength: f64,
}

impl GenerationRequest {
    pub fn new(
        prompt: impl Into<String>,
        model: ImageModel,
        negative_prompt: impl Into<String>,
        width: i64,
        height: i64,
        sample_strength: f64,
    ) -> Result<Self> {
        let prompt = prompt.into();
        if prompt.trim().is_empty() {
            return Err(BridgeError::validation("prompt must not be empty"));
        }
        if !(0.0..=1.0).contains(&sample_strength) {
            return Err(BridgeError::Validation {
                message: format!("sample_strength must be within 0-1, got {}", sample_strength),
                details: Some(serde_json::json!({ "sample_strength": sample_strength })),
            });
        }
        let width = positive_dimension("width", width)?;
        let height = positive_dimension("height", height)?;

        Ok(Self {
            prompt,
            model,
            negative_prompt: negative_prompt.into(),
            width,
            height,
            sample_strength,
        })
    }

    pub fn from_args(args: GenerateImagesArgs, defaults: &JimengConfig) -> Result<Self> {
        let model = match args.model.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => ImageModel::from_str(name)?,
            _ => defaults.default_model,
        };

        Self::new(
            args.prompt,
            model,
            args.negative_prompt.unwrap_or_default(),
            args.width.unwrap_or(i64::from(defaults.default_width)),
            args.height.unwrap_or(i64::from(defaults.default_height)),
            args.sample_strength.unwrap_or(defaults.default_sample_strength),
        )
    }

    pub fn to_payload(&self) -> GenerationPayload {
        GenerationPayload {
            model: self.model.as_str().to_string(),
            prompt: self.prompt.clone(),
            negative_prompt: self.negative_prompt.clone(),
            width: self.width,
            height: self.height,
            sample_strength: self.sample_strength,
        }
    }
}

fn positive_dimension(name: &str, value: i64) -> Result<u32> {
    if value <= 0 {
        return Err(BridgeError::Validation {
            message: format!("{} must be greater than 0, got {}", name, value),
            details: Some(serde_json::json!({ "field": name, "value": value })),
        });
    }
    u32::try_from(value).map_err(|_| BridgeError::validation(format!("{} is too large", name)))
}

/// Request body of `POST /v1/images/generations`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationPayload {
    pub model: String,
    pub prompt: String,
    #[serde(rename = "negativePrompt")]
    pub negative_prompt: String,
    pub width: u32,
    pub height: u32,
    pub sample_strength: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawGenerationResponse {
    pub created: Option<Value>,
    #[serde(default)]
    pub data: Vec<RawImage>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawImage {
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub index: usize,
    pub url: String,
    pub description: String,
}

/// Client-facing result of a generation call. Serialized as the tool's JSON output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt_used: Option<String>,
    pub image_count: usize,
    pub images: Vec<GeneratedImage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl GenerationResponse {
    /// Numbers images 1..N in response order and describes each from the prompt.
    pub fn from_raw(request: &GenerationRequest, raw: RawGenerationResponse) -> Self {
        let images: Vec<GeneratedImage> = raw
            .data
            .into_iter()
            .enumerate()
            .map(|(i, image)| GeneratedImage {
                index: i + 1,
                url: image.url,
                description: format!(
                    "Image #{} generated from prompt '{}'",
                    i + 1,
                    request.prompt
                ),
            })
            .collect();

        Self {
            success: true,
            generated_at: raw.created,
            model_used: Some(request.model.as_str().to_string()),
            prompt_used: Some(request.prompt.clone()),
            image_count: images.len(),
            images,
            error: None,
        }
    }

    pub fn failure(error: &BridgeError) -> Self {
        Self {
            success: false,
            generated_at: None,
            model_used: None,
            prompt_used: None,
            image_count: 0,
            images: Vec::new(),
            error: Some(error.to_info()),
        }
    }
}
