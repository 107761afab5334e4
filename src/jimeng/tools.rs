use serde::Serialize;
use serde_json::{json, Value};

use crate::{
    error::{BridgeError, Result},
    jimeng::{ImageClient, ImageModel},
    models::{GenerateImagesArgs, GenerationRequest, GenerationResponse},
};

pub const GENERATE_IMAGES: &str = "generate_images";
pub const LIST_AVAILABLE_MODELS: &str = "list_available_models";
pub const GET_GENERATION_TIPS: &str = "get_generation_tips";

#[derive(Debug, Clone, Serialize)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Output of a tool call: pretty JSON text plus whether it describes a failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

/// The three host-callable operations. Every call yields JSON text; failures
/// are embedded in the document rather than returned as errors.
#[derive(Clone)]
pub struct ImageTools {
    client: ImageClient,
}

impl ImageTools {
    pub fn new(client: ImageClient) -> Self {
        Self { client }
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        let config = self.client.config();
        vec![
            ToolDescriptor {
                name: GENERATE_IMAGES,
                description: "Generate AI images for web design work and placeholder content. \
                              Each call returns several candidate image URLs.",
                input_schema: json!({
                    "type": "object",
                    "properties": {
                        "prompt": {
                            "type": "string",
                            "description": "Image description, e.g. \"modern office background\" or \"product showcase\""
                        },
                        "model": {
                            "type": "string",
                            "enum": ImageModel::names(),
                            "default": config.default_model.as_str()
                        },
                        "negative_prompt": {
                            "type": "string",
                            "description": "Elements the image should avoid",
                            "default": ""
                        },
                        "width": { "type": "integer", "minimum": 1, "default": config.default_width },
                        "height": { "type": "integer", "minimum": 1, "default": config.default_height },
                        "sample_strength": {
                            "type": "number",
                            "minimum": 0,
                            "maximum": 1,
                            "default": config.default_sample_strength
                        }
                    },
                    "required": ["prompt"]
                }),
            },
            ToolDescriptor {
                name: LIST_AVAILABLE_MODELS,
                description: "List the available Jimeng image generation models with descriptions.",
                input_schema: json!({ "type": "object", "properties": {} }),
            },
            ToolDescriptor {
                name: GET_GENERATION_TIPS,
                description: "Best practices for prompts and generation parameters.",
                input_schema: json!({ "type": "object", "properties": {} }),
            },
        ]
    }

    /// Dispatches a tool by name. Only an unknown tool name is an `Err`; tool
    /// failures come back inside the output document.
    pub async fn call(&self, name: &str, arguments: Value) -> Result<ToolOutput> {
        match name {
            GENERATE_IMAGES => {
                let arguments = if arguments.is_null() { json!({}) } else { arguments };
                let response = match serde_json::from_value::<GenerateImagesArgs>(arguments) {
                    Ok(args) => self.generate_images(args).await,
                    Err(e) => GenerationResponse::failure(&BridgeError::validation(format!(
                        "invalid arguments: {}",
                        e
                    ))),
                };
                Ok(ToolOutput {
                    is_error: !response.success,
                    text: to_pretty_json(&response),
                })
            }
            LIST_AVAILABLE_MODELS => Ok(ToolOutput {
                text: self.list_available_models(),
                is_error: false,
            }),
            GET_GENERATION_TIPS => Ok(ToolOutput {
                text: self.get_generation_tips(),
                is_error: false,
            }),
            other => Err(BridgeError::validation(format!("Unknown tool: {}", other))),
        }
    }

    /// Validates before any network traffic; invalid input never reaches the API.
    pub async fn generate_images(&self, args: GenerateImagesArgs) -> GenerationResponse {
        let request = match GenerationRequest::from_args(args, self.client.config()) {
            Ok(request) => request,
            Err(e) => {
                log::warn!("⚠️  Rejected generation request: {}", e);
                return GenerationResponse::failure(&e);
            }
        };

        match self.client.generate(&request).await {
            Ok(response) => response,
            Err(e) => {
                let mut response = GenerationResponse::failure(&e);
                response.model_used = Some(request.model.as_str().to_string());
                response.prompt_used = Some(request.prompt);
                response
            }
        }
    }

    pub fn list_available_models(&self) -> String {
        to_pretty_json(&ImageModel::catalog(self.client.config().default_model))
    }

    pub fn get_generation_tips(&self) -> String {
        to_pretty_json(&generation_tips())
    }
}

/// Two-space indented JSON; non-ASCII text is written as-is.
pub fn to_pretty_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| {
        json!({
            "success": false,
            "error": { "kind": "serialization", "message": e.to_string() }
        })
        .to_string()
    })
}

fn generation_tips() -> Value {
    json!({
        "prompt_tips": [
            "Use specific, descriptive wording such as 'minimalist modern office interior' instead of 'office'",
            "Name a style: 'illustration', 'photography', 'cartoon' and so on",
            "Describe mood and atmosphere: 'warm', 'professional', 'energetic'",
            "For websites, add keywords like 'high resolution', 'commercial use' or 'professional photography'"
        ],
        "negative_prompt_tips": [
            "Describe unwanted elements in negative_prompt",
            "Common exclusions: 'blurry', 'low quality', 'distorted', 'incomplete'",
            "For commercial use, exclude 'watermark', 'logo' and 'text'"
        ],
        "parameter_optimization": {
            "sample_strength": {
                "0.3-0.5": "More creativity and variation",
                "0.5-0.7": "Balanced creativity and accuracy; the best choice in most cases",
                "0.7-1.0": "Follows the prompt strictly; for precise control"
            },
            "size_recommendations": {
                "web_headers": "1920x1080 or 1600x900",
                "product_images": "1024x1024 (square)",
                "thumbnails": "512x512 or 640x640",
                "mobile_banners": "1080x1920 (portrait)"
            }
        },
        "workflow_suggestions": [
            "Each call returns several images; review all of them before choosing",
            "To fine-tune, adjust the prompt or parameters and generate again",
            "Generation takes roughly 30 seconds to a minute",
            "Save the URLs you like; generated links may expire"
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::JimengConfig;

    fn tools() -> ImageTools {
        let config = JimengConfig::new()
            .with_session_id("test-session")
            .with_api_base("http://127.0.0.1:9");
        ImageTools::new(ImageClient::new(config).unwrap())
    }

    #[test]
    fn test_descriptors_cover_three_tools() {
        let names: Vec<&str> = tools().descriptors().iter().map(|d| d.name).collect();
        assert_eq!(names, vec![GENERATE_IMAGES, LIST_AVAILABLE_MODELS, GET_GENERATION_TIPS]);
    }

    #[tokio::test]
    async fn test_unknown_tool_is_an_error() {
        assert!(tools().call("delete_everything", json!({})).await.is_err());
    }

    #[tokio::test]
    async fn test_list_models_is_pretty_json() {
        let output = tools().call(LIST_AVAILABLE_MODELS, Value::Null).await.unwrap();
        assert!(!output.is_error);
        assert!(output.text.contains("\n  \"available_models\""));
        let parsed: Value = serde_json::from_str(&output.text).unwrap();
        assert_eq!(parsed["default_model"], "jimeng-3.0");
    }

    #[tokio::test]
    async fn test_tips_contain_parameter_guidance() {
        let parsed: Value = serde_json::from_str(&tools().get_generation_tips()).unwrap();
        assert!(parsed["parameter_optimization"]["sample_strength"]["0.5-0.7"].is_string());
    }

    #[tokio::test]
    async fn test_bad_argument_types_are_reported_in_document() {
        let output = tools()
            .call(GENERATE_IMAGES, json!({ "prompt": "x", "width": "wide" }))
            .await
            .unwrap();
        assert!(output.is_error);
        let parsed: Value = serde_json::from_str(&output.text).unwrap();
        assert_eq!(parsed["success"], false);
        assert_eq!(parsed["error"]["kind"], "validation");
    }

    #[test]
    fn test_pretty_json_keeps_non_ascii() {
        let text = to_pretty_json(&json!({ "prompt": "少女祈祷中" }));
        assert!(text.contains("少女祈祷中"));
    }
}
