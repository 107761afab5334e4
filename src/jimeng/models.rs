use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::BridgeError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageModel {
    #[serde(rename = "jimeng-3.0")]
    Jimeng30,
    #[serde(rename = "jimeng-2.1")]
    Jimeng21,
    #[serde(rename = "jimeng-2.0-pro")]
    Jimeng20Pro,
    #[serde(rename = "jimeng-2.0")]
    Jimeng20,
    #[serde(rename = "jimeng-1.4")]
    Jimeng14,
    #[serde(rename = "jimeng-xl-pro")]
    JimengXlPro,
}

impl ImageModel {
    pub const ALL: [ImageModel; 6] = [
        ImageModel::Jimeng30,
        ImageModel::Jimeng21,
        ImageModel::Jimeng20Pro,
        ImageModel::Jimeng20,
        ImageModel::Jimeng14,
        ImageModel::JimengXlPro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageModel::Jimeng30 => "jimeng-3.0",
            ImageModel::Jimeng21 => "jimeng-2.1",
            ImageModel::Jimeng20Pro => "jimeng-2.0-pro",
            ImageModel::Jimeng20 => "jimeng-2.0",
            ImageModel::Jimeng14 => "jimeng-1.4",
            ImageModel::JimengXlPro => "jimeng-xl-pro",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ImageModel::Jimeng30 => "Latest release with the highest image quality; recommended",
            ImageModel::Jimeng21 => "Stable release balancing quality and speed",
            ImageModel::Jimeng20Pro => "Professional release for high-quality output",
            ImageModel::Jimeng20 => "Standard release",
            ImageModel::Jimeng14 => "Older release with broad compatibility",
            ImageModel::JimengXlPro => "XL professional release supporting larger sizes",
        }
    }

    pub fn names() -> Vec<&'static str> {
        Self::ALL.iter().map(ImageModel::as_str).collect()
    }

    /// Listing returned by the `list_available_models` tool.
    pub fn catalog(default_model: ImageModel) -> Value {
        let models: Vec<Value> = Self::ALL
            .iter()
            .map(|model| {
                json!({
                    "name": model.as_str(),
                    "description": model.description(),
                    "is_default": *model == default_model,
                })
            })
            .collect();

        json!({
            "available_models": models,
            "default_model": default_model.as_str(),
            "usage_note": "Pick a model by weighing the image quality you need against generation time",
        })
    }
}

impl fmt::Display for ImageModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageModel {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| BridgeError::Validation {
                message: format!("Unsupported model: {}", s),
                details: Some(json!({ "available_models": Self::names() })),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip_through_from_str() {
        for model in ImageModel::ALL {
            assert_eq!(model.as_str().parse::<ImageModel>().unwrap(), model);
        }
        assert!("Jimeng-3.0".parse::<ImageModel>().is_err());
    }

    #[test]
    fn test_catalog_marks_single_default() {
        let catalog = ImageModel::catalog(ImageModel::Jimeng21);
        let defaults: Vec<&Value> = catalog["available_models"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|m| m["is_default"] == true)
            .collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0]["name"], "jimeng-2.1");
        assert_eq!(catalog["default_model"], "jimeng-2.1");
    }

    #[test]
    fn test_serde_uses_wire_names() {
        let json = serde_json::to_string(&ImageModel::Jimeng20Pro).unwrap();
        assert_eq!(json, "\"jimeng-2.0-pro\"");
    }
}
