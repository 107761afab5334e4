use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        details: Option<Value>,
    },

    #[error("Input mismatch: {urls} source URLs but {labels} labels")]
    InputMismatch { urls: usize, labels: usize },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Remote returned HTTP {status}: {body}")]
    RemoteStatus { status: u16, body: String },

    #[error("Empty result: {message}")]
    EmptyResult { message: String, raw: Option<Value> },

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Configuration,
    Validation,
    InputMismatch,
    Transport,
    Timeout,
    RemoteStatus,
    EmptyResult,
    Storage,
    Serialization,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Configuration => "configuration",
            ErrorKind::Validation => "validation",
            ErrorKind::InputMismatch => "input_mismatch",
            ErrorKind::Transport => "transport",
            ErrorKind::Timeout => "timeout",
            ErrorKind::RemoteStatus => "remote_status",
            ErrorKind::EmptyResult => "empty_result",
            ErrorKind::Storage => "storage",
            ErrorKind::Serialization => "serialization",
        }
    }
}

/// Structured diagnostic that replaces raw errors wherever a failure has to
/// cross an API boundary (per-item batch results, tool responses).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.message)
    }
}

impl BridgeError {
    pub fn validation(message: impl Into<String>) -> Self {
        BridgeError::Validation {
            message: message.into(),
            details: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BridgeError::Configuration(_) => ErrorKind::Configuration,
            BridgeError::Validation { .. } => ErrorKind::Validation,
            BridgeError::InputMismatch { .. } => ErrorKind::InputMismatch,
            BridgeError::Transport(_) => ErrorKind::Transport,
            BridgeError::Timeout(_) => ErrorKind::Timeout,
            BridgeError::RemoteStatus { .. } => ErrorKind::RemoteStatus,
            BridgeError::EmptyResult { .. } => ErrorKind::EmptyResult,
            BridgeError::Storage(_) => ErrorKind::Storage,
            BridgeError::Serialization(_) => ErrorKind::Serialization,
        }
    }

    pub fn to_info(&self) -> ErrorInfo {
        let info = ErrorInfo::new(self.kind(), self.to_string());
        match self {
            BridgeError::Validation {
                details: Some(details),
                ..
            } => info.with_details(details.clone()),
            BridgeError::RemoteStatus { status, .. } => {
                info.with_details(serde_json::json!({ "status": status }))
            }
            BridgeError::EmptyResult { raw: Some(raw), .. } => {
                info.with_details(serde_json::json!({ "raw_response": raw }))
            }
            _ => info,
        }
    }

    /// Classify a reqwest failure the same way for every outbound call.
    pub fn from_http(err: reqwest::Error, target: &str) -> Self {
        if err.is_timeout() {
            BridgeError::Timeout(format!("{}: {}", target, err))
        } else if let Some(status) = err.status() {
            BridgeError::RemoteStatus {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else if err.is_decode() {
            BridgeError::Serialization(format!("{}: {}", target, err))
        } else {
            BridgeError::Transport(format!("{}: {}", target, err))
        }
    }
}

impl From<BridgeError> for ErrorInfo {
    fn from(err: BridgeError) -> Self {
        err.to_info()
    }
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}
