use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

use crate::tools::ToolSchema;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub args: Value,
}

impl ToolCall {
    pub fn new(name: &str, args: Value) -> Self {
        Self {
            name: name.to_string(),
            args,
        }
    }

    /// Arguments as a JSON value. Some providers send them JSON-encoded in a
    /// string; those are decoded. Text that does not decode is an error
    /// carrying the parser message.
    pub fn arguments(&self) -> Result<Value, String> {
        match &self.args {
            Value::String(raw) => {
                serde_json::from_str(raw).map_err(|err| format!("arguments are not valid JSON: {}", err))
            }
            Value::Null => Ok(json!({})),
            other => Ok(other.clone()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LLMResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub raw: Option<Value>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<Message>,
    pub tools: Option<Vec<ToolSchema>>,
    pub temperature: Option<f64>,
    pub model: Option<String>,
    pub provider: Option<String>,
}

#[derive(Clone, Debug, Error, PartialEq)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::new("timeout", &err.to_string())
        } else {
            Self::new("network_error", &err.to_string())
        }
    }

    pub(crate) fn from_status(status: u16, body: &str) -> Self {
        let lowered = body.to_lowercase();
        match status {
            401 | 403 => Self::new("auth_error", body),
            429 => Self::new("rate_limit", body),
            _ if lowered.contains("quota") || lowered.contains("resource_exhausted") => Self::new("rate_limit", body),
            500..=599 => Self::new("server_error", body),
            _ => Self::new("api_error", body),
        }
    }
}

/// One model backend. Implementations block until the model answers or the
/// client timeout fires.
pub trait ProviderAdapter: Send + Sync {
    fn complete(&self, request: CompletionRequest) -> Result<LLMResponse, ProviderError>;
}
