use reqwest::blocking::Client;
use serde_json::{json, Value};

use super::types::{CompletionRequest, LLMResponse, Message, ProviderAdapter, ProviderError, ToolCall};
use crate::config::ModelConfig;
use crate::tools::ToolSchema;

/// Ollama `/api/chat`, non-streaming, with function tools.
pub struct OllamaAdapter {
    base_url: String,
    model: String,
    temperature: f64,
    client: Client,
}

impl OllamaAdapter {
    pub fn new(cfg: &ModelConfig, model: &str, temperature: f64) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(ProviderError::from_reqwest)?;
        Ok(Self {
            base_url: cfg.ollama_base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            temperature,
            client,
        })
    }
}

impl ProviderAdapter for OllamaAdapter {
    fn complete(&self, request: CompletionRequest) -> Result<LLMResponse, ProviderError> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let temperature = request.temperature.unwrap_or(self.temperature);
        let payload = build_payload(&model, &request.messages, request.tools.as_deref(), temperature);

        let resp = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&payload)
            .send()
            .map_err(ProviderError::from_reqwest)?;

        let status = resp.status();
        let body = resp.text().unwrap_or_default();
        if !status.is_success() {
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        let raw: Value =
            serde_json::from_str(&body).map_err(|_| ProviderError::new("parse_error", "invalid json"))?;
        let (content, tool_calls) = parse_response(&raw);
        Ok(LLMResponse {
            content,
            tool_calls,
            raw: Some(raw),
        })
    }
}

fn build_payload(model: &str, messages: &[Message], tools: Option<&[ToolSchema]>, temperature: f64) -> Value {
    let mut payload = json!({
        "model": model,
        "messages": messages,
        "stream": false,
        "options": {"temperature": temperature},
    });
    if let Some(tools) = tools {
        let functions: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters.clone().unwrap_or(json!({})),
                    }
                })
            })
            .collect();
        payload["tools"] = Value::Array(functions);
    }
    payload
}

fn parse_response(raw: &Value) -> (String, Vec<ToolCall>) {
    let message = match raw.get("message") {
        Some(message) => message,
        None => return (String::new(), Vec::new()),
    };
    let content = message
        .get("content")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let tool_calls = message
        .get("tool_calls")
        .and_then(|v| v.as_array())
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| call.get("function"))
                .map(|function| {
                    let name = function.get("name").and_then(|v| v.as_str()).unwrap_or("");
                    let args = function.get("arguments").cloned().unwrap_or(json!({}));
                    ToolCall::new(name, args)
                })
                .collect()
        })
        .unwrap_or_default();
    (content, tool_calls)
}
