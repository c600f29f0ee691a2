use reqwest::blocking::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};

use super::types::{CompletionRequest, LLMResponse, Message, ProviderAdapter, ProviderError, ToolCall};
use crate::config::ModelConfig;
use crate::tools::ToolSchema;

pub struct GeminiAdapter {
    base_url: String,
    api_key: SecretString,
    model: String,
    temperature: f64,
    client: Client,
}

impl GeminiAdapter {
    pub fn new(cfg: &ModelConfig, api_key: SecretString, model: &str, temperature: f64) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(ProviderError::from_reqwest)?;
        Ok(Self {
            base_url: cfg.gemini_base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.to_string(),
            temperature,
            client,
        })
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn complete(&self, request: CompletionRequest) -> Result<LLMResponse, ProviderError> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let temperature = request.temperature.unwrap_or(self.temperature);
        let payload = build_payload(&request.messages, request.tools.as_deref(), temperature);

        let endpoint = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        let resp = self
            .client
            .post(endpoint)
            .header("x-goog-api-key", self.api_key.expose_secret().as_str())
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

fn build_payload(messages: &[Message], tools: Option<&[ToolSchema]>, temperature: f64) -> Value {
    let mut contents = Vec::new();
    let mut system_instruction = None;

    for msg in messages {
        if msg.role == "system" {
            system_instruction = Some(msg.content.clone());
            continue;
        }
        let role = if msg.role == "user" { "user" } else { "model" };
        contents.push(json!({
            "role": role,
            "parts": [{"text": msg.content}]
        }));
    }

    let mut payload = json!({
        "contents": contents,
        "generationConfig": {"temperature": temperature}
    });

    if let Some(system) = system_instruction {
        payload["systemInstruction"] = json!({"parts": [{"text": system}]});
    }

    if let Some(tools) = tools {
        let declarations: Vec<Value> = tools
            .iter()
            .map(|tool| {
                json!({
                    "name": tool.name,
                    "description": tool.description,
                    "parameters": tool.parameters.clone().unwrap_or(json!({})),
                })
            })
            .collect();
        payload["tools"] = json!([{"functionDeclarations": declarations}]);
    }

    payload
}

fn parse_response(raw: &Value) -> (String, Vec<ToolCall>) {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    let parts = raw
        .pointer("/candidates/0/content/parts")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    for part in parts {
        if let Some(chunk) = part.get("text").and_then(|v| v.as_str()) {
            text.push_str(chunk);
        }
        if let Some(fc) = part.get("functionCall") {
            let name = fc.get("name").and_then(|v| v.as_str()).unwrap_or("");
            let args = fc.get("args").cloned().unwrap_or(json!({}));
            tool_calls.push(ToolCall::new(name, args));
        }
    }

    (text, tool_calls)
}
