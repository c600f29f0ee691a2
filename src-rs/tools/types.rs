use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::pipeline::Role;

/// Wire shape of a tool advertised to the model.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Option<Value>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToolCategory {
    Search,
    Arithmetic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    SearchStockData,
    CalculatePriceReturn,
    CalculateDividendYield,
    CalculateTotalReturn,
    CompareReturns,
}

impl ToolKind {
    pub const ALL: [ToolKind; 5] = [
        ToolKind::SearchStockData,
        ToolKind::CalculatePriceReturn,
        ToolKind::CalculateDividendYield,
        ToolKind::CalculateTotalReturn,
        ToolKind::CompareReturns,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::SearchStockData => "search_stock_data",
            ToolKind::CalculatePriceReturn => "calculate_price_return",
            ToolKind::CalculateDividendYield => "calculate_dividend_yield",
            ToolKind::CalculateTotalReturn => "calculate_total_return",
            ToolKind::CompareReturns => "compare_returns",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn category(self) -> ToolCategory {
        match self {
            ToolKind::SearchStockData => ToolCategory::Search,
            _ => ToolCategory::Arithmetic,
        }
    }

    /// Path segment on the calculation service; `None` for search.
    pub fn endpoint(self) -> Option<&'static str> {
        match self {
            ToolKind::SearchStockData => None,
            ToolKind::CalculatePriceReturn => Some("price-return"),
            ToolKind::CalculateDividendYield => Some("dividend-yield"),
            ToolKind::CalculateTotalReturn => Some("total-return"),
            ToolKind::CompareReturns => Some("compare"),
        }
    }
}

/// Result of looking a model-supplied name up in the registry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ToolRequest {
    Known(ToolKind),
    Unknown(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParamType {
    String,
    Number,
    StringArray,
}

impl ParamType {
    fn schema(self) -> Value {
        match self {
            ParamType::String => json!({"type": "string"}),
            ParamType::Number => json!({"type": "number"}),
            ParamType::StringArray => json!({"type": "array", "items": {"type": "string"}}),
        }
    }

    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Number => value.is_number(),
            // object items carry an explicit role tag: {"query": .., "role": ..}
            ParamType::StringArray => match value {
                Value::Array(items) => items.iter().all(|item| item.is_string() || item.is_object()),
                Value::String(_) => true,
                _ => false,
            },
        }
    }
}

#[derive(Clone, Debug)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamType,
    pub required: bool,
    pub description: Option<&'static str>,
}

impl ParamSpec {
    pub fn required(name: &'static str, kind: ParamType) -> Self {
        Self {
            name,
            kind,
            required: true,
            description: None,
        }
    }

    pub fn optional(name: &'static str, kind: ParamType) -> Self {
        Self {
            name,
            kind,
            required: false,
            description: None,
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

#[derive(Clone, Debug)]
pub struct ToolDefinition {
    pub kind: ToolKind,
    pub description: &'static str,
    pub params: Vec<ParamSpec>,
}

impl ToolDefinition {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn schema(&self) -> ToolSchema {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in &self.params {
            let mut prop = param.kind.schema();
            if let Some(description) = param.description {
                prop["description"] = json!(description);
            }
            properties.insert(param.name.to_string(), prop);
            if param.required {
                required.push(json!(param.name));
            }
        }
        ToolSchema {
            name: self.name().to_string(),
            description: self.description.to_string(),
            parameters: Some(json!({
                "type": "object",
                "properties": properties,
                "required": required,
            })),
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,
    #[error("http {status}: {body}")]
    Status { status: u16, body: String },
    #[error("request failed: {0}")]
    Request(String),
    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() {
            TransportError::Decode(err.to_string())
        } else {
            TransportError::Request(err.to_string())
        }
    }
}

/// Error marker carried inside a [`ToolResult`].
#[derive(Clone, Debug, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ToolFailure {
    #[error("unknown tool: {name}")]
    UnknownTool { name: String },
    #[error("invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },
    #[error("{tool} timed out")]
    Timeout { tool: String },
    #[error("{tool} failed: {message}")]
    Transport { tool: String, message: String },
}

impl ToolFailure {
    pub fn transport(kind: ToolKind, err: TransportError) -> Self {
        match err {
            TransportError::Timeout => ToolFailure::Timeout {
                tool: kind.name().to_string(),
            },
            other => ToolFailure::Transport {
                tool: kind.name().to_string(),
                message: other.to_string(),
            },
        }
    }

    pub fn invalid(kind: ToolKind, reason: impl Into<String>) -> Self {
        ToolFailure::InvalidArguments {
            tool: kind.name().to_string(),
            reason: reason.into(),
        }
    }

    pub fn to_value(&self) -> Value {
        json!({"error": self.to_string()})
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchQuery {
    pub text: String,
    pub role: Option<Role>,
}

#[derive(Clone, Debug)]
pub struct SearchItem {
    pub query: SearchQuery,
    pub payload: Result<Value, ToolFailure>,
}

#[derive(Clone, Debug)]
pub enum ToolResult {
    Search(Vec<SearchItem>),
    Calculation(Map<String, Value>),
    Failed(ToolFailure),
}

impl ToolResult {
    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Failed(_))
    }

    pub fn failure(&self) -> Option<&ToolFailure> {
        match self {
            ToolResult::Failed(failure) => Some(failure),
            _ => None,
        }
    }

    /// JSON rendering; failures become `{"error": <message>}`.
    pub fn to_value(&self) -> Value {
        match self {
            ToolResult::Search(items) => Value::Array(
                items
                    .iter()
                    .map(|item| match &item.payload {
                        Ok(payload) => payload.clone(),
                        Err(failure) => failure.to_value(),
                    })
                    .collect(),
            ),
            ToolResult::Calculation(map) => Value::Object(map.clone()),
            ToolResult::Failed(failure) => failure.to_value(),
        }
    }
}
