//! Fake collaborators shared by the integration tests.
//!
//! None of these touch the network: the model replays a scripted answer,
//! search answers from a query → snippet table, and the calculation service
//! runs the crate's own formulas in-process.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Map, Value};

use stock_agent_rs::calc;
use stock_agent_rs::config::{AgentConfig, SearchConfig};
use stock_agent_rs::llm::{
    CompletionRequest, LLMResponse, LLMRouter, ProviderAdapter, ProviderError, ToolCall,
};
use stock_agent_rs::tools::{CalculationService, Dispatcher, SearchProvider, TransportError};
use stock_agent_rs::ComparisonAgent;

pub const QUERIES: [&str; 6] = [
    "AAPL stock price 1 year ago",
    "AAPL current stock price",
    "MSFT stock price 1 year ago",
    "MSFT current stock price",
    "AAPL dividends last 1 year",
    "MSFT dividends last 1 year",
];

/// Model that always answers with the same response (or error).
pub struct ScriptedModel {
    response: Result<LLMResponse, ProviderError>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn with_calls(tool_calls: Vec<ToolCall>) -> Self {
        Self {
            response: Ok(LLMResponse {
                content: String::new(),
                tool_calls,
                raw: None,
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn answering(content: &str) -> Self {
        Self {
            response: Ok(LLMResponse {
                content: content.to_string(),
                tool_calls: Vec::new(),
                raw: None,
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            response: Err(ProviderError::new("network_error", "connection refused")),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl ProviderAdapter for ScriptedModel {
    fn complete(&self, request: CompletionRequest) -> Result<LLMResponse, ProviderError> {
        self.requests.lock().unwrap().push(request);
        self.response.clone()
    }
}

/// Search that answers from a query → snippet table. Each page carries one
/// snippet plus an entry without one. Unknown queries get an empty result
/// page; queries listed in `offline` fail at the transport level.
#[derive(Default)]
pub struct TableSearch {
    snippets: HashMap<String, String>,
    offline: Vec<String>,
    pub seen: Mutex<Vec<String>>,
}

impl TableSearch {
    pub fn new(rows: &[(&str, &str)]) -> Self {
        Self {
            snippets: rows.iter().map(|(q, s)| (q.to_string(), s.to_string())).collect(),
            ..Default::default()
        }
    }

    pub fn with_offline(mut self, query: &str) -> Self {
        self.offline.push(query.to_string());
        self
    }
}

impl SearchProvider for TableSearch {
    fn search(&self, query: &str) -> Result<Value, TransportError> {
        self.seen.lock().unwrap().push(query.to_string());
        if self.offline.iter().any(|q| q == query) {
            return Err(TransportError::Request("connection reset".to_string()));
        }
        Ok(match self.snippets.get(query) {
            Some(snippet) => json!({"organic_results": [
                {"title": query, "snippet": snippet},
                {"title": "related", "link": "https://example.com"}
            ]}),
            None => json!({"organic_results": []}),
        })
    }
}

/// Calculation service backed by the in-crate formulas.
#[derive(Default)]
pub struct LocalCalc {
    pub calls: Mutex<Vec<(String, Map<String, Value>)>>,
    failing: Option<String>,
    summary_only: bool,
}

impl LocalCalc {
    pub fn failing_on(endpoint: &str) -> Self {
        Self {
            failing: Some(endpoint.to_string()),
            ..Default::default()
        }
    }

    /// Mimics a service whose `/compare` returns only `summary`.
    pub fn summary_only() -> Self {
        Self {
            summary_only: true,
            ..Default::default()
        }
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.calls.lock().unwrap().iter().map(|(e, _)| e.clone()).collect()
    }
}

fn num(payload: &Map<String, Value>, key: &str) -> f64 {
    payload.get(key).and_then(|v| v.as_f64()).unwrap_or(f64::NAN)
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

impl CalculationService for LocalCalc {
    fn call(&self, endpoint: &str, payload: &Map<String, Value>) -> Result<Map<String, Value>, TransportError> {
        self.calls.lock().unwrap().push((endpoint.to_string(), payload.clone()));
        if self.failing.as_deref() == Some(endpoint) {
            return Err(TransportError::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        let unprocessable = |err: calc::CalcError| TransportError::Status {
            status: 422,
            body: err.to_string(),
        };
        let response = match endpoint {
            "price-return" => json!({
                "price_return": calc::price_return(num(payload, "initial_price"), num(payload, "final_price"))
                    .map_err(unprocessable)?
            }),
            "dividend-yield" => json!({
                "dividend_yield": calc::dividend_yield(num(payload, "dividend_total"), num(payload, "initial_price"))
                    .map_err(unprocessable)?
            }),
            "total-return" => json!({
                "total_return": calc::total_return(num(payload, "price_return"), num(payload, "dividend_yield"))
                    .map_err(unprocessable)?
            }),
            "compare" => {
                let verdict = calc::compare(
                    payload.get("stock_a_name").and_then(|v| v.as_str()).unwrap_or_default(),
                    num(payload, "stock_a_return"),
                    payload.get("stock_b_name").and_then(|v| v.as_str()).unwrap_or_default(),
                    num(payload, "stock_b_return"),
                );
                if self.summary_only {
                    json!({"summary": verdict.summary})
                } else {
                    json!(verdict)
                }
            }
            other => {
                return Err(TransportError::Status {
                    status: 404,
                    body: format!("no endpoint {}", other),
                })
            }
        };
        Ok(object(response))
    }
}

/// Snippets for the textbook scenario: AAPL 100 → 120 paying 2, MSFT 200 → 210 paying 3.
pub fn textbook_search() -> TableSearch {
    TableSearch::new(&[
        (QUERIES[0], "Apple closed at $100.00 one year ago."),
        (QUERIES[1], "AAPL trades at $120 today, up from $100."),
        (QUERIES[2], "Microsoft stock was $200.00 a year ago."),
        (QUERIES[3], "MSFT last price $210.00."),
        (QUERIES[4], "Apple paid $2.00 in dividends over the last year."),
        (QUERIES[5], "Microsoft paid $3 per share in dividends."),
    ])
}

pub fn search_call(queries: &[&str]) -> ToolCall {
    ToolCall::new("search_stock_data", json!({ "query": queries }))
}

pub fn test_config() -> AgentConfig {
    let mut cfg = AgentConfig::new(SearchConfig::new("test-key"));
    cfg.provider = "scripted".to_string();
    cfg.model = "scripted-model".to_string();
    cfg
}

pub struct Harness {
    pub agent: ComparisonAgent,
    pub model: Arc<ScriptedModel>,
    pub search: Arc<TableSearch>,
    pub calc: Arc<LocalCalc>,
}

pub fn harness(model: ScriptedModel, search: TableSearch, calc: LocalCalc) -> Harness {
    let model = Arc::new(model);
    let search = Arc::new(search);
    let calc = Arc::new(calc);

    let mut router = LLMRouter::new("scripted");
    router.register_provider("scripted", model.clone());
    let dispatcher = Dispatcher::new(search.clone(), calc.clone());
    let agent = ComparisonAgent::new("test-agent", test_config(), router, dispatcher);

    Harness {
        agent,
        model,
        search,
        calc,
    }
}

pub fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-9
}
