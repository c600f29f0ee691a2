use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::registry::ToolRegistry;
use super::types::{SearchItem, SearchQuery, ToolFailure, ToolKind, ToolRequest, ToolResult, TransportError};
use crate::pipeline::Role;

/// Web search collaborator: one query in, one raw result payload out.
pub trait SearchProvider: Send + Sync {
    fn search(&self, query: &str) -> Result<Value, TransportError>;
}

/// Remote calculation collaborator: flat JSON map in, flat JSON map out.
pub trait CalculationService: Send + Sync {
    fn call(&self, endpoint: &str, payload: &Map<String, Value>) -> Result<Map<String, Value>, TransportError>;
}

pub struct Dispatcher {
    registry: ToolRegistry,
    search: Arc<dyn SearchProvider>,
    calc: Arc<dyn CalculationService>,
}

impl Dispatcher {
    pub fn new(search: Arc<dyn SearchProvider>, calc: Arc<dyn CalculationService>) -> Self {
        Self {
            registry: ToolRegistry::new(),
            search,
            calc,
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn search_provider(&self) -> Arc<dyn SearchProvider> {
        Arc::clone(&self.search)
    }

    /// Runs one model-proposed call. Never panics on bad input; every problem
    /// comes back as [`ToolResult::Failed`].
    pub fn dispatch(&self, name: &str, args: &Value) -> ToolResult {
        match self.registry.resolve(name) {
            ToolRequest::Known(kind) => self.dispatch_kind(kind, args),
            ToolRequest::Unknown(name) => {
                warn!(tool = %name, "model requested unknown tool");
                ToolResult::Failed(ToolFailure::UnknownTool { name })
            }
        }
    }

    pub fn dispatch_kind(&self, kind: ToolKind, args: &Value) -> ToolResult {
        if let Err(failure) = self.registry.validate(kind, args) {
            warn!(tool = kind.name(), error = %failure, "rejected tool arguments");
            return ToolResult::Failed(failure);
        }
        match kind.endpoint() {
            None => self.run_search(args),
            Some(endpoint) => self.run_calculation(kind, endpoint, args),
        }
    }

    fn run_search(&self, args: &Value) -> ToolResult {
        let kind = ToolKind::SearchStockData;
        let queries = match parse_queries(args) {
            Ok(queries) => queries,
            Err(reason) => return ToolResult::Failed(ToolFailure::invalid(kind, reason)),
        };

        let items = queries
            .into_iter()
            .map(|query| {
                debug!(query = %query.text, "searching");
                let payload = self.search.search(&query.text).map_err(|err| {
                    warn!(query = %query.text, error = %err, "search failed");
                    ToolFailure::transport(kind, err)
                });
                SearchItem { query, payload }
            })
            .collect();
        ToolResult::Search(items)
    }

    fn run_calculation(&self, kind: ToolKind, endpoint: &str, args: &Value) -> ToolResult {
        let payload = match args.as_object() {
            Some(map) => map,
            None => return ToolResult::Failed(ToolFailure::invalid(kind, "arguments must be an object")),
        };
        match self.calc.call(endpoint, payload) {
            Ok(response) => {
                debug!(tool = kind.name(), response = ?response, "calculation response");
                ToolResult::Calculation(response)
            }
            Err(err) => {
                warn!(tool = kind.name(), error = %err, "calculation call failed");
                ToolResult::Failed(ToolFailure::transport(kind, err))
            }
        }
    }
}

/// Reads the ordered query list of a search call.
///
/// Items are plain strings, or `{"query": .., "role": ..}` objects. A `roles`
/// array, when given, tags plain strings by position.
pub fn parse_queries(args: &Value) -> Result<Vec<SearchQuery>, String> {
    let raw = match args.get("query") {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::String(single)) => vec![Value::String(single.clone())],
        _ => return Err("'query' must be a list of strings".to_string()),
    };
    if raw.is_empty() {
        return Err("'query' must not be empty".to_string());
    }

    let roles: Vec<&str> = match args.get("roles") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(tags)) => tags
            .iter()
            .enumerate()
            .map(|(idx, tag)| tag.as_str().ok_or_else(|| format!("role #{} must be a string", idx + 1)))
            .collect::<Result<_, _>>()?,
        Some(_) => return Err("'roles' must be a list of role names".to_string()),
    };

    let mut queries = Vec::with_capacity(raw.len());
    for (idx, item) in raw.iter().enumerate() {
        let (text, tag) = match item {
            Value::String(text) => (text.clone(), roles.get(idx).copied()),
            Value::Object(obj) => {
                let text = obj
                    .get("query")
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| format!("query #{} has no 'query' text", idx + 1))?;
                (text.to_string(), obj.get("role").and_then(|v| v.as_str()))
            }
            _ => return Err(format!("query #{} must be a string", idx + 1)),
        };
        if text.trim().is_empty() {
            return Err(format!("query #{} is empty", idx + 1));
        }
        let role = match tag {
            Some(tag) => Some(Role::from_tag(tag).ok_or_else(|| format!("unknown role '{}'", tag))?),
            None => None,
        };
        queries.push(SearchQuery { text, role });
    }
    Ok(queries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    struct EchoSearch {
        seen: Mutex<Vec<String>>,
    }

    impl SearchProvider for EchoSearch {
        fn search(&self, query: &str) -> Result<Value, TransportError> {
            self.seen.lock().unwrap().push(query.to_string());
            if query.contains("offline") {
                return Err(TransportError::Request("connection refused".to_string()));
            }
            Ok(json!({"organic_results": [{"snippet": query}]}))
        }
    }

    struct EchoCalc;

    impl CalculationService for EchoCalc {
        fn call(&self, endpoint: &str, payload: &Map<String, Value>) -> Result<Map<String, Value>, TransportError> {
            if endpoint == "total-return" {
                return Err(TransportError::Status {
                    status: 500,
                    body: "boom".to_string(),
                });
            }
            let mut out = payload.clone();
            out.insert("endpoint".to_string(), json!(endpoint));
            Ok(out)
        }
    }

    fn dispatcher() -> (Dispatcher, Arc<EchoSearch>) {
        let search = Arc::new(EchoSearch {
            seen: Mutex::new(Vec::new()),
        });
        (Dispatcher::new(search.clone(), Arc::new(EchoCalc)), search)
    }

    #[test]
    fn unknown_tool_is_an_error_marker() {
        let (dispatcher, _) = dispatcher();
        let result = dispatcher.dispatch("get_weather", &json!({}));
        assert_eq!(result.to_value(), json!({"error": "unknown tool: get_weather"}));
    }

    #[test]
    fn search_preserves_query_order() {
        let (dispatcher, search) = dispatcher();
        let result = dispatcher.dispatch("search_stock_data", &json!({"query": ["one", "two", "three"]}));
        match result {
            ToolResult::Search(items) => {
                let texts: Vec<&str> = items.iter().map(|i| i.query.text.as_str()).collect();
                assert_eq!(texts, vec!["one", "two", "three"]);
            }
            other => panic!("unexpected result: {:?}", other),
        }
        assert_eq!(*search.seen.lock().unwrap(), vec!["one", "two", "three"]);
    }

    #[test]
    fn failed_query_does_not_stop_the_rest() {
        let (dispatcher, _) = dispatcher();
        let result = dispatcher.dispatch("search_stock_data", &json!({"query": ["offline", "after"]}));
        let ToolResult::Search(items) = result else {
            panic!("expected search result");
        };
        assert!(items[0].payload.is_err());
        assert!(items[1].payload.is_ok());
    }

    #[test]
    fn empty_query_list_is_rejected() {
        let (dispatcher, search) = dispatcher();
        let result = dispatcher.dispatch("search_stock_data", &json!({"query": []}));
        assert!(result.is_error());
        assert!(search.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn arithmetic_arguments_are_forwarded_unchanged() {
        let (dispatcher, _) = dispatcher();
        let args = json!({"initial_price": 100.0, "final_price": 120.0});
        let ToolResult::Calculation(map) = dispatcher.dispatch("calculate_price_return", &args) else {
            panic!("expected calculation result");
        };
        assert_eq!(map["endpoint"], "price-return");
        assert_eq!(map["initial_price"], 100.0);
        assert_eq!(map["final_price"], 120.0);
    }

    #[test]
    fn transport_failure_becomes_data() {
        let (dispatcher, _) = dispatcher();
        let result = dispatcher.dispatch(
            "calculate_total_return",
            &json!({"price_return": 1.0, "dividend_yield": 2.0}),
        );
        assert_eq!(
            result.failure(),
            Some(&ToolFailure::Transport {
                tool: "calculate_total_return".to_string(),
                message: "http 500: boom".to_string(),
            })
        );
    }

    #[test]
    fn parse_queries_reads_role_tags() {
        let args = json!({
            "query": ["AAPL now", {"query": "MSFT dividends", "role": "b_dividend"}],
            "roles": ["a_final"]
        });
        let queries = parse_queries(&args).unwrap();
        assert_eq!(queries[0].role, Some(Role::AFinal));
        assert_eq!(queries[1].role, Some(Role::BDiv));

        let bad = parse_queries(&json!({"query": ["x"], "roles": ["c_final"]}));
        assert_eq!(bad.unwrap_err(), "unknown role 'c_final'");
    }

    #[test]
    fn malformed_roles_are_rejected() {
        let bare = parse_queries(&json!({"query": ["x"], "roles": "a_initial"}));
        assert_eq!(bare.unwrap_err(), "'roles' must be a list of role names");

        let mixed = parse_queries(&json!({"query": ["x", "y"], "roles": ["a_initial", 3]}));
        assert_eq!(mixed.unwrap_err(), "role #2 must be a string");

        let (dispatcher, search) = dispatcher();
        let result = dispatcher.dispatch("search_stock_data", &json!({"query": ["x"], "roles": "a_initial"}));
        assert!(matches!(result.failure(), Some(ToolFailure::InvalidArguments { .. })));
        assert!(search.seen.lock().unwrap().is_empty());
    }
}
