use std::sync::Arc;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::agent::ComparisonAgent;
use crate::calc::{self, CalcError};
use crate::prompts::ComparisonRequest;
use crate::result::AgentResult;
use crate::tools::{SearchProvider, TransportError};

const SEARCH_SOURCE: &str = "yahoo finance";

/// Shared handler state. Calculation routes need neither field.
#[derive(Clone, Default)]
pub struct AppState {
    pub agent: Option<Arc<ComparisonAgent>>,
    pub search: Option<Arc<dyn SearchProvider>>,
}

impl AppState {
    /// Serves the session API; `/search` reuses the agent's search provider.
    pub fn with_agent(agent: Arc<ComparisonAgent>) -> Self {
        Self {
            search: Some(agent.dispatcher().search_provider()),
            agent: Some(agent),
        }
    }

    pub fn with_search(mut self, search: Arc<dyn SearchProvider>) -> Self {
        self.search = Some(search);
        self
    }
}

type CalcResponse = Result<Json<Value>, (StatusCode, Json<Value>)>;

#[derive(Debug, Deserialize)]
pub struct PriceReturnInput {
    pub initial_price: f64,
    pub final_price: f64,
}

#[derive(Debug, Deserialize)]
pub struct DividendInput {
    pub dividend_total: f64,
    pub initial_price: f64,
}

#[derive(Debug, Deserialize)]
pub struct TotalReturnInput {
    pub price_return: f64,
    pub dividend_yield: f64,
}

#[derive(Debug, Deserialize)]
pub struct CompareInput {
    pub stock_a_name: String,
    pub stock_a_return: f64,
    pub stock_b_name: String,
    pub stock_b_return: f64,
}

#[derive(Debug, Deserialize)]
pub struct SearchInput {
    pub q: String,
}

#[derive(Debug, Deserialize, Default)]
pub struct RunsQuery {
    pub limit: Option<usize>,
}

fn unprocessable(err: CalcError) -> (StatusCode, Json<Value>) {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"error": err.to_string()})))
}

pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "ok", "version": env!("CARGO_PKG_VERSION")}))
}

pub async fn handle_price_return(Json(input): Json<PriceReturnInput>) -> CalcResponse {
    let value = calc::price_return(input.initial_price, input.final_price).map_err(unprocessable)?;
    Ok(Json(json!({"price_return": value})))
}

pub async fn handle_dividend_yield(Json(input): Json<DividendInput>) -> CalcResponse {
    let value = calc::dividend_yield(input.dividend_total, input.initial_price).map_err(unprocessable)?;
    Ok(Json(json!({"dividend_yield": value})))
}

pub async fn handle_total_return(Json(input): Json<TotalReturnInput>) -> CalcResponse {
    let value = calc::total_return(input.price_return, input.dividend_yield).map_err(unprocessable)?;
    Ok(Json(json!({"total_return": value})))
}

pub async fn handle_compare(Json(input): Json<CompareInput>) -> Json<Value> {
    let verdict = calc::compare(
        &input.stock_a_name,
        input.stock_a_return,
        &input.stock_b_name,
        input.stock_b_return,
    );
    Json(json!(verdict))
}

fn error(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({"error": message.into()})))
}

/// SerpAPI proxy. Queries must name Yahoo Finance as their source; upstream
/// error statuses are passed through.
pub async fn handle_search(State(state): State<AppState>, Json(input): Json<SearchInput>) -> (StatusCode, Json<Value>) {
    if !input.q.to_lowercase().contains(SEARCH_SOURCE) {
        return error(StatusCode::FORBIDDEN, "Query must include 'Yahoo Finance' as source.");
    }
    let search = match state.search {
        Some(search) => search,
        None => return error(StatusCode::SERVICE_UNAVAILABLE, "search provider not configured"),
    };

    let result = tokio::task::spawn_blocking(move || search.search(&input.q)).await;
    match result {
        Ok(Ok(body)) => (StatusCode::OK, Json(body)),
        Ok(Err(TransportError::Status { status, body })) => {
            let status = StatusCode::from_u16(status).unwrap_or(StatusCode::BAD_GATEWAY);
            error(status, body)
        }
        Ok(Err(TransportError::Timeout)) => error(StatusCode::GATEWAY_TIMEOUT, "search timed out"),
        Ok(Err(err)) => {
            warn!(error = %err, "search proxy failed");
            error(StatusCode::BAD_GATEWAY, err.to_string())
        }
        Err(err) => error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
    }
}

pub async fn handle_runs(State(state): State<AppState>, Query(query): Query<RunsQuery>) -> Json<Value> {
    let limit = query.limit.unwrap_or(10);
    match state.agent.as_ref().and_then(|agent| agent.runs()) {
        Some(store) => Json(json!({"runs": store.list(limit)})),
        None => Json(json!({"error": "run ledger disabled"})),
    }
}

pub async fn handle_execute(
    State(state): State<AppState>,
    Json(req): Json<ComparisonRequest>,
) -> (StatusCode, Json<Value>) {
    let agent = match state.agent {
        Some(agent) => agent,
        None => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({"error": "agent not configured; serving calculations only"})),
            )
        }
    };
    if req.ticker_a.trim().is_empty() || req.ticker_b.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "ticker_a and ticker_b are required"})),
        );
    }

    let request = ComparisonRequest::new(&req.ticker_a, &req.ticker_b).with_period(&req.period);
    let result = tokio::task::spawn_blocking(move || agent.execute(&request)).await;

    match result {
        Ok(result) => (StatusCode::OK, Json(to_value(result))),
        Err(err) => {
            warn!(error = %err, "session task panicked");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"success": false, "error": err.to_string()})),
            )
        }
    }
}

fn to_value(result: AgentResult) -> Value {
    serde_json::to_value(&result).unwrap_or_else(|err| json!({"success": false, "error": err.to_string()}))
}
