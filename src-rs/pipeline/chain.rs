use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use super::slots::CompleteMetrics;
use crate::calc;
use crate::tools::{Dispatcher, ToolFailure, ToolKind, ToolResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStep {
    PriceReturn,
    DividendYield,
    TotalReturn,
    Compare,
}

impl ChainStep {
    pub fn tool(self) -> ToolKind {
        match self {
            ChainStep::PriceReturn => ToolKind::CalculatePriceReturn,
            ChainStep::DividendYield => ToolKind::CalculateDividendYield,
            ChainStep::TotalReturn => ToolKind::CalculateTotalReturn,
            ChainStep::Compare => ToolKind::CompareReturns,
        }
    }

    fn output(self) -> &'static str {
        match self {
            ChainStep::PriceReturn => "price_return",
            ChainStep::DividendYield => "dividend_yield",
            ChainStep::TotalReturn => "total_return",
            ChainStep::Compare => "summary",
        }
    }
}

impl fmt::Display for ChainStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tool().name())
    }
}

#[derive(Clone, Debug, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChainError {
    #[error("division by zero: {ticker} has an initial price of 0 at {step}")]
    DivisionByZero { ticker: String, step: ChainStep },
    #[error("{step} for {subject} failed: {failure}")]
    Tool {
        step: ChainStep,
        subject: String,
        failure: ToolFailure,
    },
    #[error("{step} response has no usable '{field}'")]
    MalformedResponse { step: ChainStep, field: &'static str },
    #[error("{step} returned a non-finite {field} ({value})")]
    NonFinite {
        step: ChainStep,
        field: &'static str,
        value: f64,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickerReturns {
    pub ticker: String,
    pub price_return: f64,
    pub dividend_yield: f64,
    pub total_return: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub a: TickerReturns,
    pub b: TickerReturns,
    /// `None` when both total returns are exactly equal.
    pub winner: Option<String>,
    pub margin: f64,
    pub summary: String,
}

/// Wires the four dependent calculation calls together. Each step goes
/// through the dispatcher; nothing is computed here except the zero-price
/// guard and the fallback ranking when the service omits `winner`/`margin`.
pub struct CalculationChain<'a> {
    dispatcher: &'a Dispatcher,
}

impl<'a> CalculationChain<'a> {
    pub fn new(dispatcher: &'a Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn run(&self, ticker_a: &str, ticker_b: &str, metrics: &CompleteMetrics) -> Result<Comparison, ChainError> {
        let a = self.ticker_returns(ticker_a, metrics.a_initial, metrics.a_final, metrics.a_dividend)?;
        let b = self.ticker_returns(ticker_b, metrics.b_initial, metrics.b_final, metrics.b_dividend)?;
        self.compare(a, b)
    }

    pub fn ticker_returns(
        &self,
        ticker: &str,
        initial_price: f64,
        final_price: f64,
        dividend_total: f64,
    ) -> Result<TickerReturns, ChainError> {
        if initial_price == 0.0 {
            warn!(ticker, "initial price is zero");
            return Err(ChainError::DivisionByZero {
                ticker: ticker.to_string(),
                step: ChainStep::PriceReturn,
            });
        }

        let price_return = self.number_step(
            ChainStep::PriceReturn,
            ticker,
            json!({"initial_price": initial_price, "final_price": final_price}),
        )?;
        let dividend_yield = self.number_step(
            ChainStep::DividendYield,
            ticker,
            json!({"dividend_total": dividend_total, "initial_price": initial_price}),
        )?;
        let total_return = self.number_step(
            ChainStep::TotalReturn,
            ticker,
            json!({"price_return": price_return, "dividend_yield": dividend_yield}),
        )?;

        info!(ticker, price_return, dividend_yield, total_return, "ticker returns computed");
        Ok(TickerReturns {
            ticker: ticker.to_string(),
            price_return,
            dividend_yield,
            total_return,
        })
    }

    pub fn compare(&self, a: TickerReturns, b: TickerReturns) -> Result<Comparison, ChainError> {
        let step = ChainStep::Compare;
        let subject = format!("{} vs {}", a.ticker, b.ticker);
        let response = self.call(
            step,
            &subject,
            json!({
                "stock_a_name": a.ticker,
                "stock_a_return": a.total_return,
                "stock_b_name": b.ticker,
                "stock_b_return": b.total_return,
            }),
        )?;

        let summary = response
            .get("summary")
            .and_then(|v| v.as_str())
            .ok_or(ChainError::MalformedResponse {
                step,
                field: "summary",
            })?
            .to_string();

        // older services only return the summary
        let fallback = calc::compare(&a.ticker, a.total_return, &b.ticker, b.total_return);
        let winner = match response.get("winner") {
            Some(Value::String(name)) => Some(name.clone()),
            Some(Value::Null) => None,
            _ => fallback.winner,
        };
        let margin = match response.get("margin").and_then(|v| v.as_f64()) {
            Some(margin) => finite(step, "margin", margin)?,
            None => fallback.margin,
        };

        info!(winner = ?winner, margin, "comparison complete");
        Ok(Comparison {
            a,
            b,
            winner,
            margin,
            summary,
        })
    }

    fn number_step(&self, step: ChainStep, subject: &str, args: Value) -> Result<f64, ChainError> {
        let response = self.call(step, subject, args)?;
        let field = step.output();
        let value = response
            .get(field)
            .and_then(|v| v.as_f64())
            .ok_or(ChainError::MalformedResponse { step, field })?;
        finite(step, field, value)
    }

    fn call(&self, step: ChainStep, subject: &str, args: Value) -> Result<Map<String, Value>, ChainError> {
        match self.dispatcher.dispatch_kind(step.tool(), &args) {
            ToolResult::Calculation(map) => Ok(map),
            ToolResult::Failed(failure) => Err(ChainError::Tool {
                step,
                subject: subject.to_string(),
                failure,
            }),
            ToolResult::Search(_) => Err(ChainError::MalformedResponse {
                step,
                field: step.output(),
            }),
        }
    }
}

fn finite(step: ChainStep, field: &'static str, value: f64) -> Result<f64, ChainError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(ChainError::NonFinite { step, field, value })
    }
}
