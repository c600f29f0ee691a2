use std::fmt;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::llm::ProviderError;
use crate::pipeline::{ChainError, Comparison, Observation, Role, StockMetrics};
use crate::tools::ToolFailure;

#[derive(Clone, Debug, Serialize)]
pub struct CallRecord {
    pub index: usize,
    pub name: String,
    pub arguments: Value,
    pub error: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct BoundObservation {
    pub role: Role,
    #[serde(flatten)]
    pub observation: Observation,
}

pub fn bound_observations(metrics: &StockMetrics) -> Vec<BoundObservation> {
    Role::ALL
        .into_iter()
        .filter_map(|role| {
            metrics.get(role).map(|obs| BoundObservation {
                role,
                observation: obs.clone(),
            })
        })
        .collect()
}

/// Why a query did not produce a number.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum MissReason {
    NoDollarAmount,
    SearchFailed { failure: ToolFailure },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchMiss {
    pub call_index: usize,
    pub item_index: usize,
    /// Slot the query would have filled; `None` past the sixth query.
    pub role: Option<Role>,
    pub query: String,
    #[serde(flatten)]
    pub reason: MissReason,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DispatchFailure {
    pub call_index: usize,
    pub tool: String,
    pub failure: ToolFailure,
}

#[derive(Clone, Debug, Serialize)]
pub struct ComparisonReport {
    pub comparison: Comparison,
    pub observations: Vec<BoundObservation>,
    pub calls: Vec<CallRecord>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MissingDataReport {
    pub missing: Vec<Role>,
    pub observations: Vec<BoundObservation>,
    pub misses: Vec<SearchMiss>,
    pub failures: Vec<DispatchFailure>,
    pub calls: Vec<CallRecord>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ComputationFailure {
    pub error: ChainError,
    pub observations: Vec<BoundObservation>,
    pub calls: Vec<CallRecord>,
}

/// Terminal state of one comparison session.
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    NoToolCalls { content: String },
    Completed(ComparisonReport),
    MissingData(MissingDataReport),
    ComputationFailed(ComputationFailure),
}

impl SessionOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SessionOutcome::Completed(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SessionOutcome::MissingData(_) | SessionOutcome::ComputationFailed(_)
        )
    }
}

impl fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionOutcome::NoToolCalls { .. } => write!(f, "no tool calls made by the model"),
            SessionOutcome::Completed(report) => f.write_str(&report.comparison.summary),
            SessionOutcome::MissingData(report) => {
                let roles: Vec<&str> = report.missing.iter().map(|r| r.tag()).collect();
                write!(f, "missing data: {}", roles.join(", "))
            }
            SessionOutcome::ComputationFailed(failure) => write!(f, "computation failed: {}", failure.error),
        }
    }
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("model exchange failed: {0}")]
    Exchange(#[from] ProviderError),
}

/// Flattened view of a run for the API and CLI.
#[derive(Clone, Debug, Serialize)]
pub struct AgentResult {
    pub success: bool,
    pub output: String,
    pub run_id: Option<String>,
    pub outcome: Option<SessionOutcome>,
    pub error: Option<String>,
}

impl AgentResult {
    pub fn from_session(run_id: Option<String>, result: Result<SessionOutcome, SessionError>) -> Self {
        match result {
            Ok(outcome) => Self {
                success: !outcome.is_failure(),
                output: outcome.to_string(),
                run_id,
                outcome: Some(outcome),
                error: None,
            },
            Err(err) => Self {
                success: false,
                output: String::new(),
                run_id,
                outcome: None,
                error: Some(err.to_string()),
            },
        }
    }
}
