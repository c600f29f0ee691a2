use std::fmt;

use tracing::{info, warn};

use crate::config::AgentConfig;
use crate::error::AgentError;
use crate::helpers::{build_dispatcher, build_llm_router};
use crate::llm::{CompletionRequest, LLMRouter, ToolCall};
use crate::pipeline::{extract, CalculationChain, SlotMapper};
use crate::prompts::{self, ComparisonRequest};
use crate::result::{
    bound_observations, AgentResult, CallRecord, ComparisonReport, ComputationFailure, DispatchFailure,
    MissReason, MissingDataReport, SearchMiss, SessionError, SessionOutcome,
};
use crate::runs::{RunStatus, RunStore};
use crate::tools::{Dispatcher, ToolFailure, ToolResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Start,
    AwaitingModelResponse,
    DispatchingCalls,
    MappingObservations,
    Computing,
    Done,
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Start => "start",
            SessionState::AwaitingModelResponse => "awaiting_model_response",
            SessionState::DispatchingCalls => "dispatching_calls",
            SessionState::MappingObservations => "mapping_observations",
            SessionState::Computing => "computing",
            SessionState::Done => "done",
            SessionState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Drives one prompt → tool calls → extraction → calculation session.
pub struct ComparisonAgent {
    pub name: String,
    pub config: AgentConfig,
    router: LLMRouter,
    dispatcher: Dispatcher,
    runs: Option<RunStore>,
}

impl ComparisonAgent {
    pub fn new(name: &str, config: AgentConfig, router: LLMRouter, dispatcher: Dispatcher) -> Self {
        let resolved_name = if name.is_empty() { "stock-agent" } else { name };
        let runs = if config.enable_run_store {
            Some(RunStore::new(config.runs_file.clone()))
        } else {
            None
        };
        Self {
            name: resolved_name.to_string(),
            config,
            router,
            dispatcher,
            runs,
        }
    }

    /// Builds the HTTP-backed model router and dispatcher from `config`.
    pub fn from_config(name: &str, config: AgentConfig) -> Result<Self, AgentError> {
        let router = build_llm_router(&config)?;
        let dispatcher = build_dispatcher(&config)?;
        Ok(Self::new(name, config, router, dispatcher))
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn runs(&self) -> Option<&RunStore> {
        self.runs.as_ref()
    }

    /// Runs a session and records it in the run ledger.
    pub fn execute(&self, request: &ComparisonRequest) -> AgentResult {
        let run_id = self.runs.as_ref().map(|store| {
            let id = store.create(request).id;
            store.update(&id, RunStatus::Running, None, None);
            id
        });

        let result = self.run(request);

        if let (Some(store), Some(id)) = (&self.runs, run_id.as_ref()) {
            let _ = match &result {
                Ok(SessionOutcome::NoToolCalls { .. }) => store.update(id, RunStatus::NoOp, None, None),
                Ok(SessionOutcome::Completed(report)) => store.update(
                    id,
                    RunStatus::Completed,
                    Some(report.comparison.summary.clone()),
                    None,
                ),
                Ok(outcome) => store.update(id, RunStatus::Failed, None, Some(outcome.to_string())),
                Err(err) => store.update(id, RunStatus::Failed, None, Some(err.to_string())),
            };
        }

        AgentResult::from_session(run_id, result)
    }

    pub fn run(&self, request: &ComparisonRequest) -> Result<SessionOutcome, SessionError> {
        enter(SessionState::Start);
        info!(agent = %self.name, a = %request.ticker_a, b = %request.ticker_b, period = %request.period, "comparison requested");

        enter(SessionState::AwaitingModelResponse);
        let response = self.router.complete(CompletionRequest {
            messages: prompts::messages(request),
            tools: Some(self.dispatcher.registry().schemas()),
            temperature: Some(self.config.temperature),
            model: Some(self.config.model.clone()),
            provider: Some(self.config.provider.clone()),
        })?;

        if response.tool_calls.is_empty() {
            info!("model proposed no tool calls");
            return Ok(SessionOutcome::NoToolCalls {
                content: response.content,
            });
        }

        enter(SessionState::DispatchingCalls);
        let (calls, results) = self.dispatch_all(&response.tool_calls);

        enter(SessionState::MappingObservations);
        let mut mapper = SlotMapper::new();
        let mut misses = Vec::new();
        let mut failures = Vec::new();

        for (call_index, (call, result)) in response.tool_calls.iter().zip(&results).enumerate() {
            match result {
                ToolResult::Search(items) => {
                    for (item_index, item) in items.iter().enumerate() {
                        let role = SlotMapper::target(item_index, &item.query);
                        let reason = match &item.payload {
                            Ok(payload) => match extract(payload) {
                                Some(value) => {
                                    info!(call_index, item_index, value, "parsed numeric value from search");
                                    mapper.record(call_index, item_index, &item.query, Some(value));
                                    continue;
                                }
                                None => MissReason::NoDollarAmount,
                            },
                            Err(failure) => MissReason::SearchFailed {
                                failure: failure.clone(),
                            },
                        };
                        warn!(call_index, item_index, query = %item.query.text, "no value extracted");
                        misses.push(SearchMiss {
                            call_index,
                            item_index,
                            role,
                            query: item.query.text.clone(),
                            reason,
                        });
                    }
                }
                ToolResult::Failed(failure) => failures.push(DispatchFailure {
                    call_index,
                    tool: call.name.clone(),
                    failure: failure.clone(),
                }),
                ToolResult::Calculation(_) => {}
            }
        }

        let metrics = mapper.into_metrics();
        let observations = bound_observations(&metrics);
        let complete = match metrics.complete() {
            Ok(complete) => complete,
            Err(missing) => {
                enter(SessionState::Failed);
                warn!(missing = ?missing, "missing data, check search extraction");
                return Ok(SessionOutcome::MissingData(MissingDataReport {
                    missing,
                    observations,
                    misses,
                    failures,
                    calls,
                }));
            }
        };

        enter(SessionState::Computing);
        let chain = CalculationChain::new(&self.dispatcher);
        match chain.run(&request.ticker_a, &request.ticker_b, &complete) {
            Ok(comparison) => {
                enter(SessionState::Done);
                info!(summary = %comparison.summary, "final comparison");
                Ok(SessionOutcome::Completed(ComparisonReport {
                    comparison,
                    observations,
                    calls,
                }))
            }
            Err(error) => {
                enter(SessionState::Failed);
                warn!(%error, "calculation chain aborted");
                Ok(SessionOutcome::ComputationFailed(ComputationFailure {
                    error,
                    observations,
                    calls,
                }))
            }
        }
    }

    fn dispatch_all(&self, tool_calls: &[ToolCall]) -> (Vec<CallRecord>, Vec<ToolResult>) {
        tool_calls
            .iter()
            .enumerate()
            .map(|(index, call)| {
                let (arguments, result) = match call.arguments() {
                    Ok(arguments) => {
                        info!(index, tool = %call.name, args = %arguments, "dispatching tool call");
                        let result = self.dispatcher.dispatch(&call.name, &arguments);
                        (arguments, result)
                    }
                    Err(reason) => {
                        warn!(index, tool = %call.name, %reason, "undecodable tool arguments");
                        let failure = ToolFailure::InvalidArguments {
                            tool: call.name.clone(),
                            reason,
                        };
                        (call.args.clone(), ToolResult::Failed(failure))
                    }
                };
                let record = CallRecord {
                    index,
                    name: call.name.clone(),
                    arguments,
                    error: result.failure().map(|f| f.to_string()),
                };
                (record, result)
            })
            .unzip()
    }
}

fn enter(state: SessionState) {
    info!(%state, "session state");
}
