//! Single-round tool dispatch.
//!
//! The run moves through `Init -> AwaitingDecision`, then either straight to
//! `Done` (no tool calls) or through `ToolsRequested -> AwaitingFollowUp ->
//! Done`. A follow-up that asks for more tools is not honoured: at most one
//! round of tool use happens per run.

use crate::capabilities::{CapabilityRegistry, CapabilitySpec};
use crate::completion::{Completion, CompletionProvider, ToolCall, Turn};
use crate::error::{CineError, Result};
use crate::question::TokenUsage;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Arguments every capability accepts.
#[derive(Debug, Deserialize)]
struct TitleArgument {
    title: String,
}

/// Record of a capability invoked during a run.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    pub call_id: String,
    pub name: String,
    pub title: String,
    pub result: String,
    pub soft_failure: bool,
}

impl std::fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.name, self.title)
    }
}

/// How the final text was produced.
#[derive(Debug, Clone)]
pub enum DispatchOutcome {
    /// The first completion answered without tools.
    Direct { completion: Completion },
    /// Tools ran and a single follow-up completion answered.
    ToolAssisted {
        follow_up: Completion,
        invocations: Vec<ToolCallRecord>,
        /// Usage of the completion that requested the tools.
        decision_usage: TokenUsage,
    },
}

impl DispatchOutcome {
    /// Completion whose text is the answer.
    pub fn final_completion(&self) -> &Completion {
        match self {
            DispatchOutcome::Direct { completion } => completion,
            DispatchOutcome::ToolAssisted { follow_up, .. } => follow_up,
        }
    }

    pub fn text(&self) -> String {
        self.final_completion().text()
    }

    /// Usage of the call that produced the final text.
    pub fn usage(&self) -> TokenUsage {
        self.final_completion().usage
    }

    /// Usage summed over every completion call in the run.
    pub fn total_usage(&self) -> TokenUsage {
        match self {
            DispatchOutcome::Direct { completion } => completion.usage,
            DispatchOutcome::ToolAssisted {
                follow_up,
                decision_usage,
                ..
            } => *decision_usage + follow_up.usage,
        }
    }

    pub fn invocations(&self) -> &[ToolCallRecord] {
        match self {
            DispatchOutcome::Direct { .. } => &[],
            DispatchOutcome::ToolAssisted { invocations, .. } => invocations,
        }
    }
}

enum DispatchState {
    Init,
    AwaitingDecision(Completion),
    ToolsRequested(Completion),
    AwaitingFollowUp {
        invocations: Vec<ToolCallRecord>,
        decision_usage: TokenUsage,
    },
    Done(DispatchOutcome),
}

/// Runs one question through the model with the registered capabilities.
pub struct ToolDispatchLoop {
    completion: Arc<dyn CompletionProvider>,
    registry: CapabilityRegistry,
}

impl ToolDispatchLoop {
    pub fn new(completion: Arc<dyn CompletionProvider>, registry: CapabilityRegistry) -> Self {
        Self {
            completion,
            registry,
        }
    }

    pub fn registry(&self) -> &CapabilityRegistry {
        &self.registry
    }

    /// Answer `question`, with `instruction` as the system turn.
    #[instrument(skip_all)]
    pub async fn run(&self, question: &str, instruction: &str) -> Result<DispatchOutcome> {
        let catalogue = self.registry.catalogue();
        let mut transcript = vec![Turn::requester(question), Turn::system(instruction)];
        let mut state = DispatchState::Init;

        loop {
            state = match state {
                DispatchState::Init => {
                    let decision = self.completion.complete(&transcript, Some(catalogue.as_slice())).await?;
                    DispatchState::AwaitingDecision(decision)
                }
                DispatchState::AwaitingDecision(decision) => {
                    if decision.requests_tools() {
                        DispatchState::ToolsRequested(decision)
                    } else {
                        debug!("No tool calls requested");
                        DispatchState::Done(DispatchOutcome::Direct {
                            completion: decision,
                        })
                    }
                }
                DispatchState::ToolsRequested(decision) => {
                    let invocations = self.execute_tools(&decision, &catalogue, &mut transcript).await?;
                    DispatchState::AwaitingFollowUp {
                        invocations,
                        decision_usage: decision.usage,
                    }
                }
                DispatchState::AwaitingFollowUp {
                    invocations,
                    decision_usage,
                } => {
                    let follow_up = self.completion.complete(&transcript, None).await?;
                    if follow_up.requests_tools() {
                        warn!(
                            "Follow-up requested {} more tool calls; ignoring",
                            follow_up.tool_calls.len()
                        );
                    }
                    DispatchState::Done(DispatchOutcome::ToolAssisted {
                        follow_up,
                        invocations,
                        decision_usage,
                    })
                }
                DispatchState::Done(outcome) => return Ok(outcome),
            };
        }
    }

    /// Validate every requested call, then run them in order, appending the
    /// assistant turn and one tool-result turn per call.
    async fn execute_tools(
        &self,
        decision: &Completion,
        catalogue: &[CapabilitySpec],
        transcript: &mut Vec<Turn>,
    ) -> Result<Vec<ToolCallRecord>> {
        // Reject the whole response before any capability runs. Unknown
        // names take precedence over malformed arguments.
        if let Some(call) = decision
            .tool_calls
            .iter()
            .find(|call| !catalogue.iter().any(|spec| spec.name == call.name))
        {
            warn!("Model requested unknown tool {}", call.name);
            return Err(CineError::ToolNotFound(call.name.clone()));
        }

        let prepared = decision
            .tool_calls
            .iter()
            .map(|call| parse_title(call).map(|title| (call, title)))
            .collect::<Result<Vec<_>>>()?;

        transcript.push(Turn::assistant(
            decision.content.clone(),
            decision.tool_calls.clone(),
        ));

        let mut records = Vec::with_capacity(prepared.len());
        for (call, title) in prepared {
            let capability = self
                .registry
                .get(&call.name)
                .ok_or_else(|| CineError::ToolNotFound(call.name.clone()))?;

            info!("Calling tool: {} with title {:?}", call.name, title);
            let outcome = capability.lookup(&title).await;
            let soft_failure = outcome.is_soft_failure();
            let result = outcome.into_text();

            transcript.push(Turn::tool_result(&call.id, result.clone()));
            records.push(ToolCallRecord {
                call_id: call.id.clone(),
                name: call.name.clone(),
                title,
                result,
                soft_failure,
            });
        }

        Ok(records)
    }
}

fn parse_title(call: &ToolCall) -> Result<String> {
    serde_json::from_str::<TitleArgument>(&call.arguments)
        .map(|args| args.title)
        .map_err(|e| CineError::InvalidToolArguments {
            name: call.name.clone(),
            reason: e.to_string(),
        })
}
