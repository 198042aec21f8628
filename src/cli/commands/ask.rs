//! Ask command implementation.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::Orchestrator;
use crate::question::{Question, QuestionType};
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    kind: QuestionType,
    correlation_token: Option<String>,
    settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask, &settings) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let orchestrator = Orchestrator::new(&settings)?;
    let question = Question::new(question, kind).with_correlation_token(correlation_token);

    let spinner = Output::spinner("Thinking...");

    match orchestrator.ask(&question).await {
        Ok(answer) => {
            spinner.finish_and_clear();

            println!("\n{}\n", answer.answer);
            Output::usage(answer.prompt_tokens_used, answer.completion_tokens_used);
            if let Some(token) = &answer.correlation_token {
                Output::kv("Correlation token", token);
            }
        }
        Err(e) => {
            spinner.finish_and_clear();
            Output::error(&format!("Failed to answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
