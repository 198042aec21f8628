//! Prompt construction for movie questions.
//!
//! Each question type maps to a fixed instruction prefix. Prompts are always
//! assembled in the same order: prefix, retrieved context, question.

use crate::question::QuestionType;

/// Appended to every instruction prefix.
pub const BREVITY_DIRECTIVE: &str = "Answer briefly, without embellishment.";

/// Leads the system turn of a tool-assisted run.
pub const DISPATCH_DIRECTIVE: &str = "Answer this question with the exact content only. \
Option numbers are not required. The answer will be used as-is for verification, so do not \
format it. Numbers can also be used. Avoid unnecessary literals. Use the tools available to you.";

/// Builds prompts from question types and retrieved context.
pub struct PromptBuilder;

impl PromptBuilder {
    /// The bare instruction for a question type.
    pub fn base_instruction(kind: QuestionType) -> &'static str {
        match kind {
            QuestionType::MultipleChoice => "Please choose the correct option:",
            QuestionType::TrueOrFalse => {
                "Is the following statement true or false: answer in true or false in lower case without \".\""
            }
            QuestionType::PopularChoice => "What is the most popular choice for:",
            QuestionType::Estimation => "Please estimate the value of: Answer only in numbers.",
            QuestionType::Unrecognized => "Here is what you need to do:",
        }
    }

    /// Instruction prefix for a question type, including the brevity directive.
    pub fn instruction_prefix(kind: QuestionType) -> String {
        format!("{} {}", Self::base_instruction(kind), BREVITY_DIRECTIVE)
    }

    /// Single-turn prompt: prefix, then context (if any), then the question.
    pub fn compose(prefix: &str, context: Option<&str>, question: &str) -> String {
        match context.filter(|c| !c.trim().is_empty()) {
            Some(ctx) => format!("{} Context: {} Question: {}", prefix, ctx.trim(), question),
            None => format!("{} Question: {}", prefix, question),
        }
    }

    /// System turn for a tool-assisted run. Context, when present, follows the prefix.
    pub fn dispatch_instruction(prefix: &str, context: Option<&str>) -> String {
        match context.filter(|c| !c.trim().is_empty()) {
            Some(ctx) => format!("{} {} Context: {}", DISPATCH_DIRECTIVE, prefix, ctx.trim()),
            None => format!("{} {}", DISPATCH_DIRECTIVE, prefix),
        }
    }
}
