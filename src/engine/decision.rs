//! Round termination policy.

use crate::llm::{ModelResponse, StopReason};

/// Answer returned when the final response carries no usable text.
pub const FALLBACK_ANSWER: &str =
    "I apologize, but I was unable to generate a complete response. Please try rephrasing your question.";

/// What to do after a model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundDecision {
    /// Execute the requested tools and run another round.
    Continue,
    /// Finish with this answer.
    StopWithText(String),
    /// Finish, but the response had no text to return.
    StopWithFallback,
}

impl RoundDecision {
    /// The answer this decision finishes with, if it finishes.
    pub fn into_answer(self) -> Option<String> {
        match self {
            RoundDecision::Continue => None,
            RoundDecision::StopWithText(text) => Some(text),
            RoundDecision::StopWithFallback => Some(FALLBACK_ANSWER.to_string()),
        }
    }
}

/// Decide whether `response`, produced in 1-based round `round` of `budget`,
/// ends the conversation.
///
/// Continuing requires budget left, a `tool_use` stop reason, at least one
/// tool-use block and no non-blank text. Text accompanying tool use is taken
/// as the final answer and the tool requests are ignored.
pub fn decide(response: &ModelResponse, round: usize, budget: usize) -> RoundDecision {
    let text = response.first_text();

    let wants_tools = response.stop_reason == StopReason::ToolUse && response.has_tool_use();
    if round < budget && wants_tools && text.is_none() {
        return RoundDecision::Continue;
    }

    match text {
        Some(text) => RoundDecision::StopWithText(text.to_string()),
        None => RoundDecision::StopWithFallback,
    }
}
