//! Turn-by-turn interview orchestration.
//!
//! Each answered question runs through a small stage graph:
//! - [`Evaluator`]: scores the answer and records the turn
//! - [`Reflector`]: audits the score with cheap heuristics
//! - [`ReScorer`]: one stricter re-assessment when the audit fails
//! - [`Decider`]: ends the interview, follows up, or rotates category
//! - [`QuestionGenerator`]: phrases the next question with acceptance/fallback rules
//! - [`Summarizer`]: writes the feedback report once the interview ends
//!
//! [`RoutingTable`] wires the stages together and [`Interviewer`] drives one
//! turn at a time over a [`SessionState`].

mod core;
mod decider;
mod evaluator;
mod generator;
mod orchestrator;
mod reflector;
mod rescorer;
mod router;
mod session;
mod state;
mod summarizer;

pub use self::core::*;
pub use decider::*;
pub use evaluator::*;
pub use generator::*;
pub use orchestrator::*;
pub use reflector::*;
pub use rescorer::*;
pub use router::*;
pub use session::*;
pub use state::*;
pub use summarizer::*;

use tracing::warn;

/// Serialize a value to JSON for invocation logs, with warning on failure.
pub(crate) fn serialize_for_log<T: serde::Serialize>(
    value: &T,
    context: &str,
) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        warn!(
            error = %e,
            context = %context,
            "Failed to serialize value for invocation log"
        );
        serde_json::json!({
            "serialization_error": e.to_string(),
            "context": context
        })
    })
}

/// Extract JSON from a completion string, handling markdown code blocks.
///
/// Tries raw JSON first, then a ```json fenced block, then any fenced block.
pub(crate) fn extract_json_from_completion(completion: &str) -> Result<&str, String> {
    let trimmed = completion.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return Ok(trimmed);
    }

    if completion.contains("```json") {
        return completion
            .split("```json")
            .nth(1)
            .and_then(|s| s.split("```").next())
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ```json block but content was empty or malformed".to_string());
    }

    if completion.contains("```") {
        return completion
            .split("```")
            .nth(1)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| "Found ``` block but content was empty or malformed".to_string());
    }

    // Prose around a bare object
    if let (Some(open), Some(close)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if open < close {
            return Ok(&trimmed[open..=close]);
        }
    }

    Err(format!(
        "No JSON found in response. First 100 chars: '{}'",
        completion.chars().take(100).collect::<String>()
    ))
}

/// Empty or shorter than `min_chars` after trimming; such answers always score low/low.
pub fn is_trivial_answer(answer: &str, min_chars: usize) -> bool {
    answer.trim().chars().count() < min_chars
}

/// Parse the two ordinal labels out of a scoring completion.
///
/// Accepts English keys (`relevance`, `specificity`) or the Korean keys the
/// original pipes emitted. Returns `None` on any shape mismatch.
pub(crate) fn parse_score_labels(completion: &str) -> Option<(Grade, Grade)> {
    let json = extract_json_from_completion(completion).ok()?;
    let value: serde_json::Value = serde_json::from_str(json).ok()?;
    let object = value.as_object()?;

    let label = |keys: &[&str]| {
        keys.iter()
            .find_map(|k| object.get(*k))
            .and_then(|v| v.as_str())
            .and_then(Grade::parse_label)
    };

    let relevance = label(&["relevance", "Relevance", "질문과의 연관성"])?;
    let specificity = label(&["specificity", "Specificity", "답변의 구체성"])?;
    Some((relevance, specificity))
}
