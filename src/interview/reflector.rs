//! Score reflection - cheap consistency audit before the decider trusts a score.

use tracing::{debug, info};

use super::{Grade, Inconsistency, ReflectionOutcome, ScoreRecord, SessionState, Stage};
use crate::collaborators::tokenize;

/// Answers shorter than this cannot support any score.
pub const MIN_SUPPORTED_CHARS: usize = 40;

/// Low/low scores on answers longer than this are audited for strictness.
pub const STRICT_REVIEW_CHARS: usize = 180;

/// Duration and metric words that ground an answer, matched as whole words
/// (a trailing plural `s` is allowed).
const EVIDENCE_WORDS: &[&str] = &[
    "day", "week", "month", "year", "hour", "minute", "quarter", "sprint", "metric", "kpi",
    "accuracy", "latency", "throughput", "mae", "rmse", "percent",
];

/// Korean unit and metric terms, matched anywhere since they attach to numbers.
const EVIDENCE_SUFFIXES: &[&str] = &["수치", "기간", "개월", "년", "지표", "정확도", "건", "명"];

/// Whether the text contains a digit or a percent sign.
pub fn has_numeric_evidence(text: &str) -> bool {
    text.chars().any(|c| c.is_ascii_digit() || c == '%')
}

/// Whether the text mentions a duration or metric term.
pub fn has_domain_evidence(text: &str) -> bool {
    let word_hit = tokenize(text).any(|token| {
        let singular = token.strip_suffix('s').unwrap_or(token.as_str());
        EVIDENCE_WORDS.contains(&token.as_str()) || EVIDENCE_WORDS.contains(&singular)
    });
    word_hit || EVIDENCE_SUFFIXES.iter().any(|term| text.contains(term))
}

/// Either kind of grounding.
pub fn has_evidence(text: &str) -> bool {
    has_numeric_evidence(text) || has_domain_evidence(text)
}

/// Audits the latest score against the raw answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Reflector;

impl Reflector {
    pub fn new() -> Self {
        Self
    }

    /// First failing check, in priority order.
    pub fn audit(score: &ScoreRecord, answer: &str) -> Option<Inconsistency> {
        let answer = answer.trim();
        let length = answer.chars().count();
        let grounded = has_evidence(answer);

        if length < MIN_SUPPORTED_CHARS {
            Some(Inconsistency::TooShort)
        } else if score.both(Grade::High) && !grounded {
            Some(Inconsistency::OverlyGenerous)
        } else if score.relevance == Grade::Low && score.specificity == Grade::High {
            Some(Inconsistency::Contradictory)
        } else if score.both(Grade::Low) && length > STRICT_REVIEW_CHARS && grounded {
            Some(Inconsistency::OverlyStrict)
        } else {
            None
        }
    }

    /// Accept the score or request exactly one re-evaluation.
    pub fn reflect(&self, state: &mut SessionState) {
        if state.reflect_flag {
            // Score came from a re-evaluation pass
            state.reflect_flag = false;
            state.need_re_eval = false;
            state.reflection = Some(ReflectionOutcome::Accepted);
            state.stage = Stage::Decide;
            debug!(session_id = %state.session_id, "Re-evaluated score accepted");
            return;
        }

        let verdict = state
            .latest_score()
            .and_then(|score| Self::audit(score, &state.current_answer));

        match verdict {
            Some(inconsistency) => {
                state.reflect_flag = true;
                state.need_re_eval = true;
                state.reflection = Some(ReflectionOutcome::NeedsReEvaluation(inconsistency));
                state.stage = Stage::ReEvaluate;
                info!(
                    session_id = %state.session_id,
                    reason = inconsistency.reason(),
                    "Score flagged for re-evaluation"
                );
            }
            None => {
                state.need_re_eval = false;
                state.reflection = Some(ReflectionOutcome::Accepted);
                state.stage = Stage::Decide;
            }
        }
    }
}
