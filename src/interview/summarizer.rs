//! Final feedback report.
//!
//! Digests are computed deterministically from the history; the text
//! generator only phrases them. A blank completion falls back to a
//! rendering of the digests alone.

use chrono::Utc;
use tracing::{info, warn};

use super::{
    has_evidence, FeedbackReport, Grade, ScoreRecord, SectionDigest, SessionState, Stage,
    StageCore, Turn,
};
use crate::error::AppResult;
use crate::langbase::{Message, PipeRequest};
use crate::prompts::SUMMARY_PROMPT;

const RULE: &str = "=======================================";
const NOT_APPLICABLE: &str = "not applicable";

/// One turn filed under a category, with its score if any.
#[derive(Debug, Clone, Copy)]
pub struct FiledTurn<'a> {
    pub turn: &'a Turn,
    pub score: Option<&'a ScoreRecord>,
}

/// Writes the report once the decider ends the interview.
#[derive(Clone)]
pub struct Summarizer {
    core: StageCore,
    pipe_name: String,
}

impl Summarizer {
    /// Create a summarizer for the given pipe
    pub fn new(core: StageCore, pipe_name: impl Into<String>) -> Self {
        Self {
            core,
            pipe_name: pipe_name.into(),
        }
    }

    /// Turns grouped by declared category, in declaration order.
    ///
    /// Turns whose category is missing or unknown are filed under the first
    /// declared category.
    pub fn group_turns(state: &SessionState) -> Vec<(String, Vec<FiledTurn<'_>>)> {
        let names = state.strategies.names();
        let mut groups: Vec<(String, Vec<FiledTurn<'_>>)> = names
            .iter()
            .map(|name| (name.to_string(), Vec::new()))
            .collect();
        if groups.is_empty() {
            return groups;
        }

        for (index, turn) in state.turns.iter().enumerate() {
            let slot = state
                .strategies
                .position(turn.strategy.trim())
                .unwrap_or(0);
            groups[slot].1.push(FiledTurn {
                turn,
                score: state.scores.get(index),
            });
        }
        groups
    }

    /// Deterministic digest for one category.
    pub fn digest(category: &str, filed: &[FiledTurn<'_>]) -> SectionDigest {
        let scores: Vec<&ScoreRecord> = filed.iter().filter_map(|f| f.score).collect();
        let tendency = |pick: fn(&ScoreRecord) -> Grade| {
            if scores.is_empty() {
                return None;
            }
            let total: u32 = scores.iter().map(|s| pick(*s).ordinal() as u32).sum();
            let mean = total as f64 / scores.len() as f64;
            Some(Grade::from_ordinal(mean.round() as u8))
        };

        let turn_count = filed.len();
        let evidence_present = filed.iter().any(|f| has_evidence(&f.turn.answer));
        let low_count = scores.iter().filter(|s| s.has_low()).count();
        let mostly_low = !scores.is_empty() && low_count * 2 > scores.len();

        SectionDigest {
            category: category.to_string(),
            turn_count,
            relevance: tendency(|s| s.relevance),
            specificity: tendency(|s| s.specificity),
            evidence_present,
            mostly_low,
            strengths_allowed: turn_count > 0 && evidence_present && !mostly_low,
        }
    }

    /// Digests for every declared category.
    pub fn digests(state: &SessionState) -> Vec<SectionDigest> {
        Self::group_turns(state)
            .iter()
            .map(|(category, filed)| Self::digest(category, filed))
            .collect()
    }

    /// Per-category material block handed to the model.
    pub fn materials(state: &SessionState) -> String {
        let groups = Self::group_turns(state);
        if groups.is_empty() {
            return "(no conversation)".to_string();
        }

        groups
            .iter()
            .map(|(category, filed)| {
                let digest = Self::digest(category, filed);
                if filed.is_empty() {
                    return format!("[{}] (no turns)", category);
                }

                let mut lines = vec![format!("[{}]", category)];
                for (n, f) in filed.iter().enumerate() {
                    let evaluation = f
                        .score
                        .map(|s| format!("relevance: {}, specificity: {}", s.relevance, s.specificity))
                        .unwrap_or_else(|| "no evaluation".to_string());
                    lines.push(format!("- ({}) Q: {}", n + 1, f.turn.question));
                    lines.push(format!("      A: {}", f.turn.answer));
                    lines.push(format!("      Evaluation: {}", evaluation));
                }
                lines.push(format!(
                    "  Evidence present: {}; mostly low: {}; strengths allowed: {}",
                    yes_no(digest.evidence_present),
                    yes_no(digest.mostly_low),
                    yes_no(digest.strengths_allowed)
                ));
                lines.push(format!("  {}", tendency_line(&digest)));
                lines.join("\n")
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Report rendered from digests alone.
    pub fn render_fallback(state: &SessionState, digests: &[SectionDigest]) -> String {
        let groups = Self::group_turns(state);
        let mut out = vec![RULE.to_string(), "[Feedback by category]".to_string(), String::new()];

        for digest in digests {
            out.push(format!("[{}]", digest.category));
            if digest.is_applicable() {
                let first_answer = groups
                    .iter()
                    .find(|(category, _)| *category == digest.category)
                    .and_then(|(_, filed)| filed.first())
                    .map(|f| f.turn.answer.trim().chars().take(80).collect::<String>());
                out.push(format!(
                    "- Summary: {} answer(s) recorded{}",
                    digest.turn_count,
                    first_answer
                        .map(|a| format!("; first: \"{}\"", a))
                        .unwrap_or_default()
                ));
                out.push(format!(
                    "- Strengths: {}",
                    if digest.strengths_allowed {
                        "answers were supported by concrete evidence"
                    } else {
                        NOT_APPLICABLE
                    }
                ));
                out.push(format!(
                    "- Weaknesses: {}",
                    if digest.mostly_low {
                        "most answers lacked relevance or specificity"
                    } else if !digest.evidence_present {
                        "answers lacked figures, durations or concrete cases"
                    } else {
                        "none recorded"
                    }
                ));
            } else {
                out.push(format!("- Summary: {}", NOT_APPLICABLE));
                out.push(format!("- Strengths: {}", NOT_APPLICABLE));
                out.push(format!("- Weaknesses: {}", NOT_APPLICABLE));
            }
            out.push(format!("- {}", tendency_line(digest)));
            out.push(String::new());
        }

        let strong: Vec<&str> = digests
            .iter()
            .filter(|d| d.strengths_allowed)
            .map(|d| d.category.as_str())
            .collect();
        let weak: Vec<&str> = digests
            .iter()
            .filter(|d| d.is_applicable() && (d.mostly_low || !d.evidence_present))
            .map(|d| d.category.as_str())
            .collect();

        out.push(RULE.to_string());
        out.push("[Overall feedback]".to_string());
        out.push(format!(
            "- Overall impression: {} exchange(s) across {} categor(ies)",
            state.turns.len(),
            digests.iter().filter(|d| d.is_applicable()).count()
        ));
        out.push(format!("- Key strengths: {}", list_or_na(&strong)));
        out.push(format!("- Key improvements: {}", list_or_na(&weak)));
        out.join("\n")
    }

    /// Write the report into the state and end the interview.
    pub async fn summarize(&self, state: &mut SessionState) -> AppResult<()> {
        let digests = Self::digests(state);
        let allowed = state.strategies.names().join(", ");
        let request = PipeRequest::new(
            &self.pipe_name,
            vec![
                Message::system(SUMMARY_PROMPT),
                Message::user(format!(
                    "[Allowed categories, no others]\n- {}\n\n[Material by category]\n{}",
                    allowed,
                    Self::materials(state)
                )),
            ],
        )
        .with_thread_id(&state.session_id);
        let completion = self.core.complete(request).await?;

        let text = if completion.trim().is_empty() {
            warn!(session_id = %state.session_id, "Blank report, rendering from digests");
            Self::render_fallback(state, &digests)
        } else {
            completion.trim().to_string()
        };

        state.report = Some(FeedbackReport {
            text,
            sections: digests,
            generated_at: Utc::now(),
        });
        state.stage = Stage::End;

        info!(
            session_id = %state.session_id,
            turns = state.turns.len(),
            "Interview summarized"
        );
        Ok(())
    }
}

fn tendency_line(digest: &SectionDigest) -> String {
    let label = |g: Option<Grade>| g.map(|g| g.as_str()).unwrap_or(NOT_APPLICABLE);
    format!(
        "Score tendency: relevance: {}, specificity: {}",
        label(digest.relevance),
        label(digest.specificity)
    )
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}

fn list_or_na(items: &[&str]) -> String {
    if items.is_empty() {
        NOT_APPLICABLE.to_string()
    } else {
        items.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::MockTextGenerator;
    use crate::interview::{ResumeProfile, Strategy, StrategyBook, DEFAULT_CATEGORIES};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn state_with(turns: &[(&str, &str, Grade, Grade)]) -> SessionState {
        let book = StrategyBook::new(
            DEFAULT_CATEGORIES
                .iter()
                .map(|n| Strategy::new(*n, "", vec![]))
                .collect(),
        );
        let mut state = SessionState::new(ResumeProfile::default(), book, "Experience", "Q?");
        for (i, (strategy, answer, relevance, specificity)) in turns.iter().enumerate() {
            let index = state.record_turn(Turn {
                question: format!("Q{}?", i),
                answer: answer.to_string(),
                strategy: strategy.to_string(),
            });
            state.upsert_score(ScoreRecord::new(*relevance, *specificity, index));
        }
        state
    }

    #[test]
    fn test_unknown_strategy_filed_under_first_category() {
        let state = state_with(&[
            ("Mystery", "An answer", Grade::Medium, Grade::Medium),
            ("", "Another answer", Grade::Medium, Grade::Medium),
        ]);
        let groups = Summarizer::group_turns(&state);
        assert_eq!(groups.len(), 5);
        assert_eq!(groups[0].0, "Experience");
        assert_eq!(groups[0].1.len(), 2);
    }

    #[test]
    fn test_digest_mostly_low_blocks_strengths() {
        let state = state_with(&[
            ("Experience", "We grew revenue 20% in 6 months", Grade::Low, Grade::Medium),
            ("Experience", "Not sure", Grade::Low, Grade::Low),
            ("Experience", "It went fine", Grade::High, Grade::High),
        ]);
        let digest = &Summarizer::digests(&state)[0];

        assert_eq!(digest.turn_count, 3);
        assert!(digest.evidence_present);
        assert!(digest.mostly_low);
        assert!(!digest.strengths_allowed);
        // (0 + 0 + 2) / 3 rounds to 1
        assert_eq!(digest.relevance, Some(Grade::Medium));
    }

    #[test]
    fn test_digest_requires_evidence_for_strengths() {
        let state = state_with(&[(
            "Logical Thinking",
            "I think carefully about problems",
            Grade::High,
            Grade::High,
        )]);
        let digest = &Summarizer::digests(&state)[2];
        assert!(!digest.evidence_present);
        assert!(!digest.strengths_allowed);

        let state = state_with(&[(
            "Logical Thinking",
            "I profiled 3 services and cut p99 latency by 40%",
            Grade::High,
            Grade::Medium,
        )]);
        assert!(Summarizer::digests(&state)[2].strengths_allowed);
    }

    #[test]
    fn test_empty_category_digest() {
        let digest = Summarizer::digest("Experience", &[]);
        assert!(!digest.is_applicable());
        assert_eq!(digest.relevance, None);
        assert!(!digest.mostly_low);
        assert!(!digest.strengths_allowed);
    }

    #[test]
    fn test_materials_mark_empty_categories() {
        let state = state_with(&[("Experience", "An answer", Grade::Medium, Grade::Low)]);
        let materials = Summarizer::materials(&state);
        assert!(materials.contains("[Experience]\n- (1) Q: Q0?"));
        assert!(materials.contains("[Technical Expertise] (no turns)"));
    }

    #[test]
    fn test_fallback_render_has_every_category_in_order() {
        let state = state_with(&[("Technical Expertise", "ok", Grade::Low, Grade::Low)]);
        let text = Summarizer::render_fallback(&state, &Summarizer::digests(&state));

        let positions: Vec<usize> = DEFAULT_CATEGORIES
            .iter()
            .map(|c| text.find(&format!("[{}]", c)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(text.contains("[Overall feedback]"));
        assert!(text.contains("Score tendency: relevance: low, specificity: low"));
        assert!(text.contains("Score tendency: relevance: not applicable"));
    }

    #[tokio::test]
    async fn test_summarize_stores_report_and_ends() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .withf(|req| req.name == "summary-pipe")
            .returning(|_| Ok("  Final report text  ".to_string()));
        let summarizer = Summarizer::new(StageCore::new(Arc::new(mock), 1000), "summary-pipe");

        let mut state = state_with(&[("Experience", "An answer", Grade::Medium, Grade::Medium)]);
        summarizer.summarize(&mut state).await.unwrap();

        let report = state.report.as_ref().unwrap();
        assert_eq!(report.text, "Final report text");
        assert_eq!(report.sections.len(), 5);
        assert_eq!(state.stage, Stage::End);
        assert!(state.is_finished());
    }

    #[tokio::test]
    async fn test_blank_completion_uses_fallback() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().returning(|_| Ok("   ".to_string()));
        let summarizer = Summarizer::new(StageCore::new(Arc::new(mock), 1000), "summary-pipe");

        let mut state = state_with(&[]);
        summarizer.summarize(&mut state).await.unwrap();

        let text = &state.report.as_ref().unwrap().text;
        assert!(text.starts_with(RULE));
        assert!(text.contains("- Key strengths: not applicable"));
    }
}
