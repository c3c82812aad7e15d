//! Strict re-evaluation of a score the reflector distrusted.

use tracing::{info, warn};

use super::{is_trivial_answer, parse_score_labels, Grade, SessionState, Stage, StageCore};
use crate::error::AppResult;
use crate::langbase::{Message, PipeRequest};
use crate::prompts::RE_EVALUATOR_PROMPT;

/// Replaces the latest score with an independent, stricter assessment.
#[derive(Clone)]
pub struct ReScorer {
    core: StageCore,
    pipe_name: String,
    min_answer_chars: usize,
}

impl ReScorer {
    /// Create a re-scorer for the given pipe
    pub fn new(core: StageCore, pipe_name: impl Into<String>, min_answer_chars: usize) -> Self {
        Self {
            core,
            pipe_name: pipe_name.into(),
            min_answer_chars,
        }
    }

    /// Re-score the current turn in place and route to the decider.
    pub async fn re_evaluate(&self, state: &mut SessionState) -> AppResult<()> {
        let request = PipeRequest::new(
            &self.pipe_name,
            vec![
                Message::system(RE_EVALUATOR_PROMPT),
                Message::user(format!(
                    "[Question]\n{}\n\n[Answer]\n{}",
                    state.current_question, state.current_answer
                )),
            ],
        )
        .with_thread_id(&state.session_id);
        let completion = self.core.complete(request).await?;

        let (mut relevance, mut specificity) = parse_score_labels(&completion).unwrap_or_else(|| {
            warn!(
                session_id = %state.session_id,
                "Unparseable re-evaluation, using neutral score"
            );
            (Grade::Medium, Grade::Medium)
        });

        // The length floor outranks any model verdict
        if is_trivial_answer(&state.current_answer, self.min_answer_chars) {
            relevance = Grade::Low;
            specificity = Grade::Low;
        }

        let previous = state.latest_score().copied();
        state.replace_latest_score(relevance, specificity);
        state.reflect_flag = false;
        state.need_re_eval = false;
        state.stage = Stage::Decide;

        info!(
            session_id = %state.session_id,
            previous = ?previous.map(|s| (s.relevance, s.specificity)),
            relevance = %relevance,
            specificity = %specificity,
            "Score re-evaluated"
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::MockTextGenerator;
    use crate::interview::{ResumeProfile, ScoreRecord, Strategy, StrategyBook, Turn};
    use std::sync::Arc;

    fn flagged_state() -> SessionState {
        let book = StrategyBook::new(vec![Strategy::new("Experience", "", vec![])]);
        let mut state = SessionState::new(ResumeProfile::default(), book, "Experience", "Q?");
        state.set_answer("I care about quality a lot and always deliver great work.");
        let index = state.record_turn(Turn {
            question: "Q?".to_string(),
            answer: state.current_answer.clone(),
            strategy: "Experience".to_string(),
        });
        state.upsert_score(ScoreRecord::new(Grade::High, Grade::High, index));
        state.reflect_flag = true;
        state.need_re_eval = true;
        state
    }

    fn rescorer_returning(completion: &'static str) -> ReScorer {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .withf(|req| req.name == "strict-pipe")
            .times(1)
            .returning(move |_| Ok(completion.to_string()));
        ReScorer::new(StageCore::new(Arc::new(mock), 1000), "strict-pipe", 20)
    }

    #[tokio::test]
    async fn test_re_evaluate_replaces_in_place() {
        let mut state = flagged_state();
        rescorer_returning(r#"{"relevance": "medium", "specificity": "low"}"#)
            .re_evaluate(&mut state)
            .await
            .unwrap();

        assert_eq!(state.scores.len(), 1);
        assert_eq!(state.scores[0], ScoreRecord::new(Grade::Medium, Grade::Low, 0));
        assert!(!state.reflect_flag);
        assert!(!state.need_re_eval);
        assert_eq!(state.stage, Stage::Decide);
    }

    #[tokio::test]
    async fn test_re_evaluate_keeps_trivial_answer_low() {
        for completion in [r#"{"relevance": "high", "specificity": "high"}"#, "no verdict"] {
            let mut state = flagged_state();
            state.set_answer("");
            state.stage = Stage::ReEvaluate;
            rescorer_returning(completion)
                .re_evaluate(&mut state)
                .await
                .unwrap();

            assert_eq!(state.scores.len(), 1);
            assert!(state.scores[0].both(Grade::Low), "{}", completion);
        }
    }

    #[tokio::test]
    async fn test_re_evaluate_malformed_defaults_to_medium() {
        let mut state = flagged_state();
        rescorer_returning("cannot decide")
            .re_evaluate(&mut state)
            .await
            .unwrap();

        assert_eq!(state.scores.len(), 1);
        assert!(state.scores[0].both(Grade::Medium));
    }
}
