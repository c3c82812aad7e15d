//! Answer evaluation - grades the latest answer and records the turn.

use tracing::{debug, info, warn};

use super::{
    is_trivial_answer, parse_score_labels, Grade, ScoreRecord, SessionState, Stage, StageCore,
    Turn,
};
use crate::error::AppResult;
use crate::langbase::{Message, PipeRequest};
use crate::prompts::EVALUATOR_PROMPT;

/// Grades relevance and specificity of the in-flight answer.
#[derive(Clone)]
pub struct Evaluator {
    core: StageCore,
    pipe_name: String,
    min_answer_chars: usize,
}

impl Evaluator {
    /// Create an evaluator for the given pipe
    pub fn new(core: StageCore, pipe_name: impl Into<String>, min_answer_chars: usize) -> Self {
        Self {
            core,
            pipe_name: pipe_name.into(),
            min_answer_chars,
        }
    }

    /// Score the current answer, append the turn and its score, advance to reflection.
    ///
    /// The state is only touched after the generator call succeeded.
    pub async fn evaluate(&self, state: &mut SessionState) -> AppResult<()> {
        let request = PipeRequest::new(&self.pipe_name, self.build_messages(state))
            .with_thread_id(&state.session_id);
        let completion = self.core.complete(request).await?;

        let (mut relevance, mut specificity) = match parse_score_labels(&completion) {
            Some(labels) => labels,
            None => {
                warn!(
                    session_id = %state.session_id,
                    completion_preview = %completion.chars().take(200).collect::<String>(),
                    "Unparseable evaluation, using neutral score"
                );
                (Grade::Medium, Grade::Medium)
            }
        };

        if self.is_trivial(&state.current_answer) {
            debug!(session_id = %state.session_id, "Answer below minimum length, forcing low scores");
            relevance = Grade::Low;
            specificity = Grade::Low;
        }

        let turn_index = state.record_turn(Turn {
            question: state.current_question.clone(),
            answer: state.current_answer.clone(),
            strategy: state.current_strategy.clone(),
        });
        state.upsert_score(ScoreRecord::new(relevance, specificity, turn_index));
        state.stage = Stage::Reflect;

        info!(
            session_id = %state.session_id,
            turn_index,
            strategy = %state.current_strategy,
            relevance = %relevance,
            specificity = %specificity,
            "Answer evaluated"
        );

        Ok(())
    }

    /// Empty or shorter than the minimum after trimming.
    pub fn is_trivial(&self, answer: &str) -> bool {
        is_trivial_answer(answer, self.min_answer_chars)
    }

    fn build_messages(&self, state: &SessionState) -> Vec<Message> {
        let strategy = state
            .strategies
            .get(&state.current_strategy)
            .map(|s| s.description.as_str())
            .unwrap_or_default();

        vec![
            Message::system(EVALUATOR_PROMPT),
            Message::user(format!(
                "Resume summary: {}\nResume keywords: {}\nFocus area ({}): {}\n\nQuestion: {}\nAnswer: {}",
                state.profile.summary,
                state.profile.keywords.join(", "),
                state.current_strategy,
                strategy,
                state.current_question,
                state.current_answer,
            )),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::MockTextGenerator;
    use crate::error::{AppError, LangbaseError};
    use crate::interview::{ResumeProfile, Strategy, StrategyBook};
    use std::sync::Arc;

    fn state_with_answer(answer: &str) -> SessionState {
        let book = StrategyBook::new(vec![
            Strategy::new("Experience", "projects", vec!["Q1?".to_string()]),
            Strategy::new("Technical Expertise", "depth", vec![]),
        ]);
        let mut state = SessionState::new(ResumeProfile::default(), book, "Experience", "Q1?");
        state.set_answer(answer);
        state
    }

    fn evaluator_returning(completion: &'static str) -> Evaluator {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .withf(|req| req.name == "eval-pipe" && req.messages.len() == 2)
            .returning(move |_| Ok(completion.to_string()));
        Evaluator::new(StageCore::new(Arc::new(mock), 1000), "eval-pipe", 20)
    }

    #[tokio::test]
    async fn test_evaluate_appends_turn_and_score() {
        let mut state = state_with_answer("I led a migration that cut latency by 40% in 3 months.");
        evaluator_returning(r#"{"relevance": "high", "specificity": "medium"}"#)
            .evaluate(&mut state)
            .await
            .unwrap();

        assert_eq!(state.turns.len(), 1);
        assert_eq!(state.scores.len(), 1);
        assert_eq!(state.scores[0], ScoreRecord::new(Grade::High, Grade::Medium, 0));
        assert_eq!(state.turns[0].strategy, "Experience");
        assert_eq!(state.stage, Stage::Reflect);
    }

    #[tokio::test]
    async fn test_short_answer_forced_low() {
        let mut state = state_with_answer("yes");
        evaluator_returning(r#"{"relevance": "high", "specificity": "high"}"#)
            .evaluate(&mut state)
            .await
            .unwrap();

        assert!(state.scores[0].both(Grade::Low));
    }

    #[tokio::test]
    async fn test_empty_answer_forced_low() {
        let mut state = state_with_answer("   ");
        evaluator_returning(r#"{"relevance": "medium", "specificity": "medium"}"#)
            .evaluate(&mut state)
            .await
            .unwrap();

        assert!(state.scores[0].both(Grade::Low));
        assert_eq!(state.turns[0].answer, "   ");
    }

    #[tokio::test]
    async fn test_malformed_output_defaults_to_medium() {
        let mut state = state_with_answer("A reasonably long answer about my project work.");
        evaluator_returning("I think it was pretty good overall")
            .evaluate(&mut state)
            .await
            .unwrap();

        assert!(state.scores[0].both(Grade::Medium));
    }

    #[tokio::test]
    async fn test_duplicate_turn_replaces_score() {
        let mut state = state_with_answer("A reasonably long answer about my project work.");
        let evaluator = evaluator_returning(r#"{"relevance": "low", "specificity": "low"}"#);
        evaluator.evaluate(&mut state).await.unwrap();
        evaluator.evaluate(&mut state).await.unwrap();

        assert_eq!(state.turns.len(), 1);
        assert_eq!(state.scores.len(), 1);
    }

    #[tokio::test]
    async fn test_generator_failure_leaves_state_untouched() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .returning(|_| Err(LangbaseError::Timeout { timeout_ms: 5 }));
        let evaluator = Evaluator::new(StageCore::new(Arc::new(mock), 1000), "eval-pipe", 20);

        let mut state = state_with_answer("A reasonably long answer about my project work.");
        let before = state.clone();
        let err = evaluator.evaluate(&mut state).await.unwrap_err();

        assert!(matches!(err, AppError::Langbase(_)));
        assert_eq!(state, before);
    }

    #[test]
    fn test_is_trivial_counts_characters() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().never();
        let evaluator = Evaluator::new(StageCore::new(Arc::new(mock), 1000), "p", 20);
        assert!(evaluator.is_trivial(""));
        assert!(evaluator.is_trivial("열아홉 글자 답변입니다"));
        assert!(!evaluator.is_trivial("twenty characters!!!"));
    }
}
