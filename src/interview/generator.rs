//! Next-question generation with an acceptance gate and deterministic fallback.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{SessionState, Stage, StageCore};
use crate::collaborators::{Candidate, CandidateTag, SimilaritySearch};
use crate::error::AppResult;
use crate::langbase::{Message, PipeRequest};
use crate::prompts::QUESTION_PROMPT;

/// Asked when neither the model nor the category bank yields a usable question.
pub const GENERIC_QUESTION: &str = "How does this experience connect to the role you are \
applying for, and which quantitative indicator best shows its impact?";

/// Shortest text accepted as a question.
pub const MIN_QUESTION_CHARS: usize = 8;

/// Prefix of the resume summary used as a similarity query of last resort.
const SUMMARY_QUERY_CHARS: usize = 200;

/// Where the accepted question came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    Generated,
    StrategyExample,
    Generic,
}

/// Question chosen for the next turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedQuestion {
    pub text: String,
    pub source: QuestionSource,
    /// Reference questions shown to the model.
    pub references: Vec<String>,
}

/// Phrases one probing question for the active category.
#[derive(Clone)]
pub struct QuestionGenerator {
    core: StageCore,
    similarity: Arc<dyn SimilaritySearch>,
    pipe_name: String,
    top_k: usize,
}

impl QuestionGenerator {
    /// Create a generator
    pub fn new(
        core: StageCore,
        similarity: Arc<dyn SimilaritySearch>,
        pipe_name: impl Into<String>,
        top_k: usize,
    ) -> Self {
        Self {
            core,
            similarity,
            pipe_name: pipe_name.into(),
            top_k,
        }
    }

    /// Every category example plus every question asked so far.
    pub fn reference_corpus(state: &SessionState) -> Vec<Candidate> {
        let examples = state.strategies.iter().flat_map(|strategy| {
            strategy
                .example_questions
                .iter()
                .filter(|q| !q.trim().is_empty())
                .map(|q| Candidate::new(q.clone(), CandidateTag::Strategy(strategy.name.clone())))
        });
        let history = state
            .turns
            .iter()
            .filter(|t| !t.question.trim().is_empty())
            .map(|t| Candidate::new(t.question.clone(), CandidateTag::History));

        examples.chain(history).collect()
    }

    /// Previous question, else resume keywords, else the start of the summary.
    pub fn reference_query(state: &SessionState) -> String {
        let previous = state.current_question.trim();
        if !previous.is_empty() {
            return previous.to_string();
        }
        if !state.profile.keywords.is_empty() {
            return state.profile.keywords.join(", ");
        }
        state.profile.summary.chars().take(SUMMARY_QUERY_CHARS).collect()
    }

    /// One-line summary of the latest score for the prompt.
    pub fn evaluation_brief(state: &SessionState) -> String {
        match state.latest_score() {
            Some(score) => format!(
                "relevance: {}, specificity: {}",
                score.relevance, score.specificity
            ),
            None => "No evaluation of the previous answer is available.".to_string(),
        }
    }

    /// Acceptance gate for model output.
    pub fn accept(state: &SessionState, candidate: &str) -> bool {
        let candidate = candidate.trim();
        candidate.ends_with('?')
            && candidate.chars().count() >= MIN_QUESTION_CHARS
            && !state.is_used(candidate)
    }

    /// First unused example of the active category, else the generic question.
    pub fn fallback(state: &SessionState) -> (String, QuestionSource) {
        state
            .strategies
            .get(&state.current_strategy)
            .and_then(|s| {
                s.example_questions
                    .iter()
                    .find(|q| !q.trim().is_empty() && !state.is_used(q))
            })
            .map(|q| (q.clone(), QuestionSource::StrategyExample))
            .unwrap_or_else(|| (GENERIC_QUESTION.to_string(), QuestionSource::Generic))
    }

    /// Produce and install the next question. Ends the turn.
    pub async fn generate(&self, state: &mut SessionState) -> AppResult<GeneratedQuestion> {
        let references = self.references(state).await;
        let request = PipeRequest::new(&self.pipe_name, self.build_messages(state, &references))
            .with_thread_id(&state.session_id);
        let completion = self.core.complete(request).await?;

        let candidate = completion.trim();
        let (text, source) = if Self::accept(state, candidate) {
            (candidate.to_string(), QuestionSource::Generated)
        } else {
            debug!(
                session_id = %state.session_id,
                rejected = %candidate.chars().take(120).collect::<String>(),
                "Generated question rejected, using fallback"
            );
            Self::fallback(state)
        };

        let strategy = state.current_strategy.clone();
        state.increment_coverage(&strategy);
        state.mark_used(&text);
        state.current_question = text.clone();
        state.current_answer.clear();
        state.reflect_flag = false;
        state.need_re_eval = false;
        state.stage = Stage::Evaluate;

        info!(
            session_id = %state.session_id,
            strategy = %strategy,
            source = ?source,
            references = references.len(),
            "Next question ready"
        );

        Ok(GeneratedQuestion {
            text,
            source,
            references,
        })
    }

    async fn references(&self, state: &SessionState) -> Vec<String> {
        let corpus = Self::reference_corpus(state);
        if corpus.is_empty() {
            return Vec::new();
        }

        let query = Self::reference_query(state);
        let k = self.top_k.min(corpus.len());
        let search = self.similarity.top_k(&query, &corpus, k);

        match tokio::time::timeout(self.core.timeout(), search).await {
            Ok(Ok(found)) => found.into_iter().map(|c| c.text).collect(),
            Ok(Err(e)) => {
                warn!(session_id = %state.session_id, error = %e, "Similarity search failed");
                Vec::new()
            }
            Err(_) => {
                warn!(session_id = %state.session_id, "Similarity search timed out");
                Vec::new()
            }
        }
    }

    fn build_messages(&self, state: &SessionState, references: &[String]) -> Vec<Message> {
        let previous_answer = state
            .turns
            .last()
            .map(|t| t.answer.trim())
            .unwrap_or_default();
        let refs_block = if references.is_empty() {
            "- (no reference questions)".to_string()
        } else {
            references
                .iter()
                .map(|r| format!("- {}", r))
                .collect::<Vec<_>>()
                .join("\n")
        };

        vec![
            Message::system(QUESTION_PROMPT),
            Message::user(format!(
                "[Focus area]\n{}\n\n[Resume summary]\n{}\n\n[Keywords]\n{}\n\n\
                 [Previous question]\n{}\n\n[Previous answer]\n{}\n\n\
                 [Evaluation of the previous answer]\n{}\n\n\
                 [Reference questions, do not copy]\n{}",
                state.current_strategy,
                state.profile.summary,
                state.profile.keywords.join(", "),
                state.current_question.trim(),
                previous_answer,
                Self::evaluation_brief(state),
                refs_block,
            )),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collaborators::{LexicalSimilarity, MockTextGenerator};
    use crate::error::{AppError, LangbaseError};
    use crate::interview::{Grade, ResumeProfile, ScoreRecord, Strategy, StrategyBook, Turn};
    use async_trait::async_trait;

    struct FailingSimilarity;

    #[async_trait]
    impl SimilaritySearch for FailingSimilarity {
        async fn top_k(&self, _: &str, _: &[Candidate], _: usize) -> AppResult<Vec<Candidate>> {
            Err(AppError::Internal {
                message: "index unavailable".to_string(),
            })
        }
    }

    fn answered_state() -> SessionState {
        let book = StrategyBook::new(vec![
            Strategy::new(
                "Experience",
                "projects",
                vec!["Tell me about your last project?".to_string()],
            ),
            Strategy::new(
                "Technical Expertise",
                "depth",
                vec![
                    "Which database did you tune and how?".to_string(),
                    "How did you measure the speedup?".to_string(),
                ],
            ),
        ]);
        let profile = ResumeProfile {
            summary: "Backend engineer".to_string(),
            keywords: vec!["rust".to_string(), "postgres".to_string()],
            sections: String::new(),
        };
        let mut state = SessionState::new(
            profile,
            book,
            "Experience",
            "Tell me about your last project?",
        );
        state.set_answer("I built a billing service.");
        let index = state.record_turn(Turn {
            question: state.current_question.clone(),
            answer: state.current_answer.clone(),
            strategy: "Experience".to_string(),
        });
        state.upsert_score(ScoreRecord::new(Grade::Medium, Grade::Low, index));
        state.current_strategy = "Technical Expertise".to_string();
        state.stage = Stage::Generate;
        state
    }

    fn generator_returning(
        completion: &'static str,
        similarity: Arc<dyn SimilaritySearch>,
    ) -> QuestionGenerator {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate()
            .withf(|req| req.name == "question-pipe")
            .times(1)
            .returning(move |_| Ok(completion.to_string()));
        QuestionGenerator::new(StageCore::new(Arc::new(mock), 1000), similarity, "question-pipe", 3)
    }

    #[test]
    fn test_reference_corpus_tags() {
        let corpus = QuestionGenerator::reference_corpus(&answered_state());
        assert_eq!(corpus.len(), 4);
        assert_eq!(corpus[0].tag, CandidateTag::Strategy("Experience".to_string()));
        assert_eq!(corpus[3].tag, CandidateTag::History);
    }

    #[test]
    fn test_reference_query_fallbacks() {
        let mut state = answered_state();
        assert_eq!(
            QuestionGenerator::reference_query(&state),
            "Tell me about your last project?"
        );
        state.current_question.clear();
        assert_eq!(QuestionGenerator::reference_query(&state), "rust, postgres");
        state.profile.keywords.clear();
        state.profile.summary = "x".repeat(300);
        assert_eq!(QuestionGenerator::reference_query(&state).len(), 200);
    }

    #[test]
    fn test_accept_gate() {
        let state = answered_state();
        assert!(QuestionGenerator::accept(&state, " How did you pick the index? "));
        assert!(!QuestionGenerator::accept(&state, "Describe the index."));
        assert!(!QuestionGenerator::accept(&state, "Why?"));
        assert!(!QuestionGenerator::accept(&state, "Tell me about your last project?"));
    }

    #[tokio::test]
    async fn test_generate_accepts_model_question() {
        let mut state = answered_state();
        let generated = generator_returning(
            "What latency did the billing service reach after launch?",
            Arc::new(LexicalSimilarity::new()),
        )
        .generate(&mut state)
        .await
        .unwrap();

        assert_eq!(generated.source, QuestionSource::Generated);
        assert_eq!(generated.references.len(), 3);
        assert_eq!(
            state.current_question,
            "What latency did the billing service reach after launch?"
        );
        assert!(state.is_used(&state.current_question));
        assert_eq!(state.coverage_of("Technical Expertise"), 1);
        assert!(state.current_answer.is_empty());
        assert_eq!(state.stage, Stage::Evaluate);
    }

    #[tokio::test]
    async fn test_rejected_question_falls_back_to_unused_example() {
        let mut state = answered_state();
        state.mark_used("Which database did you tune and how?");
        let generated = generator_returning("Explain more.", Arc::new(LexicalSimilarity::new()))
            .generate(&mut state)
            .await
            .unwrap();

        assert_eq!(generated.source, QuestionSource::StrategyExample);
        assert_eq!(state.current_question, "How did you measure the speedup?");
    }

    #[tokio::test]
    async fn test_exhausted_bank_uses_generic_question() {
        let mut state = answered_state();
        state.mark_used("Which database did you tune and how?");
        state.mark_used("How did you measure the speedup?");
        let generated = generator_returning(
            "Tell me about your last project?",
            Arc::new(LexicalSimilarity::new()),
        )
        .generate(&mut state)
        .await
        .unwrap();

        assert_eq!(generated.source, QuestionSource::Generic);
        assert_eq!(state.current_question, GENERIC_QUESTION);
    }

    #[tokio::test]
    async fn test_similarity_failure_is_not_fatal() {
        let mut state = answered_state();
        let generated = generator_returning(
            "How many requests per second does it handle today?",
            Arc::new(FailingSimilarity),
        )
        .generate(&mut state)
        .await
        .unwrap();

        assert!(generated.references.is_empty());
        assert_eq!(generated.source, QuestionSource::Generated);
    }

    #[tokio::test]
    async fn test_generator_failure_propagates() {
        let mut mock = MockTextGenerator::new();
        mock.expect_generate().returning(|_| {
            Err(LangbaseError::Unavailable {
                message: "down".to_string(),
                retries: 3,
            })
        });
        let generator = QuestionGenerator::new(
            StageCore::new(Arc::new(mock), 1000),
            Arc::new(LexicalSimilarity::new()),
            "question-pipe",
            3,
        );
        let mut state = answered_state();
        let before = state.clone();

        assert!(generator.generate(&mut state).await.is_err());
        assert_eq!(state, before);
    }

    #[test]
    fn test_evaluation_brief() {
        let state = answered_state();
        assert_eq!(
            QuestionGenerator::evaluation_brief(&state),
            "relevance: medium, specificity: low"
        );
    }
}
