//! Turn driver: seeds sessions and runs one answered turn through the stage graph.

use std::sync::Arc;
use std::time::Instant;

use rand::seq::SliceRandom;
use serde_json::json;
use tracing::{debug, info, warn};

use super::{
    serialize_for_log, Decider, Evaluator, QuestionGenerator, ReScorer, Reflector, RoutingTable,
    SessionState, Stage, StageCore, StageHandler, Strategy, StrategyBook, Summarizer, Transition,
    GENERIC_QUESTION, MAX_STEPS_PER_TURN,
};
use crate::collaborators::{
    LangbaseResumeAnalyzer, LexicalSimilarity, ResumeAnalyzer, ResumeArtifact, SimilaritySearch,
    TextGenerator,
};
use crate::config::Config;
use crate::error::{AppResult, InterviewError};
use crate::langbase::LangbaseClient;
use crate::storage::{Invocation, InterviewRecord, SqliteStorage, Storage, TurnRecord};

/// Drives interviews. Holds no per-session state, so one instance serves many sessions.
#[derive(Clone)]
pub struct Interviewer {
    evaluator: Evaluator,
    reflector: Reflector,
    rescorer: ReScorer,
    decider: Decider,
    generator: QuestionGenerator,
    summarizer: Summarizer,
    analyzer: Arc<dyn ResumeAnalyzer>,
    routes: RoutingTable,
    opening_strategy: Option<String>,
    storage: Option<SqliteStorage>,
}

impl Interviewer {
    /// Assemble the stages around the given collaborators.
    pub fn new(
        config: &Config,
        generator: Arc<dyn TextGenerator>,
        similarity: Arc<dyn SimilaritySearch>,
        analyzer: Arc<dyn ResumeAnalyzer>,
    ) -> Self {
        let core = StageCore::new(generator, config.interview.collaborator_timeout_ms);
        let pipes = &config.pipes;

        Self {
            evaluator: Evaluator::new(
                core.clone(),
                &pipes.evaluator,
                config.interview.min_answer_chars,
            ),
            reflector: Reflector::new(),
            rescorer: ReScorer::new(
                core.clone(),
                &pipes.re_evaluator,
                config.interview.min_answer_chars,
            ),
            decider: Decider::from_config(&config.interview),
            generator: QuestionGenerator::new(
                core.clone(),
                similarity,
                &pipes.question,
                config.interview.similar_top_k,
            ),
            summarizer: Summarizer::new(core, &pipes.summary),
            analyzer,
            routes: RoutingTable::new(),
            opening_strategy: config.interview.opening_strategy.clone(),
            storage: None,
        }
    }

    /// Production wiring: Langbase pipes for every generation, lexical similarity.
    pub fn from_langbase(config: &Config, client: LangbaseClient) -> Self {
        let generator: Arc<dyn TextGenerator> = Arc::new(client);
        let analyzer = LangbaseResumeAnalyzer::new(
            StageCore::new(generator.clone(), config.interview.collaborator_timeout_ms),
            &config.pipes.resume,
            &config.pipes.strategy,
        );
        Self::new(
            config,
            generator,
            Arc::new(LexicalSimilarity::new()),
            Arc::new(analyzer),
        )
    }

    /// Persist interviews, turns and invocations.
    pub fn with_storage(mut self, storage: SqliteStorage) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Replace the routing table.
    pub fn with_routes(mut self, routes: RoutingTable) -> Self {
        self.routes = routes;
        self
    }

    pub fn storage(&self) -> Option<&SqliteStorage> {
        self.storage.as_ref()
    }

    /// Seed a new session from a resume and choose the opening question.
    pub async fn start(&self, resume: &ResumeArtifact) -> AppResult<SessionState> {
        let start = Instant::now();
        if resume.is_blank() {
            return Err(InterviewError::EmptyResume.into());
        }

        let seed = self.analyzer.analyze(resume).await?;
        let opening = self
            .opening_category(&seed.strategies)
            .ok_or(InterviewError::EmptyStrategies)?;
        let question = pick_opening_question(opening);
        let opening_name = opening.name.clone();
        let state = SessionState::new(seed.profile, seed.strategies, opening_name, question);

        if let Some(storage) = &self.storage {
            let source = resume.source.as_ref().map(|p| p.display().to_string());
            storage
                .create_interview(&InterviewRecord::from_state(&state, source.clone()))
                .await?;
            let invocation = Invocation::new("start", json!({ "resume_source": source }))
                .with_interview(&state.session_id)
                .success(
                    json!({
                        "strategy": state.current_strategy,
                        "question": state.current_question,
                        "categories": state.strategies.names(),
                    }),
                    start.elapsed().as_millis() as i64,
                );
            storage.log_invocation(&invocation).await?;
        }

        info!(
            session_id = %state.session_id,
            strategy = %state.current_strategy,
            categories = state.strategies.len(),
            latency_ms = start.elapsed().as_millis(),
            "Interview started"
        );
        Ok(state)
    }

    /// Run one full turn for `answer` on a working copy of `state`.
    ///
    /// Returns the next state on success; on failure the caller keeps `state`
    /// and may resubmit the same answer.
    pub async fn submit_answer(
        &self,
        state: &SessionState,
        answer: &str,
    ) -> AppResult<SessionState> {
        if state.is_finished() || state.stage == Stage::End {
            return Err(InterviewError::SessionFinished {
                session_id: state.session_id.clone(),
            }
            .into());
        }

        let start = Instant::now();
        let mut working = state.clone();
        working.set_answer(answer);

        let invocation = Invocation::new(
            "submit_answer",
            json!({
                "turn_index": state.turns.len(),
                "question": state.current_question,
                "answer": answer,
            }),
        )
        .with_interview(&state.session_id);

        let path = match self.run_turn(&mut working).await {
            Ok(path) => path,
            Err(e) => {
                warn!(
                    session_id = %state.session_id,
                    error = %e,
                    retryable = e.is_retryable(),
                    "Turn failed, state unchanged"
                );
                if let Some(storage) = &self.storage {
                    let failed =
                        invocation.failure(e.to_string(), start.elapsed().as_millis() as i64);
                    if let Err(log_err) = storage.log_invocation(&failed).await {
                        warn!(error = %log_err, "Failed to log failed turn");
                    }
                }
                return Err(e);
            }
        };

        if let Some(storage) = &self.storage {
            for turn in TurnRecord::from_state(&working) {
                storage.upsert_turn(&turn).await?;
            }
            storage
                .update_interview(&InterviewRecord::from_state(&working, None))
                .await?;
            let output = json!({
                "path": path.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
                "decision": working.decision.map(|d| d.as_str()),
                "reflection": serialize_for_log(&working.reflection, "reflection"),
                "score": serialize_for_log(&working.latest_score(), "score"),
                "next_question": (!working.is_finished()).then(|| working.current_question.clone()),
                "finished": working.is_finished(),
            });
            storage
                .log_invocation(&invocation.success(output, start.elapsed().as_millis() as i64))
                .await?;
        }

        info!(
            session_id = %working.session_id,
            turns = working.turns.len(),
            steps = path.len(),
            finished = working.is_finished(),
            latency_ms = start.elapsed().as_millis(),
            "Turn completed"
        );
        Ok(working)
    }

    /// Walk the routing table from `Evaluate` until a router ends the turn.
    async fn run_turn(&self, state: &mut SessionState) -> AppResult<Vec<Stage>> {
        let mut stage = Stage::Evaluate;
        let mut path = Vec::with_capacity(MAX_STEPS_PER_TURN);

        loop {
            if path.len() >= MAX_STEPS_PER_TURN {
                return Err(InterviewError::RoutingLoop {
                    stage: stage.to_string(),
                    steps: path.len(),
                }
                .into());
            }

            let route = *self
                .routes
                .get(stage)
                .ok_or_else(|| InterviewError::MissingRoute {
                    stage: stage.to_string(),
                })?;
            path.push(stage);
            debug!(session_id = %state.session_id, stage = %stage, "Running stage");

            self.dispatch(route.handler, state).await?;

            match (route.next)(state) {
                Transition::To(next) => stage = next,
                Transition::EndOfTurn => return Ok(path),
            }
        }
    }

    async fn dispatch(&self, handler: StageHandler, state: &mut SessionState) -> AppResult<()> {
        match handler {
            StageHandler::Evaluate => self.evaluator.evaluate(state).await,
            StageHandler::Reflect => {
                self.reflector.reflect(state);
                Ok(())
            }
            StageHandler::ReEvaluate => self.rescorer.re_evaluate(state).await,
            StageHandler::Decide => {
                self.decider.run(state);
                Ok(())
            }
            StageHandler::Generate => self.generator.generate(state).await.map(|_| ()),
            StageHandler::Summarize => self.summarizer.summarize(state).await,
        }
    }

    fn opening_category<'a>(&self, strategies: &'a StrategyBook) -> Option<&'a Strategy> {
        let configured = self.opening_strategy.as_deref().and_then(|name| {
            let found = strategies.get(name);
            if found.is_none() {
                warn!(strategy = %name, "Configured opening category not offered, using first");
            }
            found
        });
        configured.or_else(|| strategies.first())
    }
}

/// Random example of the opening category, or the generic question.
fn pick_opening_question(strategy: &Strategy) -> String {
    let examples: Vec<&String> = strategy
        .example_questions
        .iter()
        .filter(|q| !q.trim().is_empty())
        .collect();
    examples
        .choose(&mut rand::thread_rng())
        .map(|q| q.to_string())
        .unwrap_or_else(|| GENERIC_QUESTION.to_string())
}
