//! Storage layer for interview persistence.
//!
//! This module provides SQLite-based storage for interviews, their scored
//! turns, and per-turn invocation logs.

mod sqlite;


pub use sqlite::SqliteStorage;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StorageResult;
use crate::interview::{Grade, SessionState};

/// Lifecycle of a stored interview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewStatus {
    /// Waiting for the candidate's next answer.
    Active,
    /// Report written.
    Finished,
}

impl InterviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewStatus::Active => "active",
            InterviewStatus::Finished => "finished",
        }
    }

    /// Parse a stored status, treating anything unknown as active.
    pub fn parse(value: &str) -> Self {
        match value {
            "finished" => InterviewStatus::Finished,
            _ => InterviewStatus::Active,
        }
    }
}

/// One interview and its latest state snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewRecord {
    /// Same as the session id.
    pub id: String,
    pub status: InterviewStatus,
    /// Resume file the interview was seeded from.
    pub resume_source: Option<String>,
    pub current_strategy: String,
    pub current_question: String,
    pub turn_count: i64,
    /// Rendered feedback report, once finished.
    pub report: Option<String>,
    /// Full session state as JSON.
    pub snapshot: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InterviewRecord {
    /// Snapshot a session state
    pub fn from_state(state: &SessionState, resume_source: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: state.session_id.clone(),
            status: if state.is_finished() {
                InterviewStatus::Finished
            } else {
                InterviewStatus::Active
            },
            resume_source,
            current_strategy: state.current_strategy.clone(),
            current_question: state.current_question.clone(),
            turn_count: state.turns.len() as i64,
            report: state.report.as_ref().map(|r| r.text.clone()),
            snapshot: crate::interview::serialize_for_log(state, "interview snapshot"),
            created_at: now,
            updated_at: now,
        }
    }

    /// Restore the session state from the snapshot.
    pub fn session_state(&self) -> Option<SessionState> {
        serde_json::from_value(self.snapshot.clone()).ok()
    }
}

/// One scored exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub interview_id: String,
    pub turn_index: i64,
    pub strategy: String,
    pub question: String,
    pub answer: String,
    pub relevance: Grade,
    pub specificity: Grade,
    pub created_at: DateTime<Utc>,
}

impl TurnRecord {
    /// Every turn of a state paired with its score; unscored turns are skipped.
    pub fn from_state(state: &SessionState) -> Vec<Self> {
        let now = Utc::now();
        state
            .turns
            .iter()
            .zip(state.scores.iter())
            .enumerate()
            .map(|(index, (turn, score))| Self {
                interview_id: state.session_id.clone(),
                turn_index: index as i64,
                strategy: turn.strategy.clone(),
                question: turn.question.clone(),
                answer: turn.answer.clone(),
                relevance: score.relevance,
                specificity: score.specificity,
                created_at: now,
            })
            .collect()
    }
}

/// A logged interview operation (one seed or one answered turn).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invocation {
    /// Unique invocation identifier.
    pub id: String,
    /// Interview the operation ran against.
    pub interview_id: Option<String>,
    /// Operation name (e.g. "start", "submit_answer").
    pub operation: String,
    /// Input parameters as JSON.
    pub input: serde_json::Value,
    /// Output result as JSON (if successful).
    pub output: Option<serde_json::Value>,
    /// Latency in milliseconds.
    pub latency_ms: Option<i64>,
    /// Whether the operation succeeded.
    pub success: bool,
    /// Error message (if failed).
    pub error: Option<String>,
    /// When the operation occurred.
    pub created_at: DateTime<Utc>,
}

impl Invocation {
    /// Create a new invocation log entry
    pub fn new(operation: impl Into<String>, input: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            interview_id: None,
            operation: operation.into(),
            input,
            output: None,
            latency_ms: None,
            success: true,
            error: None,
            created_at: Utc::now(),
        }
    }

    /// Set the interview ID
    pub fn with_interview(mut self, interview_id: impl Into<String>) -> Self {
        self.interview_id = Some(interview_id.into());
        self
    }

    /// Mark as successful with output
    pub fn success(mut self, output: serde_json::Value, latency_ms: i64) -> Self {
        self.success = true;
        self.output = Some(output);
        self.latency_ms = Some(latency_ms);
        self
    }

    /// Mark as failed with error
    pub fn failure(mut self, error: impl Into<String>, latency_ms: i64) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self.latency_ms = Some(latency_ms);
        self
    }
}

/// Persistence operations for interviews.
#[async_trait]
pub trait Storage: Send + Sync {
    // Interview operations

    /// Create a new interview.
    async fn create_interview(&self, interview: &InterviewRecord) -> StorageResult<()>;
    /// Get an interview by ID.
    async fn get_interview(&self, id: &str) -> StorageResult<Option<InterviewRecord>>;
    /// Update an existing interview.
    async fn update_interview(&self, interview: &InterviewRecord) -> StorageResult<()>;

    // Turn operations

    /// Insert or replace a turn by `(interview_id, turn_index)`.
    async fn upsert_turn(&self, turn: &TurnRecord) -> StorageResult<()>;
    /// Get all turns of an interview in order.
    async fn get_interview_turns(&self, interview_id: &str) -> StorageResult<Vec<TurnRecord>>;

    // Invocation logging

    /// Log an operation.
    async fn log_invocation(&self, invocation: &Invocation) -> StorageResult<()>;
    /// Get all logged operations of an interview in order.
    async fn get_interview_invocations(&self, interview_id: &str)
        -> StorageResult<Vec<Invocation>>;
}
