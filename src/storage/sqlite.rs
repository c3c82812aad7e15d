use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;
use tracing::{info, warn};

use super::{Invocation, InterviewRecord, InterviewStatus, Storage, TurnRecord};
use crate::config::DatabaseConfig;
use crate::error::{StorageError, StorageResult};
use crate::interview::Grade;

/// Static migrator that embeds migrations at compile time
static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// SQLite-backed storage implementation
#[derive(Clone)]
pub struct SqliteStorage {
    pool: SqlitePool,
}

impl SqliteStorage {
    /// Create a new SQLite storage instance
    pub async fn new(config: &DatabaseConfig) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = config.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Connection {
                message: format!("Failed to create database directory: {}", e),
            })?;
        }

        let database_url = format!("sqlite://{}?mode=rwc", config.path.display());

        let options = SqliteConnectOptions::from_str(&database_url)
            .map_err(|e| StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            })?
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Create a private in-memory database (single connection).
    pub async fn new_in_memory() -> StorageResult<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:").map_err(|e| {
            StorageError::Connection {
                message: format!("Invalid database URL: {}", e),
            }
        })?;

        // Every connection to :memory: opens a separate database
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::Connection {
                message: format!("Failed to connect to database: {}", e),
            })?;

        let storage = Self { pool };
        storage.run_migrations().await?;

        Ok(storage)
    }

    /// Run database migrations using embedded sqlx migrations
    async fn run_migrations(&self) -> StorageResult<()> {
        info!("Running database migrations...");

        MIGRATOR.run(&self.pool).await.map_err(|e| StorageError::Migration {
            message: format!("Failed to run migrations: {}", e),
        })?;

        info!("Database migrations completed successfully");
        Ok(())
    }

    /// Get the underlying pool for advanced queries
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn to_json_string(value: &serde_json::Value, context: &str) -> StorageResult<String> {
    serde_json::to_string(value).map_err(|e| StorageError::Query {
        message: format!("Failed to serialize {}: {}", context, e),
    })
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn create_interview(&self, interview: &InterviewRecord) -> StorageResult<()> {
        let snapshot = to_json_string(&interview.snapshot, "interview snapshot")?;

        sqlx::query(
            r#"
            INSERT INTO interviews (id, status, resume_source, current_strategy, current_question, turn_count, report, snapshot, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&interview.id)
        .bind(interview.status.as_str())
        .bind(&interview.resume_source)
        .bind(&interview.current_strategy)
        .bind(&interview.current_question)
        .bind(interview.turn_count)
        .bind(&interview.report)
        .bind(&snapshot)
        .bind(interview.created_at.to_rfc3339())
        .bind(interview.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_interview(&self, id: &str) -> StorageResult<Option<InterviewRecord>> {
        let row: Option<InterviewRow> = sqlx::query_as(
            r#"
            SELECT id, status, resume_source, current_strategy, current_question, turn_count, report, snapshot, created_at, updated_at
            FROM interviews
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn update_interview(&self, interview: &InterviewRecord) -> StorageResult<()> {
        let snapshot = to_json_string(&interview.snapshot, "interview snapshot")?;

        let result = sqlx::query(
            r#"
            UPDATE interviews
            SET status = ?, current_strategy = ?, current_question = ?, turn_count = ?, report = ?, snapshot = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(interview.status.as_str())
        .bind(&interview.current_strategy)
        .bind(&interview.current_question)
        .bind(interview.turn_count)
        .bind(&interview.report)
        .bind(&snapshot)
        .bind(interview.updated_at.to_rfc3339())
        .bind(&interview.id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StorageError::InterviewNotFound {
                interview_id: interview.id.clone(),
            });
        }

        Ok(())
    }

    async fn upsert_turn(&self, turn: &TurnRecord) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO turns (interview_id, turn_index, strategy, question, answer, relevance, specificity, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(interview_id, turn_index) DO UPDATE SET
                strategy = excluded.strategy,
                question = excluded.question,
                answer = excluded.answer,
                relevance = excluded.relevance,
                specificity = excluded.specificity
            "#,
        )
        .bind(&turn.interview_id)
        .bind(turn.turn_index)
        .bind(&turn.strategy)
        .bind(&turn.question)
        .bind(&turn.answer)
        .bind(turn.relevance.as_str())
        .bind(turn.specificity.as_str())
        .bind(turn.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_interview_turns(&self, interview_id: &str) -> StorageResult<Vec<TurnRecord>> {
        let rows: Vec<TurnRow> = sqlx::query_as(
            r#"
            SELECT interview_id, turn_index, strategy, question, answer, relevance, specificity, created_at
            FROM turns
            WHERE interview_id = ?
            ORDER BY turn_index ASC
            "#,
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn log_invocation(&self, invocation: &Invocation) -> StorageResult<()> {
        let input = to_json_string(&invocation.input, "invocation input")?;
        let output = invocation
            .output
            .as_ref()
            .map(|o| to_json_string(o, "invocation output"))
            .transpose()?;

        sqlx::query(
            r#"
            INSERT INTO invocations (id, interview_id, operation, input, output, latency_ms, success, error, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&invocation.id)
        .bind(&invocation.interview_id)
        .bind(&invocation.operation)
        .bind(&input)
        .bind(&output)
        .bind(invocation.latency_ms)
        .bind(invocation.success)
        .bind(&invocation.error)
        .bind(invocation.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get_interview_invocations(
        &self,
        interview_id: &str,
    ) -> StorageResult<Vec<Invocation>> {
        let rows: Vec<InvocationRow> = sqlx::query_as(
            r#"
            SELECT id, interview_id, operation, input, output, latency_ms, success, error, created_at
            FROM invocations
            WHERE interview_id = ?
            ORDER BY created_at ASC
            "#,
        )
        .bind(interview_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }
}

fn parse_timestamp(value: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_grade(value: &str) -> Grade {
    Grade::parse_label(value).unwrap_or_else(|| {
        warn!(value = %value, "Unknown stored grade, reading as medium");
        Grade::Medium
    })
}

// Internal row types for SQLx mapping
#[derive(sqlx::FromRow)]
struct InterviewRow {
    id: String,
    status: String,
    resume_source: Option<String>,
    current_strategy: String,
    current_question: String,
    turn_count: i64,
    report: Option<String>,
    snapshot: String,
    created_at: String,
    updated_at: String,
}

impl From<InterviewRow> for InterviewRecord {
    fn from(row: InterviewRow) -> Self {
        Self {
            id: row.id,
            status: InterviewStatus::parse(&row.status),
            resume_source: row.resume_source,
            current_strategy: row.current_strategy,
            current_question: row.current_question,
            turn_count: row.turn_count,
            report: row.report,
            snapshot: serde_json::from_str(&row.snapshot).unwrap_or(serde_json::Value::Null),
            created_at: parse_timestamp(&row.created_at),
            updated_at: parse_timestamp(&row.updated_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct TurnRow {
    interview_id: String,
    turn_index: i64,
    strategy: String,
    question: String,
    answer: String,
    relevance: String,
    specificity: String,
    created_at: String,
}

impl From<TurnRow> for TurnRecord {
    fn from(row: TurnRow) -> Self {
        Self {
            interview_id: row.interview_id,
            turn_index: row.turn_index,
            strategy: row.strategy,
            question: row.question,
            answer: row.answer,
            relevance: parse_grade(&row.relevance),
            specificity: parse_grade(&row.specificity),
            created_at: parse_timestamp(&row.created_at),
        }
    }
}

#[derive(sqlx::FromRow)]
struct InvocationRow {
    id: String,
    interview_id: Option<String>,
    operation: String,
    input: String,
    output: Option<String>,
    latency_ms: Option<i64>,
    success: bool,
    error: Option<String>,
    created_at: String,
}

impl From<InvocationRow> for Invocation {
    fn from(row: InvocationRow) -> Self {
        Self {
            id: row.id,
            interview_id: row.interview_id,
            operation: row.operation,
            input: serde_json::from_str(&row.input).unwrap_or(serde_json::Value::Null),
            output: row.output.and_then(|s| serde_json::from_str(&s).ok()),
            latency_ms: row.latency_ms,
            success: row.success,
            error: row.error,
            created_at: parse_timestamp(&row.created_at),
        }
    }
}
