use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Langbase error: {0}")]
    Langbase(#[from] LangbaseError),

    #[error("Interview error: {0}")]
    Interview(#[from] InterviewError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Storage layer errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Query failed: {message}")]
    Query { message: String },

    #[error("Interview not found: {interview_id}")]
    InterviewNotFound { interview_id: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Langbase API errors
#[derive(Debug, Error)]
pub enum LangbaseError {
    #[error("Langbase unavailable: {message} (retries: {retries})")]
    Unavailable { message: String, retries: u32 },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Interview flow errors
#[derive(Debug, Error)]
pub enum InterviewError {
    #[error("No interview in progress - load a resume first")]
    NoActiveSession,

    #[error("Interview {session_id} has already finished")]
    SessionFinished { session_id: String },

    #[error("Resume text is empty")]
    EmptyResume,

    #[error("Question strategy has no categories")]
    EmptyStrategies,

    #[error("Session seeding failed: {message}")]
    SeedFailed { message: String },

    #[error("Stage {stage} has no route")]
    MissingRoute { stage: String },

    #[error("Turn exceeded {steps} stage transitions (last stage: {stage})")]
    RoutingLoop { stage: String, steps: usize },
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type alias for Langbase operations
pub type LangbaseResult<T> = Result<T, LangbaseError>;

impl AppError {
    /// Whether the failure came from a collaborator call and the turn may be retried unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AppError::Langbase(
                LangbaseError::Unavailable { .. }
                    | LangbaseError::Timeout { .. }
                    | LangbaseError::Http(_)
                    | LangbaseError::Api { .. }
            )
        )
    }
}
