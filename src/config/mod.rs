use std::env;
use std::path::PathBuf;

use crate::error::AppError;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub langbase: LangbaseConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub request: RequestConfig,
    pub pipes: PipeConfig,
    pub interview: InterviewConfig,
}

/// Langbase API configuration
#[derive(Debug, Clone)]
pub struct LangbaseConfig {
    pub api_key: String,
    pub base_url: String,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub path: PathBuf,
    pub max_connections: u32,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log output format
#[derive(Debug, Clone, PartialEq)]
pub enum LogFormat {
    Pretty,
    Json,
}

/// HTTP request configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
}

/// Langbase pipe name configuration
#[derive(Debug, Clone)]
pub struct PipeConfig {
    pub evaluator: String,
    pub re_evaluator: String,
    pub question: String,
    pub summary: String,
    pub resume: String,
    pub strategy: String,
}

/// Interview policy thresholds
#[derive(Debug, Clone)]
pub struct InterviewConfig {
    /// Completed turns after which the interview always ends.
    pub max_turns: usize,
    /// Completed turns after which full coverage ends the interview.
    pub coverage_exit_turns: usize,
    /// Answers shorter than this are graded low/low without consulting the model.
    pub min_answer_chars: usize,
    /// Upper bound on reference questions retrieved for generation.
    pub similar_top_k: usize,
    /// Category the opening question is drawn from (first declared when unset).
    pub opening_strategy: Option<String>,
    /// Deadline for a single collaborator call.
    pub collaborator_timeout_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let langbase = LangbaseConfig {
            api_key: env::var("LANGBASE_API_KEY").map_err(|_| AppError::Config {
                message: "LANGBASE_API_KEY is required".to_string(),
            })?,
            base_url: env::var("LANGBASE_BASE_URL")
                .unwrap_or_else(|_| "https://api.langbase.com".to_string()),
        };

        let database = DatabaseConfig {
            path: PathBuf::from(
                env::var("DATABASE_PATH").unwrap_or_else(|_| "./data/interviews.db".to_string()),
            ),
            max_connections: parse_env("DATABASE_MAX_CONNECTIONS", 5),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "pretty".to_string())
                .to_lowercase()
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        };

        let request = RequestConfig {
            timeout_ms: parse_env("REQUEST_TIMEOUT_MS", 30000),
            max_retries: parse_env("MAX_RETRIES", 3),
            retry_delay_ms: parse_env("RETRY_DELAY_MS", 1000),
        };

        let defaults = PipeConfig::default();
        let pipes = PipeConfig {
            evaluator: env::var("PIPE_EVALUATOR").unwrap_or(defaults.evaluator),
            re_evaluator: env::var("PIPE_RE_EVALUATOR").unwrap_or(defaults.re_evaluator),
            question: env::var("PIPE_QUESTION").unwrap_or(defaults.question),
            summary: env::var("PIPE_SUMMARY").unwrap_or(defaults.summary),
            resume: env::var("PIPE_RESUME").unwrap_or(defaults.resume),
            strategy: env::var("PIPE_STRATEGY").unwrap_or(defaults.strategy),
        };

        let fallback = InterviewConfig::default();
        let interview = InterviewConfig {
            max_turns: parse_env("INTERVIEW_MAX_TURNS", fallback.max_turns),
            coverage_exit_turns: parse_env(
                "INTERVIEW_COVERAGE_EXIT_TURNS",
                fallback.coverage_exit_turns,
            ),
            min_answer_chars: parse_env("INTERVIEW_MIN_ANSWER_CHARS", fallback.min_answer_chars),
            similar_top_k: parse_env("INTERVIEW_SIMILAR_TOP_K", fallback.similar_top_k),
            opening_strategy: env::var("INTERVIEW_OPENING_STRATEGY")
                .ok()
                .filter(|s| !s.trim().is_empty()),
            collaborator_timeout_ms: parse_env(
                "COLLABORATOR_TIMEOUT_MS",
                fallback.collaborator_timeout_ms,
            ),
        };

        Ok(Config {
            langbase,
            database,
            logging,
            request,
            pipes,
            interview,
        })
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
        }
    }
}

impl Default for PipeConfig {
    fn default() -> Self {
        Self {
            evaluator: "interview-evaluator-v1".to_string(),
            re_evaluator: "interview-re-evaluator-v1".to_string(),
            question: "interview-question-v1".to_string(),
            summary: "interview-summary-v1".to_string(),
            resume: "resume-analyzer-v1".to_string(),
            strategy: "interview-strategy-v1".to_string(),
        }
    }
}

impl Default for InterviewConfig {
    fn default() -> Self {
        Self {
            max_turns: 5,
            coverage_exit_turns: 5,
            min_answer_chars: 20,
            similar_top_k: 3,
            opening_strategy: None,
            collaborator_timeout_ms: 60000,
        }
    }
}
