//! # Interview Agent
//!
//! A resume-grounded interview agent that delegates every piece of language
//! work to Langbase Pipes while keeping the interview policy deterministic.
//!
//! ## Features
//!
//! - **Resume seeding**: profile digest and a per-category question strategy
//! - **Evaluation**: relevance and specificity graded low/medium/high per answer
//! - **Reflection**: heuristic audit with at most one stricter re-evaluation
//! - **Coverage-aware decisions**: every category asked once, follow-ups on weak answers
//! - **Question generation**: similarity-referenced prompts with a safe fallback
//! - **Feedback reports**: per-category digests rendered into a fixed structure
//!
//! ## Architecture
//!
//! ```text
//! Candidate → InterviewSession → Interviewer → stages → Langbase Pipes (HTTP)
//!                                     ↓
//!                               SQLite (history)
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use interview_agent::collaborators::ResumeArtifact;
//! use interview_agent::interview::{InterviewSession, Interviewer, Reply};
//! use interview_agent::langbase::LangbaseClient;
//! use interview_agent::Config;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let langbase = LangbaseClient::new(&config.langbase, config.request.clone())?;
//!     let mut session = InterviewSession::new(Interviewer::from_langbase(&config, langbase));
//!
//!     let resume = ResumeArtifact::from_path("resume.txt").await?;
//!     if let Reply::Question(q) = session.begin(resume).await? {
//!         println!("{}", q);
//!     }
//!     let reply = session.reply("I led the migration of our billing system...").await?;
//!     println!("{:?}", reply);
//!     Ok(())
//! }
//! ```

/// Services the interview loop calls: text generation, similarity, resume analysis.
pub mod collaborators;
/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Interview state, stages, routing and the turn driver.
pub mod interview;
/// Langbase API client and types for pipe communication.
pub mod langbase;
/// System prompts for Langbase pipes.
pub mod prompts;
/// SQLite storage layer for persistence.
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use interview::{InterviewSession, Interviewer, Reply, SessionState};
