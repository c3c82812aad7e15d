//! Seams to the services the interview loop depends on.
//!
//! - [`TextGenerator`]: phrases scores, questions and reports (Langbase Pipes)
//! - [`SimilaritySearch`]: surfaces reference questions ([`LexicalSimilarity`])
//! - [`ResumeAnalyzer`]: turns a resume into a profile and question strategy
//!   ([`LangbaseResumeAnalyzer`])

mod resume;
mod similarity;

pub use resume::*;
pub use similarity::*;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppResult, LangbaseResult};
use crate::langbase::{LangbaseClient, PipeRequest};

/// Produces free text for a rendered pipe request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Run the request and return the raw completion.
    async fn generate(&self, request: PipeRequest) -> LangbaseResult<String>;
}

#[async_trait]
impl TextGenerator for LangbaseClient {
    async fn generate(&self, request: PipeRequest) -> LangbaseResult<String> {
        let response = self.call_pipe(request).await?;
        Ok(response.completion)
    }
}

/// Where a reference question came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "source", content = "area", rename_all = "snake_case")]
pub enum CandidateTag {
    /// Example question from a category's bank.
    Strategy(String),
    /// A question already asked in this interview.
    History,
}

/// A string in the similarity corpus.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub text: String,
    pub tag: CandidateTag,
}

impl Candidate {
    pub fn new(text: impl Into<String>, tag: CandidateTag) -> Self {
        Self {
            text: text.into(),
            tag,
        }
    }
}

/// Ranks corpus entries by similarity to a query.
#[async_trait]
pub trait SimilaritySearch: Send + Sync {
    /// Return at most `k` candidates, most similar first.
    async fn top_k(&self, query: &str, corpus: &[Candidate], k: usize)
        -> AppResult<Vec<Candidate>>;
}
