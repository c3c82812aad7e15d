use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{AppResult, InterviewError};
use crate::interview::{
    extract_json_from_completion, ResumeProfile, StageCore, Strategy, StrategyBook,
    DEFAULT_CATEGORIES,
};
use crate::langbase::{Message, PipeRequest};
use crate::prompts::{RESUME_PROMPT, STRATEGY_PROMPT};

/// Extracted resume text and where it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumeArtifact {
    pub text: String,
    pub source: Option<PathBuf>,
}

impl ResumeArtifact {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source: None,
        }
    }

    /// Read a plain-text resume from disk.
    pub async fn from_path(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let text = tokio::fs::read_to_string(path).await.map_err(|e| {
            InterviewError::SeedFailed {
                message: format!("cannot read resume {}: {}", path.display(), e),
            }
        })?;
        Ok(Self {
            text,
            source: Some(path.to_path_buf()),
        })
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Everything needed to seed a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedMaterial {
    pub profile: ResumeProfile,
    pub strategies: StrategyBook,
}

/// Turns a resume into a profile and a per-category question strategy.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResumeAnalyzer: Send + Sync {
    async fn analyze(&self, resume: &ResumeArtifact) -> AppResult<SeedMaterial>;
}

#[derive(Debug, Default, Deserialize)]
struct ProfilePayload {
    #[serde(default)]
    summary: String,
    #[serde(default)]
    keywords: KeywordList,
    #[serde(default)]
    sections: serde_json::Value,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum KeywordList {
    List(Vec<String>),
    Joined(String),
}

impl Default for KeywordList {
    fn default() -> Self {
        KeywordList::List(Vec::new())
    }
}

impl KeywordList {
    fn into_vec(self) -> Vec<String> {
        let raw = match self {
            KeywordList::List(items) => items,
            KeywordList::Joined(joined) => joined.split(',').map(str::to_string).collect(),
        };
        raw.into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect()
    }
}

#[derive(Debug, Deserialize)]
struct StrategyPayload {
    #[serde(default, alias = "description", alias = "전략")]
    strategy: String,
    #[serde(default, alias = "examples", alias = "예시질문")]
    example_questions: Vec<String>,
}

/// Resume analysis and strategy generation over Langbase pipes.
#[derive(Clone)]
pub struct LangbaseResumeAnalyzer {
    core: StageCore,
    resume_pipe: String,
    strategy_pipe: String,
}

impl LangbaseResumeAnalyzer {
    pub fn new(
        core: StageCore,
        resume_pipe: impl Into<String>,
        strategy_pipe: impl Into<String>,
    ) -> Self {
        Self {
            core,
            resume_pipe: resume_pipe.into(),
            strategy_pipe: strategy_pipe.into(),
        }
    }

    async fn profile(&self, resume: &ResumeArtifact) -> AppResult<ResumeProfile> {
        let request = PipeRequest::new(
            &self.resume_pipe,
            vec![
                Message::system(RESUME_PROMPT),
                Message::user(resume.text.trim().to_string()),
            ],
        );
        let completion = self.core.complete(request).await?;
        parse_profile(&completion)
    }

    async fn strategies(&self, profile: &ResumeProfile) -> AppResult<StrategyBook> {
        let request = PipeRequest::new(
            &self.strategy_pipe,
            vec![
                Message::system(STRATEGY_PROMPT),
                Message::user(format!(
                    "Resume summary:\n{}\n\nKeywords: {}",
                    profile.summary,
                    profile.keywords.join(", ")
                )),
            ],
        );
        let completion = self.core.complete(request).await?;
        parse_strategies(&completion)
    }
}

#[async_trait]
impl ResumeAnalyzer for LangbaseResumeAnalyzer {
    async fn analyze(&self, resume: &ResumeArtifact) -> AppResult<SeedMaterial> {
        if resume.is_blank() {
            return Err(InterviewError::EmptyResume.into());
        }

        let profile = self.profile(resume).await?;
        let strategies = self.strategies(&profile).await?;

        info!(
            keywords = profile.keywords.len(),
            categories = strategies.len(),
            source = ?resume.source,
            "Resume analyzed"
        );

        Ok(SeedMaterial {
            profile,
            strategies,
        })
    }
}

/// Profile from the resume pipe; plain prose is kept as the summary.
pub(crate) fn parse_profile(completion: &str) -> AppResult<ResumeProfile> {
    let trimmed = completion.trim();
    if trimmed.is_empty() {
        return Err(InterviewError::SeedFailed {
            message: "resume analysis returned no text".to_string(),
        }
        .into());
    }

    let payload = extract_json_from_completion(trimmed)
        .ok()
        .and_then(|json| serde_json::from_str::<ProfilePayload>(json).ok());

    let profile = match payload {
        Some(p) if !p.summary.trim().is_empty() => ResumeProfile {
            summary: p.summary.trim().to_string(),
            keywords: p.keywords.into_vec(),
            sections: match p.sections {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            },
        },
        _ => {
            warn!("Resume analysis was not structured, using raw text as summary");
            ResumeProfile {
                summary: trimmed.to_string(),
                keywords: Vec::new(),
                sections: String::new(),
            }
        }
    };
    Ok(profile)
}

/// Strategy book from the strategy pipe, known categories first in declaration order.
pub(crate) fn parse_strategies(completion: &str) -> AppResult<StrategyBook> {
    let seed_failed = |message: String| InterviewError::SeedFailed { message };

    let json = extract_json_from_completion(completion).map_err(seed_failed)?;
    let map: serde_json::Map<String, serde_json::Value> = serde_json::from_str(json)
        .map_err(|e| seed_failed(format!("strategy output is not a JSON object: {}", e)))?;

    let mut entries: Vec<(String, StrategyPayload)> = Vec::with_capacity(map.len());
    for (name, value) in map {
        let name = name.trim().to_string();
        if name.is_empty() {
            continue;
        }
        match serde_json::from_value::<StrategyPayload>(value) {
            Ok(payload) => entries.push((name, payload)),
            Err(e) => warn!(category = %name, error = %e, "Skipping malformed strategy entry"),
        }
    }

    let rank = |name: &str| {
        DEFAULT_CATEGORIES
            .iter()
            .position(|c| *c == name)
            .unwrap_or(DEFAULT_CATEGORIES.len())
    };
    entries.sort_by_key(|(name, _)| rank(name));

    let strategies: Vec<Strategy> = entries
        .into_iter()
        .map(|(name, payload)| {
            let examples = payload
                .example_questions
                .into_iter()
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty())
                .collect();
            Strategy::new(name, payload.strategy.trim(), examples)
        })
        .collect();

    if strategies.is_empty() {
        return Err(InterviewError::EmptyStrategies.into());
    }
    Ok(StrategyBook::new(strategies))
}
