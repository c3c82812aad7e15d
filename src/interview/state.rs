//! Typed session state threaded through every interview stage.
//!
//! A [`SessionState`] is owned by exactly one interview. Stages mutate it
//! through the update methods below so the history invariants hold:
//! turns are append-only without an immediate duplicate, scores stay aligned
//! index-for-index with turns, and coverage never decreases.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The five interview focus areas, in declaration order.
pub const DEFAULT_CATEGORIES: [&str; 5] = [
    "Experience",
    "Motivation & Communication",
    "Logical Thinking",
    "Technical Expertise",
    "Growth & Self-direction",
];

/// Ordinal quality label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grade {
    /// Weak or unsupported.
    Low,
    /// Adequate.
    Medium,
    /// Strong and grounded.
    High,
}

impl Grade {
    /// Get the label as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::Low => "low",
            Grade::Medium => "medium",
            Grade::High => "high",
        }
    }

    /// Position on the scale (low = 0).
    pub fn ordinal(&self) -> u8 {
        match self {
            Grade::Low => 0,
            Grade::Medium => 1,
            Grade::High => 2,
        }
    }

    /// Inverse of [`Grade::ordinal`], saturating at `High`.
    pub fn from_ordinal(value: u8) -> Self {
        match value {
            0 => Grade::Low,
            1 => Grade::Medium,
            _ => Grade::High,
        }
    }

    /// Lenient label parsing for model output (English or Korean labels).
    pub fn parse_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "low" | "l" | "하" => Some(Grade::Low),
            "medium" | "mid" | "moderate" | "m" | "중" => Some(Grade::Medium),
            "high" | "h" | "상" => Some(Grade::High),
            _ => None,
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Grade::parse_label(s).ok_or_else(|| format!("Unknown grade: {}", s))
    }
}

/// Score for one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// How directly the answer addresses the question.
    pub relevance: Grade,
    /// How concrete the answer is.
    pub specificity: Grade,
    /// Index of the scored turn in [`SessionState::turns`].
    pub turn_index: usize,
}

impl ScoreRecord {
    /// Create a score for a turn
    pub fn new(relevance: Grade, specificity: Grade, turn_index: usize) -> Self {
        Self {
            relevance,
            specificity,
            turn_index,
        }
    }

    /// The default used when model output cannot be parsed.
    pub fn neutral(turn_index: usize) -> Self {
        Self::new(Grade::Medium, Grade::Medium, turn_index)
    }

    /// Whether either label is low.
    pub fn has_low(&self) -> bool {
        self.relevance == Grade::Low || self.specificity == Grade::Low
    }

    /// Whether both labels equal `grade`.
    pub fn both(&self, grade: Grade) -> bool {
        self.relevance == grade && self.specificity == grade
    }
}

/// One question/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    /// Category the question was asked under.
    pub strategy: String,
}

/// Router output: the stage the session is in or moves to next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Evaluate,
    Reflect,
    ReEvaluate,
    Decide,
    Generate,
    Summarize,
    End,
}

impl Stage {
    /// Every stage, in pipeline order.
    pub const ALL: [Stage; 7] = [
        Stage::Evaluate,
        Stage::Reflect,
        Stage::ReEvaluate,
        Stage::Decide,
        Stage::Generate,
        Stage::Summarize,
        Stage::End,
    ];

    /// Get the stage name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Evaluate => "evaluate",
            Stage::Reflect => "reflect",
            Stage::ReEvaluate => "re_evaluate",
            Stage::Decide => "decide",
            Stage::Generate => "generate",
            Stage::Summarize => "summarize",
            Stage::End => "end",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the decider concluded after a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// Move to another category.
    NextStrategy,
    /// Stay on the current category with a follow-up.
    AdditionalQuestion,
    /// Stop asking and write the report.
    End,
}

impl Decision {
    /// Get the decision tag as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Decision::NextStrategy => "next_strategy",
            Decision::AdditionalQuestion => "additional_question",
            Decision::End => "end",
        }
    }
}

/// Why the reflector distrusted a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inconsistency {
    /// The answer is too short to support any score.
    TooShort,
    /// High/high without figures or domain terms.
    OverlyGenerous,
    /// Low relevance paired with high specificity.
    Contradictory,
    /// Low/low for a long answer that shows evidence.
    OverlyStrict,
}

impl Inconsistency {
    /// Human-readable reason
    pub fn reason(&self) -> &'static str {
        match self {
            Inconsistency::TooShort => "too short to support the given score",
            Inconsistency::OverlyGenerous => "overly generous, no grounding",
            Inconsistency::Contradictory => "contradictory combination",
            Inconsistency::OverlyStrict => "overly strict given visible grounding",
        }
    }
}

/// Outcome of the last reflection pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum ReflectionOutcome {
    /// Score accepted as-is.
    Accepted,
    /// Score flagged for one stricter re-evaluation.
    NeedsReEvaluation(Inconsistency),
}

/// One interview category with its question bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    /// What this category probes for the candidate.
    pub description: String,
    pub example_questions: Vec<String>,
}

impl Strategy {
    /// Create a category with its description and examples
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        example_questions: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            example_questions,
        }
    }
}

/// Ordered, fixed set of categories for one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyBook {
    strategies: Vec<Strategy>,
}

impl StrategyBook {
    /// Build a book; later duplicates of a name are dropped.
    pub fn new(strategies: Vec<Strategy>) -> Self {
        let mut unique: Vec<Strategy> = Vec::with_capacity(strategies.len());
        for strategy in strategies {
            if !unique.iter().any(|s| s.name == strategy.name) {
                unique.push(strategy);
            }
        }
        Self { strategies: unique }
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Strategy> {
        self.strategies.iter()
    }

    /// Category names in declaration order.
    pub fn names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Strategy> {
        self.strategies.iter().find(|s| s.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.strategies.iter().position(|s| s.name == name)
    }

    pub fn first(&self) -> Option<&Strategy> {
        self.strategies.first()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }
}

/// Resume digest produced by resume analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResumeProfile {
    pub summary: String,
    pub keywords: Vec<String>,
    /// Sectioned digest (role, projects, skills, certificates, open points).
    #[serde(default)]
    pub sections: String,
}

/// Final feedback for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionDigest {
    pub category: String,
    pub turn_count: usize,
    /// Tendency of relevance labels; `None` without turns.
    pub relevance: Option<Grade>,
    /// Tendency of specificity labels; `None` without turns.
    pub specificity: Option<Grade>,
    /// Answers contain figures, durations or domain terms.
    pub evidence_present: bool,
    /// More than half of the category's scores carry a low label.
    pub mostly_low: bool,
    /// Whether the report may claim strengths for this category.
    pub strengths_allowed: bool,
}

impl SectionDigest {
    /// A category with at least one exchange.
    pub fn is_applicable(&self) -> bool {
        self.turn_count > 0
    }
}

/// Report stored at termination.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackReport {
    /// Rendered report text.
    pub text: String,
    /// One digest per declared category, in declaration order.
    pub sections: Vec<SectionDigest>,
    pub generated_at: DateTime<Utc>,
}

/// The single mutable record threaded through every stage of an interview.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub profile: ResumeProfile,
    pub strategies: StrategyBook,
    /// Category → number of questions asked under it.
    pub coverage: BTreeMap<String, u32>,
    pub turns: Vec<Turn>,
    /// Aligned index-for-index with `turns`.
    pub scores: Vec<ScoreRecord>,
    pub current_question: String,
    pub current_answer: String,
    pub current_strategy: String,
    pub used_questions: Vec<String>,
    /// Set while a flagged score awaits its single re-evaluation.
    pub reflect_flag: bool,
    pub need_re_eval: bool,
    pub reflection: Option<ReflectionOutcome>,
    pub decision: Option<Decision>,
    pub stage: Stage,
    pub report: Option<FeedbackReport>,
}

impl SessionState {
    /// Seed a session with its opening question.
    ///
    /// The opening category is pre-marked as covered because its question is
    /// already chosen.
    pub fn new(
        profile: ResumeProfile,
        strategies: StrategyBook,
        opening_strategy: impl Into<String>,
        opening_question: impl Into<String>,
    ) -> Self {
        let opening_strategy = opening_strategy.into();
        let opening_question = opening_question.into();

        let mut coverage: BTreeMap<String, u32> =
            strategies.iter().map(|s| (s.name.clone(), 0)).collect();
        coverage.insert(opening_strategy.clone(), 1);

        let used_questions = if opening_question.is_empty() {
            Vec::new()
        } else {
            vec![opening_question.clone()]
        };

        Self {
            session_id: Uuid::new_v4().to_string(),
            profile,
            strategies,
            coverage,
            turns: Vec::new(),
            scores: Vec::new(),
            current_question: opening_question,
            current_answer: String::new(),
            current_strategy: opening_strategy,
            used_questions,
            reflect_flag: false,
            need_re_eval: false,
            reflection: None,
            decision: None,
            stage: Stage::Evaluate,
            report: None,
        }
    }

    /// Store the candidate's answer for the in-flight question.
    pub fn set_answer(&mut self, answer: impl Into<String>) {
        self.current_answer = answer.into();
        self.stage = Stage::Evaluate;
    }

    /// Append a turn unless it repeats the immediately preceding one.
    ///
    /// Returns the index of the turn the caller should score.
    pub fn record_turn(&mut self, turn: Turn) -> usize {
        let duplicate = self
            .turns
            .last()
            .is_some_and(|last| last.question == turn.question && last.answer == turn.answer);
        if !duplicate {
            self.turns.push(turn);
        }
        self.turns.len() - 1
    }

    /// Store the score for `score.turn_index`, replacing any existing one.
    pub fn upsert_score(&mut self, score: ScoreRecord) {
        match self.scores.get_mut(score.turn_index) {
            Some(existing) => *existing = score,
            None => self.scores.push(score),
        }
    }

    /// Replace the latest score in place, keeping its turn index.
    pub fn replace_latest_score(&mut self, relevance: Grade, specificity: Grade) {
        let fallback_index = self.turns.len().saturating_sub(1);
        match self.scores.last_mut() {
            Some(last) => {
                last.relevance = relevance;
                last.specificity = specificity;
            }
            None => self
                .scores
                .push(ScoreRecord::new(relevance, specificity, fallback_index)),
        }
    }

    pub fn latest_score(&self) -> Option<&ScoreRecord> {
        self.scores.last()
    }

    /// Number of completed question/answer exchanges.
    pub fn completed_turns(&self) -> usize {
        self.turns.len()
    }

    pub fn coverage_of(&self, name: &str) -> u32 {
        self.coverage.get(name).copied().unwrap_or(0)
    }

    /// Categories never asked about yet, in declaration order.
    pub fn uncovered(&self) -> Vec<&str> {
        self.strategies
            .iter()
            .map(|s| s.name.as_str())
            .filter(|name| self.coverage_of(name) < 1)
            .collect()
    }

    pub fn first_round_complete(&self) -> bool {
        self.uncovered().is_empty()
    }

    pub fn increment_coverage(&mut self, name: &str) {
        *self.coverage.entry(name.to_string()).or_insert(0) += 1;
    }

    /// Remember a question so it is never asked again verbatim.
    pub fn mark_used(&mut self, question: &str) {
        if !self.is_used(question) {
            self.used_questions.push(question.to_string());
        }
    }

    pub fn is_used(&self, question: &str) -> bool {
        self.used_questions.iter().any(|q| q == question)
    }

    /// The interview has ended and its report is stored.
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::End && self.report.is_some()
    }
}
