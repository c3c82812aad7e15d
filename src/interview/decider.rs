//! Termination and strategy policy.
//!
//! The rules are evaluated in a fixed order and the first applicable one
//! wins:
//!
//! 1. hard cap on completed turns
//! 2. first-round guarantee (every category asked at least once)
//! 3. full-coverage early exit
//! 4. follow-up on a weak answer (only after the first round)
//! 5. rotation to the next category

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Decision, ScoreRecord, SessionState, Stage};
use crate::config::InterviewConfig;

/// Which policy rule produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionRule {
    NoStrategies,
    HardCap,
    FirstRound,
    FullCoverage,
    FollowUp,
    Rotation,
}

/// Result of [`Decider::decide`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionOutcome {
    pub decision: Decision,
    /// Category to switch to, when the rule changes it.
    pub next_strategy: Option<String>,
    pub rule: DecisionRule,
}

impl DecisionOutcome {
    fn end(rule: DecisionRule) -> Self {
        Self {
            decision: Decision::End,
            next_strategy: None,
            rule,
        }
    }

    fn switch(strategy: &str, rule: DecisionRule) -> Self {
        Self {
            decision: Decision::NextStrategy,
            next_strategy: Some(strategy.to_string()),
            rule,
        }
    }
}

/// Pure policy over strategies, coverage, turn count and the latest score.
#[derive(Debug, Clone, Copy)]
pub struct Decider {
    max_turns: usize,
    coverage_exit_turns: usize,
}

impl Decider {
    /// Create a decider with explicit thresholds
    pub fn new(max_turns: usize, coverage_exit_turns: usize) -> Self {
        Self {
            max_turns,
            coverage_exit_turns,
        }
    }

    /// Create a decider from interview configuration
    pub fn from_config(config: &InterviewConfig) -> Self {
        Self::new(config.max_turns, config.coverage_exit_turns)
    }

    /// Decide what follows the settled score. Does not mutate anything.
    pub fn decide(&self, state: &SessionState) -> DecisionOutcome {
        if state.strategies.is_empty() {
            return DecisionOutcome::end(DecisionRule::NoStrategies);
        }

        let completed = state.completed_turns();
        if completed >= self.max_turns {
            return DecisionOutcome::end(DecisionRule::HardCap);
        }

        let uncovered = state.uncovered();
        if let Some(first_uncovered) = uncovered.first() {
            // The current category keeps this turn until it has been asked once
            if state.coverage_of(&state.current_strategy) >= 1 {
                return DecisionOutcome::switch(first_uncovered, DecisionRule::FirstRound);
            }
        }

        if uncovered.is_empty() && completed >= self.coverage_exit_turns {
            return DecisionOutcome::end(DecisionRule::FullCoverage);
        }

        let latest = state
            .latest_score()
            .copied()
            .unwrap_or_else(|| ScoreRecord::neutral(0));
        if uncovered.is_empty() && latest.has_low() {
            return DecisionOutcome {
                decision: Decision::AdditionalQuestion,
                next_strategy: None,
                rule: DecisionRule::FollowUp,
            };
        }

        let names = state.strategies.names();
        let next = match state.strategies.position(&state.current_strategy) {
            Some(index) => names[(index + 1) % names.len()],
            None => names[0],
        };
        DecisionOutcome::switch(next, DecisionRule::Rotation)
    }

    /// Write a decision into the state.
    pub fn apply(&self, state: &mut SessionState, outcome: &DecisionOutcome) {
        if let Some(strategy) = &outcome.next_strategy {
            state.current_strategy = strategy.clone();
        }
        state.decision = Some(outcome.decision);
        state.stage = match outcome.decision {
            Decision::End => Stage::End,
            Decision::NextStrategy | Decision::AdditionalQuestion => Stage::Generate,
        };

        info!(
            session_id = %state.session_id,
            decision = outcome.decision.as_str(),
            rule = ?outcome.rule,
            strategy = %state.current_strategy,
            turns = state.completed_turns(),
            "Decision made"
        );
    }

    /// Decide and apply in one step.
    pub fn run(&self, state: &mut SessionState) -> DecisionOutcome {
        let outcome = self.decide(state);
        self.apply(state, &outcome);
        outcome
    }
}

impl Default for Decider {
    fn default() -> Self {
        Self::from_config(&InterviewConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interview::{Grade, ResumeProfile, Strategy, StrategyBook, Turn, DEFAULT_CATEGORIES};
    use pretty_assertions::assert_eq;

    fn fresh() -> SessionState {
        let book = StrategyBook::new(
            DEFAULT_CATEGORIES
                .iter()
                .map(|n| Strategy::new(*n, "", vec![]))
                .collect(),
        );
        SessionState::new(ResumeProfile::default(), book, "Experience", "Q0?")
    }

    fn add_turn(state: &mut SessionState, relevance: Grade, specificity: Grade) {
        let n = state.turns.len();
        let index = state.record_turn(Turn {
            question: format!("Q{}?", n),
            answer: format!("answer {}", n),
            strategy: state.current_strategy.clone(),
        });
        state.upsert_score(ScoreRecord::new(relevance, specificity, index));
    }

    fn cover_all(state: &mut SessionState) {
        for name in DEFAULT_CATEGORIES {
            state.coverage.insert(name.to_string(), 1);
        }
    }

    #[test]
    fn test_no_strategies_ends() {
        let mut state = fresh();
        state.strategies = StrategyBook::default();
        let outcome = Decider::default().decide(&state);
        assert_eq!(outcome.decision, Decision::End);
        assert_eq!(outcome.rule, DecisionRule::NoStrategies);
    }

    #[test]
    fn test_hard_cap_ends_even_with_uncovered() {
        let mut state = fresh();
        for _ in 0..5 {
            add_turn(&mut state, Grade::Low, Grade::Low);
        }
        let outcome = Decider::default().decide(&state);
        assert_eq!(outcome, DecisionOutcome::end(DecisionRule::HardCap));
    }

    #[test]
    fn test_first_round_switches_to_first_uncovered() {
        let mut state = fresh();
        add_turn(&mut state, Grade::High, Grade::High);
        let outcome = Decider::default().decide(&state);
        assert_eq!(
            outcome,
            DecisionOutcome::switch("Motivation & Communication", DecisionRule::FirstRound)
        );
    }

    #[test]
    fn test_first_round_ignores_weak_answer() {
        let mut state = fresh();
        add_turn(&mut state, Grade::Low, Grade::Low);
        let outcome = Decider::default().decide(&state);
        assert_eq!(outcome.decision, Decision::NextStrategy);
        assert_eq!(outcome.rule, DecisionRule::FirstRound);
    }

    #[test]
    fn test_first_round_skips_covered_categories_in_order() {
        let mut state = fresh();
        state.coverage.insert("Motivation & Communication".to_string(), 1);
        add_turn(&mut state, Grade::Medium, Grade::Medium);
        let outcome = Decider::default().decide(&state);
        assert_eq!(outcome.next_strategy.as_deref(), Some("Logical Thinking"));
    }

    #[test]
    fn test_uncovered_current_falls_through_to_rotation() {
        let mut state = fresh();
        state.current_strategy = "Logical Thinking".to_string();
        add_turn(&mut state, Grade::Low, Grade::Low);
        let outcome = Decider::default().decide(&state);
        // No follow-up during the first round
        assert_eq!(outcome.rule, DecisionRule::Rotation);
        assert_eq!(outcome.next_strategy.as_deref(), Some("Technical Expertise"));
    }

    #[test]
    fn test_follow_up_after_first_round() {
        let mut state = fresh();
        cover_all(&mut state);
        state.current_strategy = "Technical Expertise".to_string();
        add_turn(&mut state, Grade::Low, Grade::Medium);
        let outcome = Decider::default().decide(&state);
        assert_eq!(outcome.decision, Decision::AdditionalQuestion);
        assert_eq!(outcome.next_strategy, None);
        assert_eq!(outcome.rule, DecisionRule::FollowUp);
    }

    #[test]
    fn test_rotation_wraps_around() {
        let mut state = fresh();
        cover_all(&mut state);
        state.current_strategy = "Growth & Self-direction".to_string();
        add_turn(&mut state, Grade::Medium, Grade::High);
        let outcome = Decider::default().decide(&state);
        assert_eq!(outcome, DecisionOutcome::switch("Experience", DecisionRule::Rotation));
    }

    #[test]
    fn test_unknown_current_strategy_rotates_to_first() {
        let mut state = fresh();
        cover_all(&mut state);
        state.current_strategy = "Unknown".to_string();
        add_turn(&mut state, Grade::Medium, Grade::Medium);
        let outcome = Decider::default().decide(&state);
        assert_eq!(outcome.next_strategy.as_deref(), Some("Experience"));
    }

    #[test]
    fn test_full_coverage_exit_with_decoupled_threshold() {
        let mut state = fresh();
        cover_all(&mut state);
        for _ in 0..3 {
            add_turn(&mut state, Grade::High, Grade::High);
        }
        let decider = Decider::new(5, 3);
        assert_eq!(
            decider.decide(&state),
            DecisionOutcome::end(DecisionRule::FullCoverage)
        );
        // Default thresholds keep going
        assert_eq!(Decider::default().decide(&state).decision, Decision::NextStrategy);
    }

    #[test]
    fn test_apply_sets_stage_and_strategy() {
        let mut state = fresh();
        add_turn(&mut state, Grade::High, Grade::High);
        let decider = Decider::default();
        let outcome = decider.run(&mut state);
        assert_eq!(state.current_strategy, "Motivation & Communication");
        assert_eq!(state.decision, Some(Decision::NextStrategy));
        assert_eq!(state.stage, Stage::Generate);
        assert_eq!(outcome.rule, DecisionRule::FirstRound);

        for _ in 0..4 {
            add_turn(&mut state, Grade::High, Grade::High);
        }
        decider.run(&mut state);
        assert_eq!(state.decision, Some(Decision::End));
        assert_eq!(state.stage, Stage::End);
    }

    #[test]
    fn test_decide_is_pure() {
        let mut state = fresh();
        add_turn(&mut state, Grade::Medium, Grade::Medium);
        let before = state.clone();
        let _ = Decider::default().decide(&state);
        assert_eq!(state, before);
    }
}
