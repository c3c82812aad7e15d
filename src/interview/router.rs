//! Explicit stage routing.
//!
//! Each stage maps to the handler that runs it and a pure function choosing
//! what follows. A turn ends when a router returns [`Transition::EndOfTurn`].

use std::collections::HashMap;

use super::{Decision, SessionState, Stage};

/// Stage transitions allowed within one turn before the turn is aborted.
pub const MAX_STEPS_PER_TURN: usize = 8;

/// What follows a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    To(Stage),
    /// Hand control back to the caller.
    EndOfTurn,
}

/// Which stage component runs for a routed stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageHandler {
    Evaluate,
    Reflect,
    ReEvaluate,
    Decide,
    Generate,
    Summarize,
}

/// Handler plus the router that runs after it.
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub handler: StageHandler,
    pub next: fn(&SessionState) -> Transition,
}

/// Stage → route map for one interview turn.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    routes: HashMap<Stage, Route>,
}

/// Re-evaluate when the reflector distrusted the score, else decide.
pub fn route_after_reflect(state: &SessionState) -> Transition {
    if state.need_re_eval {
        Transition::To(Stage::ReEvaluate)
    } else {
        Transition::To(Stage::Decide)
    }
}

/// Summarize on an end decision, else generate the next question.
pub fn route_after_decide(state: &SessionState) -> Transition {
    match state.decision {
        Some(Decision::End) => Transition::To(Stage::Summarize),
        _ => Transition::To(Stage::Generate),
    }
}

fn to_reflect(_: &SessionState) -> Transition {
    Transition::To(Stage::Reflect)
}

fn to_decide(_: &SessionState) -> Transition {
    Transition::To(Stage::Decide)
}

fn end_of_turn(_: &SessionState) -> Transition {
    Transition::EndOfTurn
}

impl RoutingTable {
    /// The interview graph.
    pub fn new() -> Self {
        let mut table = Self::empty();
        table.insert(Stage::Evaluate, StageHandler::Evaluate, to_reflect);
        table.insert(Stage::Reflect, StageHandler::Reflect, route_after_reflect);
        table.insert(Stage::ReEvaluate, StageHandler::ReEvaluate, to_decide);
        table.insert(Stage::Decide, StageHandler::Decide, route_after_decide);
        table.insert(Stage::Generate, StageHandler::Generate, end_of_turn);
        table.insert(Stage::Summarize, StageHandler::Summarize, end_of_turn);
        table
    }

    /// A table with no routes.
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
        }
    }

    /// Add or replace the route for a stage.
    pub fn insert(
        &mut self,
        stage: Stage,
        handler: StageHandler,
        next: fn(&SessionState) -> Transition,
    ) {
        self.routes.insert(stage, Route { handler, next });
    }

    pub fn get(&self, stage: Stage) -> Option<&Route> {
        self.routes.get(&stage)
    }
}

impl Default for RoutingTable {
    fn default() -> Self {
        Self::new()
    }
}
