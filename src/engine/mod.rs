//! Decision engine - allow the agent to stop, or force another iteration.
//!
//! `decide` is a pure, total function of the current state and the agent's
//! last message. It reports what should happen to the stored record; the
//! caller performs the I/O.
//!
//! Exhaustion is checked before the completion marker so a record that is
//! already at (or past) its cap always terminates, whatever the message says.

use std::fmt;

use crate::prompt::PromptBuilder;
use crate::state::LoopState;

/// What the host runtime should do with the stop attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Let the agent's turn end
    Allow,
    /// Keep the agent going, feeding it `reason` as its next instruction
    Block { reason: String },
}

impl Decision {
    /// Returns true for a block decision
    pub fn is_block(&self) -> bool {
        matches!(self, Decision::Block { .. })
    }
}

/// Mutation to apply to the state store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreAction {
    /// Leave the store untouched
    Keep,
    /// Persist the advanced state
    Write(LoopState),
    /// Remove the record (terminal transition)
    Delete,
}

/// Which row of the state machine fired
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// No record; nothing to do
    Idle,
    /// Agent emitted the completion marker
    Completed,
    /// Iteration cap reached
    Exhausted,
    /// Forced one more iteration
    Continued,
}

impl fmt::Display for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Transition::Idle => "idle",
            Transition::Completed => "completed",
            Transition::Exhausted => "exhausted",
            Transition::Continued => "continued",
        };
        write!(f, "{}", name)
    }
}

/// Result of one decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub decision: Decision,
    pub action: StoreAction,
    pub transition: Transition,
}

impl Outcome {
    fn allow(action: StoreAction, transition: Transition) -> Self {
        Self {
            decision: Decision::Allow,
            action,
            transition,
        }
    }
}

/// Decide what to do with a stop attempt
pub fn decide(state: Option<&LoopState>, last_message: &str, prompts: &PromptBuilder) -> Outcome {
    let Some(state) = state else {
        return Outcome::allow(StoreAction::Keep, Transition::Idle);
    };

    if state.is_exhausted() {
        return Outcome::allow(StoreAction::Delete, Transition::Exhausted);
    }

    if state.is_completed_by(last_message) {
        return Outcome::allow(StoreAction::Delete, Transition::Completed);
    }

    let next = state.advanced();
    Outcome {
        decision: Decision::Block {
            reason: prompts.continuation(&next),
        },
        action: StoreAction::Write(next),
        transition: Transition::Continued,
    }
}
