//! Loop state record and related types
//!
//! A `LoopState` is the single persistent record of an active loop. It is
//! created by the start operation with `iteration = 0`, mutated only by the
//! decision engine (which bumps `iteration`), and deleted on any terminal
//! transition.

mod codec;

pub use codec::{decode, encode};

use chrono::{DateTime, Utc};

/// Default cap on forced continuations
pub const DEFAULT_MAX_ITERATIONS: u32 = 50;

/// Default completion token the agent must wrap in `<promise>` tags
pub const DEFAULT_COMPLETION_TOKEN: &str = "COMPLETE";

/// Iteration assumed when a stored record has a missing or unparsable count.
///
/// Deliberately 1, not the initial 0: a damaged record is treated as mid-loop.
pub const RECOVERY_ITERATION: u32 = 1;

/// Wrap a completion token in the literal marker the agent must emit
pub fn promise_marker(token: &str) -> String {
    format!("<promise>{}</promise>", token)
}

/// The persistent state of one active loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopState {
    //=== Progress ===
    /// Continuation cycles executed so far (0 right after start)
    pub iteration: u32,

    /// Hard cap on continuations
    pub max_iterations: u32,

    //=== Immutable after start ===
    /// Token the agent emits inside `<promise>` tags when genuinely done
    pub completion_token: String,

    /// Original task text, echoed verbatim on each continuation
    pub task: String,

    /// When the loop was started; informational only
    pub started_at: Option<DateTime<Utc>>,
}

impl LoopState {
    /// Create the initial state for a freshly started loop
    pub fn new(task: impl Into<String>, max_iterations: u32, completion_token: impl Into<String>) -> Self {
        Self {
            iteration: 0,
            max_iterations,
            completion_token: completion_token.into(),
            task: task.into(),
            started_at: Some(Utc::now()),
        }
    }

    /// Returns true once no further continuation is allowed
    pub fn is_exhausted(&self) -> bool {
        self.iteration >= self.max_iterations
    }

    /// Number of continuations still available
    pub fn remaining(&self) -> u32 {
        self.max_iterations.saturating_sub(self.iteration)
    }

    /// The exact marker that ends this loop
    pub fn marker(&self) -> String {
        promise_marker(&self.completion_token)
    }

    /// Returns true if the agent's message carries this loop's completion marker.
    ///
    /// Plain, case-sensitive substring match anywhere in the message.
    pub fn is_completed_by(&self, message: &str) -> bool {
        message.contains(&self.marker())
    }

    /// The state after one more forced continuation
    pub fn advanced(&self) -> Self {
        Self {
            iteration: self.iteration.saturating_add(1),
            ..self.clone()
        }
    }

    /// Returns true if the record satisfies every invariant of an active loop
    pub fn is_valid(&self) -> bool {
        self.iteration <= self.max_iterations && !self.completion_token.is_empty() && !self.task.is_empty()
    }
}
