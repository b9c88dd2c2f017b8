//! Prompt re-injection - the text fed back to the agent on a forced continuation.
//!
//! Pure string construction. Nothing here reads or writes the state store.

use crate::state::{LoopState, promise_marker};

/// Default period, in iterations, between re-orientation directives
pub const DEFAULT_REORIENT_EVERY: u32 = 5;

/// Heading that opens the re-orientation directive
pub const REORIENT_HEADING: &str = "## Re-orientation";

const REORIENT_BODY: &str = "Long sessions drift. Before doing anything else:\n\
1. Re-read the relevant files, notes and progress artifacts from disk. Do not rely on what you remember from earlier in this conversation.\n\
2. Write a short summary of what is already done and what remains.\n\
3. Continue from that summary.";

const GENERIC_TASK: &str = "Continue working on the original task.";

/// Builds the `reason` text attached to a block decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptBuilder {
    /// Re-orientation period; 0 disables the directive
    reorient_every: u32,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_REORIENT_EVERY)
    }
}

impl PromptBuilder {
    /// Create a builder with the given re-orientation period
    pub fn new(reorient_every: u32) -> Self {
        Self { reorient_every }
    }

    /// Returns true if the continuation numbered `iteration` carries the directive
    pub fn reorients_at(&self, iteration: u32) -> bool {
        self.reorient_every > 0 && iteration > 0 && iteration % self.reorient_every == 0
    }

    /// Build the continuation message for a state that has just been advanced.
    ///
    /// `state.iteration` is the number of the continuation being issued.
    pub fn continuation(&self, state: &LoopState) -> String {
        let mut out = String::new();

        if self.reorients_at(state.iteration) {
            out.push_str(REORIENT_HEADING);
            out.push_str("\n\n");
            out.push_str(REORIENT_BODY);
            out.push_str("\n\n");
        }

        out.push_str(&format!(
            "Loop iteration {} of {}. You tried to stop, but the task is not marked complete.\n\n",
            state.iteration, state.max_iterations
        ));
        out.push_str(&format!(
            "When the task is genuinely finished, output {} exactly. Do not output it to escape the loop while work remains.\n\n",
            promise_marker(&state.completion_token)
        ));

        out.push_str("## Task\n\n");
        if state.task.trim().is_empty() {
            out.push_str(GENERIC_TASK);
        } else {
            out.push_str(&state.task);
        }
        out
    }
}
