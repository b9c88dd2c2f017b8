//! Stop-hook adapter - the boundary between the host runtime and the engine.
//!
//! The host sends one JSON event on stdin each time the agent tries to end its
//! turn. An allow decision is signalled by writing nothing; a block decision
//! is a single JSON object `{"decision": "block", "reason": "..."}`.

mod transcript;

pub use transcript::{last_assistant_in, last_assistant_message};

use std::io::{Read, Write};
use std::path::PathBuf;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::engine::{Decision, StoreAction, Transition, decide};
use crate::error::Result;
use crate::prompt::PromptBuilder;
use crate::store::StateStore;

/// Inbound stop event. Every field is optional; unknown fields are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HookEvent {
    pub session_id: Option<String>,
    pub transcript_path: Option<PathBuf>,
    pub cwd: Option<PathBuf>,
    pub hook_event_name: Option<String>,

    /// Set by the host when this stop follows one of our own blocks
    #[serde(alias = "stopHookActive")]
    pub stop_hook_active: Option<bool>,

    #[serde(alias = "lastAssistantMessage")]
    pub last_assistant_message: Option<String>,
}

impl HookEvent {
    /// Parse an event, treating empty or unparsable input as an empty event
    pub fn parse(input: &str) -> Self {
        if input.trim().is_empty() {
            warn!("Empty hook event on stdin");
            return Self::default();
        }
        match serde_json::from_str(input) {
            Ok(event) => event,
            Err(e) => {
                warn!("Unparsable hook event ({}); treating as empty", e);
                Self::default()
            }
        }
    }

    /// Returns true if the host flagged this as a re-invocation after a block
    pub fn is_reentry(&self) -> bool {
        self.stop_hook_active.unwrap_or(false)
    }

    /// The agent's last message, falling back to the transcript when absent
    pub fn message(&self) -> String {
        if let Some(message) = &self.last_assistant_message {
            return message.clone();
        }
        self.transcript_path
            .as_deref()
            .and_then(last_assistant_message)
            .unwrap_or_default()
    }
}

#[derive(Debug, Serialize)]
struct BlockPayload<'a> {
    decision: &'static str,
    reason: &'a str,
}

/// Encode a decision for the host; `None` means write nothing (allow)
pub fn render(decision: &Decision) -> Result<Option<String>> {
    match decision {
        Decision::Allow => Ok(None),
        Decision::Block { reason } => {
            let payload = BlockPayload {
                decision: "block",
                reason,
            };
            Ok(Some(serde_json::to_string(&payload)?))
        }
    }
}

/// Runs the decision engine against a state store for each stop event
#[derive(Debug)]
pub struct StopHook<S: StateStore> {
    store: S,
    prompts: PromptBuilder,
}

impl<S: StateStore> StopHook<S> {
    /// Create a hook over the given store
    pub fn new(store: S, prompts: PromptBuilder) -> Self {
        Self { store, prompts }
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Decide one stop event and apply the resulting store mutation.
    ///
    /// Only store I/O failures surface as errors; they are fatal because the
    /// iteration count can no longer be trusted.
    pub fn handle(&self, event: &HookEvent) -> Result<Decision> {
        let Some(state) = self.store.read()? else {
            debug!("No active loop; allowing stop");
            return Ok(Decision::Allow);
        };

        if !state.is_valid() {
            warn!(
                "Active loop record at {} is degraded; continuing with recovered values",
                self.store.location()
            );
        }

        if event.is_reentry() {
            debug!("Stop event is a re-entry after a previous block");
        }

        let message = event.message();
        let outcome = decide(Some(&state), &message, &self.prompts);

        match &outcome.action {
            StoreAction::Keep => {}
            StoreAction::Write(next) => self.store.write(next)?,
            StoreAction::Delete => self.store.delete()?,
        }

        debug!("Stop decision: {}", outcome.transition);
        match outcome.transition {
            Transition::Continued => info!(
                "Blocking stop: iteration {}/{} (session {:?})",
                state.iteration + 1,
                state.max_iterations,
                event.session_id
            ),
            Transition::Completed => info!(
                "Completion marker {} found after {} iteration(s); loop finished",
                state.marker(),
                state.iteration
            ),
            Transition::Exhausted => info!(
                "Iteration cap reached ({}/{}); loop finished",
                state.iteration, state.max_iterations
            ),
            Transition::Idle => {}
        }

        Ok(outcome.decision)
    }

    /// Read one event from `input`, decide it, and write the reply to `output`
    pub fn run<R: Read, W: Write>(&self, mut input: R, mut output: W) -> Result<Decision> {
        let mut raw = Vec::new();
        input.read_to_end(&mut raw)?;
        let event = HookEvent::parse(&String::from_utf8_lossy(&raw));

        let decision = self.handle(&event)?;
        if let Some(reply) = render(&decision)? {
            writeln!(output, "{}", reply)?;
            output.flush()?;
        }
        Ok(decision)
    }
}
