//! State store - durable single-record storage for the active loop.
//!
//! The decision engine never touches a path directly; it goes through the
//! `StateStore` trait so tests can swap in `MemoryStateStore`. The production
//! binding is `FileStateStore`, which keeps the record in one well-known file
//! per project.

mod file;
mod memory;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;

use log::{info, warn};

use crate::error::{Result, StopLoopError};
use crate::state::LoopState;

/// Storage for the one active loop record.
///
/// `read` returns `Ok(None)` when no loop is active; that is the normal idle
/// condition, not a failure. A record that exists but is damaged decodes to
/// safe defaults rather than erroring.
pub trait StateStore {
    /// Read the active record, if any
    fn read(&self) -> Result<Option<LoopState>>;

    /// Replace the record atomically
    fn write(&self, state: &LoopState) -> Result<()>;

    /// Remove the record; removing an absent record is not an error
    fn delete(&self) -> Result<()>;

    /// Human-readable location of the record, for messages
    fn location(&self) -> String;

    /// Create a new loop record with `iteration = 0`.
    ///
    /// Refuses with `AlreadyActive` if a record exists, unless `overwrite` is
    /// set, in which case the previous loop's progress is discarded.
    fn create(&self, state: &LoopState, overwrite: bool) -> Result<()> {
        if state.task.trim().is_empty() {
            return Err(StopLoopError::InvalidInput("task must not be empty".to_string()));
        }
        if state.completion_token.is_empty() {
            return Err(StopLoopError::InvalidInput("completion token must not be empty".to_string()));
        }
        if state.max_iterations == 0 {
            return Err(StopLoopError::InvalidInput("max iterations must be at least 1".to_string()));
        }

        if let Some(existing) = self.read()? {
            if !overwrite {
                return Err(StopLoopError::AlreadyActive(self.location().into()));
            }
            warn!(
                "Overwriting active loop at {} (was at iteration {}/{})",
                self.location(),
                existing.iteration,
                existing.max_iterations
            );
        }

        let fresh = LoopState {
            iteration: 0,
            ..state.clone()
        };
        self.write(&fresh)?;
        info!(
            "Created loop at {} (max_iterations={}, token={:?})",
            self.location(),
            fresh.max_iterations,
            fresh.completion_token
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_then_read() {
        let store = MemoryStateStore::new();
        store.create(&LoopState::new("fix bug X", 3, "DONE"), false).unwrap();

        let state = store.read().unwrap().unwrap();
        assert_eq!(state.iteration, 0);
        assert_eq!(state.max_iterations, 3);
        assert_eq!(state.task, "fix bug X");
    }

    #[test]
    fn test_create_resets_iteration() {
        let store = MemoryStateStore::new();
        let mut state = LoopState::new("task", 3, "DONE");
        state.iteration = 2;
        store.create(&state, false).unwrap();
        assert_eq!(store.read().unwrap().unwrap().iteration, 0);
    }

    #[test]
    fn test_create_refuses_when_active() {
        let store = MemoryStateStore::new();
        store.create(&LoopState::new("first", 3, "DONE"), false).unwrap();

        let result = store.create(&LoopState::new("second", 3, "DONE"), false);
        assert!(matches!(result, Err(StopLoopError::AlreadyActive(_))));
        assert_eq!(store.read().unwrap().unwrap().task, "first");
    }

    #[test]
    fn test_create_overwrite_replaces_active() {
        let store = MemoryStateStore::new();
        store.create(&LoopState::new("first", 3, "DONE"), false).unwrap();
        store.create(&LoopState::new("second", 7, "SHIP"), true).unwrap();

        let state = store.read().unwrap().unwrap();
        assert_eq!(state.task, "second");
        assert_eq!(state.max_iterations, 7);
    }

    #[test]
    fn test_create_rejects_bad_input() {
        let store = MemoryStateStore::new();
        assert!(matches!(
            store.create(&LoopState::new("   ", 3, "DONE"), false),
            Err(StopLoopError::InvalidInput(_))
        ));
        assert!(matches!(
            store.create(&LoopState::new("task", 0, "DONE"), false),
            Err(StopLoopError::InvalidInput(_))
        ));
        assert!(matches!(
            store.create(&LoopState::new("task", 3, ""), false),
            Err(StopLoopError::InvalidInput(_))
        ));
        assert!(store.read().unwrap().is_none());
    }
}
