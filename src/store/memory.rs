//! In-memory state store for tests and embedding.

use std::sync::Mutex;

use super::StateStore;
use crate::error::{Result, StopLoopError};
use crate::state::{LoopState, decode, encode};

/// Holds the record in memory, in its encoded form, so reads go through the
/// same codec as the file store.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    raw: Mutex<Option<String>>,
}

impl MemoryStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store holding an arbitrary raw record, damaged or not
    pub fn with_raw(raw: impl Into<String>) -> Self {
        Self {
            raw: Mutex::new(Some(raw.into())),
        }
    }

    /// The raw record as currently stored
    pub fn raw(&self) -> Option<String> {
        self.raw.lock().ok().and_then(|guard| guard.clone())
    }
}

impl StateStore for MemoryStateStore {
    fn read(&self) -> Result<Option<LoopState>> {
        let guard = self.raw.lock().map_err(|e| StopLoopError::Storage(e.to_string()))?;
        Ok(guard.as_deref().map(decode))
    }

    fn write(&self, state: &LoopState) -> Result<()> {
        let raw = encode(state)?;
        let mut guard = self.raw.lock().map_err(|e| StopLoopError::Storage(e.to_string()))?;
        *guard = Some(raw);
        Ok(())
    }

    fn delete(&self) -> Result<()> {
        let mut guard = self.raw.lock().map_err(|e| StopLoopError::Storage(e.to_string()))?;
        *guard = None;
        Ok(())
    }

    fn location(&self) -> String {
        "<memory>".to_string()
    }
}
