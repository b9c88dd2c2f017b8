//! stoploop - a stop-hook loop controller
//!
//! Keeps a turn-based agent working on one task across many turns. Each time
//! the agent tries to stop, the host runtime invokes the hook; stoploop
//! either lets the turn end or blocks it and re-supplies the original task,
//! until the agent emits `<promise>TOKEN</promise>` or the iteration cap runs
//! out.

pub mod config;
pub mod engine;
pub mod error;
pub mod hook;
pub mod prompt;
pub mod state;
pub mod store;

pub use error::{Result, StopLoopError};
