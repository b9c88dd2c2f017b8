//! File-backed state store.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::debug;

use super::StateStore;
use crate::error::{Result, StopLoopError};
use crate::state::{LoopState, decode, encode};

/// Stores the loop record in a single file, replaced via temp-file + rename.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a store bound to the given record path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path of the record file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "state".to_string());
        self.path.with_file_name(format!(".{}.{}.tmp", name, std::process::id()))
    }

    fn write_atomic(&self, contents: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.tmp_path();
        let result = File::create(&tmp_path).and_then(|mut file| {
            file.write_all(contents.as_bytes())?;
            file.sync_all()
        });
        if let Err(e) = result.and_then(|_| fs::rename(&tmp_path, &self.path)) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        Ok(())
    }
}

impl StateStore for FileStateStore {
    fn read(&self) -> Result<Option<LoopState>> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No state record at {}", self.path.display());
                return Ok(None);
            }
            Err(e) => {
                return Err(StopLoopError::Storage(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )));
            }
        };
        let raw = String::from_utf8_lossy(&bytes);
        let state = decode(&raw);
        debug!(
            "Read state from {}: iteration={}/{}",
            self.path.display(),
            state.iteration,
            state.max_iterations
        );
        Ok(Some(state))
    }

    fn write(&self, state: &LoopState) -> Result<()> {
        debug!(
            "Writing state to {}: iteration={}/{}",
            self.path.display(),
            state.iteration,
            state.max_iterations
        );
        let raw = encode(state)?;
        self.write_atomic(&raw)
            .map_err(|e| StopLoopError::Storage(format!("failed to write {}: {}", self.path.display(), e)))
    }

    fn delete(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Deleted state record {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StopLoopError::Storage(format!(
                "failed to delete {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
