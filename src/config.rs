//! Configuration for stoploop, loaded from YAML with a fallback chain.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, StopLoopError};
use crate::prompt::DEFAULT_REORIENT_EVERY;
use crate::state::{DEFAULT_COMPLETION_TOKEN, DEFAULT_MAX_ITERATIONS, LoopState};

/// Environment variable the host runtime sets to the project root
pub const PROJECT_DIR_ENV: &str = "CLAUDE_PROJECT_DIR";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub state: StateConfig,
    #[serde(rename = "loop")]
    pub loop_defaults: LoopConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Record location, relative to the project directory unless absolute
    pub path: PathBuf,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(".claude").join("stoploop.local.md"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopConfig {
    pub max_iterations: u32,
    pub completion_token: String,
    /// Re-orientation period in iterations; 0 disables it
    pub reorient_every: u32,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            completion_token: DEFAULT_COMPLETION_TOKEN.to_string(),
            reorient_every: DEFAULT_REORIENT_EVERY,
        }
    }
}

impl LoopConfig {
    /// Initial state for a start request; explicit options override these defaults
    pub fn start_state(
        &self,
        task: impl Into<String>,
        max_iterations: Option<u32>,
        completion_token: Option<String>,
    ) -> LoopState {
        LoopState::new(
            task,
            max_iterations.unwrap_or(self.max_iterations),
            completion_token.unwrap_or_else(|| self.completion_token.clone()),
        )
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            state: StateConfig::default(),
            loop_defaults: LoopConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // An explicit path must load
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| StopLoopError::Config(format!("failed to read {}: {}", path.display(), e)))?;
        let config = Self::from_yaml(&content)
            .map_err(|e| StopLoopError::Config(format!("failed to parse {}: {}", path.display(), e)))?;

        log::info!("Loaded config from: {}", path.display());
        Ok(config)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Resolve the state record path against a project directory
    pub fn state_path(&self, project_dir: &Path) -> PathBuf {
        if self.state.path.is_absolute() {
            self.state.path.clone()
        } else {
            project_dir.join(&self.state.path)
        }
    }
}

/// Pick the project directory: explicit flag, then the host's env var, then cwd
pub fn resolve_project_dir(explicit: Option<&Path>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir.to_path_buf();
    }
    if let Some(dir) = std::env::var_os(PROJECT_DIR_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    PathBuf::from(".")
}
