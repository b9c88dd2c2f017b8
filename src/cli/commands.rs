//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - start: create a new loop record
//! - hook: answer one stop event from the host runtime
//! - status: show the active loop
//! - cancel: delete the active loop record

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// stoploop - keep an agent iterating on one task until it promises completion
#[derive(Parser, Debug)]
#[command(name = "stoploop")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Project directory holding the loop record (defaults to $CLAUDE_PROJECT_DIR, then cwd)
    #[arg(short = 'C', long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start a new loop for a task
    Start {
        /// Task description, passed back to the agent on every continuation
        #[arg(required = true, num_args = 1..)]
        task: Vec<String>,

        /// Maximum number of forced continuations
        #[arg(short, long)]
        max_iterations: Option<u32>,

        /// Token the agent must wrap in <promise></promise> when done
        #[arg(short = 't', long)]
        completion_token: Option<String>,

        /// Replace an already active loop instead of refusing
        #[arg(short, long)]
        force: bool,
    },

    /// Handle one stop event (JSON on stdin, decision on stdout)
    Hook,

    /// Show the active loop
    Status,

    /// Cancel the active loop
    Cancel,
}

impl Commands {
    /// Join the words of a start task into one description
    pub fn task_text(words: &[String]) -> String {
        words.join(" ")
    }

    /// Returns true if a logging setup failure should abort the command.
    ///
    /// The stop hook must still reach a decision without a log file.
    pub fn requires_logging(&self) -> bool {
        !matches!(self, Commands::Hook)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["stoploop"]).is_err());
    }

    #[test]
    fn test_start_defaults() {
        let cli = Cli::try_parse_from(["stoploop", "start", "fix", "bug", "X"]).unwrap();
        match cli.command {
            Commands::Start {
                task,
                max_iterations,
                completion_token,
                force,
            } => {
                assert_eq!(Commands::task_text(&task), "fix bug X");
                assert!(max_iterations.is_none());
                assert!(completion_token.is_none());
                assert!(!force);
            }
            _ => panic!("Expected start command"),
        }
    }

    #[test]
    fn test_start_with_options() {
        let cli = Cli::try_parse_from([
            "stoploop",
            "start",
            "--max-iterations",
            "3",
            "-t",
            "DONE",
            "--force",
            "fix bug X",
        ])
        .unwrap();
        match cli.command {
            Commands::Start {
                task,
                max_iterations,
                completion_token,
                force,
            } => {
                assert_eq!(task, vec!["fix bug X".to_string()]);
                assert_eq!(max_iterations, Some(3));
                assert_eq!(completion_token.as_deref(), Some("DONE"));
                assert!(force);
            }
            _ => panic!("Expected start command"),
        }
    }

    #[test]
    fn test_start_requires_task() {
        assert!(Cli::try_parse_from(["stoploop", "start"]).is_err());
    }

    #[test]
    fn test_start_rejects_non_numeric_cap() {
        assert!(Cli::try_parse_from(["stoploop", "start", "-m", "lots", "task"]).is_err());
    }

    #[test]
    fn test_hook_status_cancel() {
        let cli = Cli::try_parse_from(["stoploop", "hook"]).unwrap();
        assert!(matches!(cli.command, Commands::Hook));
        let cli = Cli::try_parse_from(["stoploop", "status"]).unwrap();
        assert!(matches!(cli.command, Commands::Status));
        let cli = Cli::try_parse_from(["stoploop", "cancel"]).unwrap();
        assert!(matches!(cli.command, Commands::Cancel));
    }

    #[test]
    fn test_only_hook_tolerates_missing_logging() {
        let cli = Cli::try_parse_from(["stoploop", "hook"]).unwrap();
        assert!(!cli.command.requires_logging());
        for args in [
            vec!["stoploop", "status"],
            vec!["stoploop", "cancel"],
            vec!["stoploop", "start", "task"],
        ] {
            let cli = Cli::try_parse_from(args).unwrap();
            assert!(cli.command.requires_logging());
        }
    }

    #[test]
    fn test_global_flags() {
        let cli = Cli::try_parse_from(["stoploop", "-v", "-c", "/etc/stoploop.yml", "-C", "/work", "hook"]).unwrap();
        assert!(cli.is_verbose());
        assert_eq!(cli.config, Some(PathBuf::from("/etc/stoploop.yml")));
        assert_eq!(cli.project_dir, Some(PathBuf::from("/work")));
    }

    #[test]
    fn test_help_works() {
        Cli::command().debug_assert();
    }
}
