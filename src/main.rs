use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::io;
use std::path::PathBuf;

mod cli;

use cli::Cli;
use cli::commands::Commands;
use stoploop::config::{Config, resolve_project_dir};
use stoploop::hook::StopHook;
use stoploop::prompt::PromptBuilder;
use stoploop::state::{LoopState, promise_marker};
use stoploop::store::{FileStateStore, StateStore};

fn setup_logging(default_level: &str) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stoploop")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("stoploop.log");

    // stdout belongs to the hook protocol, so logs only ever go to the file
    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

fn run_application(cli: &Cli, config: &Config) -> Result<()> {
    let project_dir = resolve_project_dir(cli.project_dir.as_deref());
    let store = FileStateStore::new(config.state_path(&project_dir));
    info!("Using state record {}", store.path().display());

    match &cli.command {
        Commands::Start {
            task,
            max_iterations,
            completion_token,
            force,
        } => {
            let state = config.loop_defaults.start_state(
                Commands::task_text(task),
                *max_iterations,
                completion_token.clone(),
            );
            handle_start_command(&store, &state, *force)
        }
        Commands::Hook => handle_hook_command(store, config),
        Commands::Status => handle_status_command(&store, cli.is_verbose()),
        Commands::Cancel => handle_cancel_command(&store),
    }
}

fn handle_start_command(store: &FileStateStore, state: &LoopState, force: bool) -> Result<()> {
    info!("Starting loop: max_iterations={}, force={}", state.max_iterations, force);
    store.create(state, force).context("Failed to start loop")?;

    println!("{} {}", "Loop started:".green(), store.path().display());
    println!("  Max iterations: {}", state.max_iterations);
    println!(
        "  To finish, the agent must output: {}",
        promise_marker(&state.completion_token).bold()
    );
    println!("  Cancel with: {}", "stoploop cancel".cyan());
    Ok(())
}

fn handle_hook_command(store: FileStateStore, config: &Config) -> Result<()> {
    let hook = StopHook::new(store, PromptBuilder::new(config.loop_defaults.reorient_every));
    let stdin = io::stdin();
    let stdout = io::stdout();
    hook.run(stdin.lock(), stdout.lock())
        .context("Stop hook failed; loop iteration bookkeeping may be stale")?;
    Ok(())
}

fn handle_status_command(store: &FileStateStore, verbose: bool) -> Result<()> {
    let Some(state) = store.read().context("Failed to read loop state")? else {
        println!("{}", "No active loop".yellow());
        return Ok(());
    };

    println!("{} {}", "Active loop:".green(), store.path().display());
    println!(
        "  Iteration: {}/{} ({} remaining)",
        state.iteration,
        state.max_iterations,
        state.remaining()
    );
    println!("  Completion marker: {}", state.marker());
    if let Some(started_at) = state.started_at {
        println!("  Started: {}", started_at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if state.task.is_empty() {
        println!("  Task: {}", "(missing)".red());
    } else if verbose {
        println!("  Task:\n{}", state.task);
    } else {
        let first_line = state.task.lines().next().unwrap_or_default();
        println!("  Task: {}", first_line);
    }
    Ok(())
}

fn handle_cancel_command(store: &FileStateStore) -> Result<()> {
    let existing = store.read().context("Failed to read loop state")?;
    store.delete().context("Failed to cancel loop")?;

    match existing {
        Some(state) => {
            info!("Canceled loop at iteration {}/{}", state.iteration, state.max_iterations);
            println!(
                "{} at iteration {}/{}",
                "Loop canceled".red(),
                state.iteration,
                state.max_iterations
            );
        }
        None => println!("{}", "No active loop".yellow()),
    }
    Ok(())
}

fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Load configuration
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    let level = if cli.is_verbose() {
        "debug"
    } else {
        config.log_level.as_deref().unwrap_or("info")
    };
    if let Err(e) = setup_logging(level) {
        if cli.command.requires_logging() {
            return Err(e.wrap_err("Failed to setup logging"));
        }
        eprintln!("stoploop: logging disabled: {:#}", e);
    }

    info!("Starting with config from: {:?}", cli.config);

    // Run the main application logic
    run_application(&cli, &config).context("Application failed")?;

    Ok(())
}
