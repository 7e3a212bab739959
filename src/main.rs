//! confstage: compile, check and serve a legacy directive configuration.
//!
//! # Architecture Overview
//!
//! ```text
//!   directive file ──▶ source parser ──▶ directive registry ──▶ staged record
//!                                             │                      │
//!                                      module loader          rule compiler
//!                                      process control               │
//!                                                                    ▼
//!   SIGHUP / file change ──▶ new load ──▶ validate ──▶ activate (atomic swap)
//!                                            │
//!                            nothing usable ─┴─▶ emergency fallback
//! ```

use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{error, info};

use confstage::config::watcher::ConfigWatcher;
use confstage::config::{load_config, load_settings, EngineSettings, LoadOutcome};
use confstage::lifecycle::{Collaborators, ConfigManager, SignalEvent, Signals};
use confstage::observability::diagnostics::{dump_record, CollectingSink};
use confstage::observability::logging::init_logging;
use confstage::process::DryRunProcess;

#[derive(Parser)]
#[command(name = "confstage", version)]
#[command(about = "Compile and activate legacy syslog directive configurations", long_about = None)]
struct Cli {
    /// Engine settings file (TOML).
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Load a file without touching the process and print the result
    Check {
        file: PathBuf,
        /// Print the report and record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Load, activate and reload on SIGHUP
    Run {
        file: Option<PathBuf>,
        /// Also reload when the file changes
        #[arg(long)]
        watch: bool,
    },
    /// List the registered directives
    Directives,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();

    let settings = match &cli.settings {
        Some(path) => load_settings(path)?,
        None => EngineSettings::default(),
    };
    init_logging(cli.log_level.as_deref().unwrap_or(&settings.log_level));

    match cli.command {
        Command::Check { file, json } => check(&file, json),
        Command::Run { file, watch } => {
            let file = file.unwrap_or_else(|| settings.config_file.clone());
            run(&file, watch || settings.watch, &settings).await
        }
        Command::Directives => {
            let manager = ConfigManager::new(Collaborators::default())?;
            for entry in manager.registry().entries() {
                println!(
                    "${:<40} {:<16} {}{}",
                    entry.name(),
                    entry.kind(),
                    entry.scope(),
                    if entry.once_only() { " once-only" } else { "" }
                );
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn check(file: &Path, as_json: bool) -> Result<ExitCode, Box<dyn Error>> {
    let collaborators = Collaborators::default().with_process(Arc::new(DryRunProcess::new()));
    let manager = ConfigManager::new(collaborators)?;

    let outcome = match load_config(&manager, file) {
        Ok(outcome) => outcome,
        Err(e) => {
            eprintln!("{e}");
            return Ok(ExitCode::from(2));
        }
    };
    let LoadOutcome { candidate, report } = outcome;

    if as_json {
        let doc = json!({
            "load_id": report.load_id,
            "clean": report.is_clean(),
            "errors": report.error_messages(),
            "fallback": report.fallback,
            "record": candidate.record().as_ref(),
        });
        println!("{}", serde_json::to_string_pretty(&doc)?);
    } else {
        for message in report.error_messages() {
            println!("error: {message}");
        }
        if let Some(fallback) = &report.fallback {
            println!(
                "emergency configuration: {} rule(s) injected, {} rejected",
                fallback.injected, fallback.failed
            );
        }
        let sink = CollectingSink::new();
        dump_record(candidate.record(), manager.registry(), &sink);
        for line in sink.lines() {
            println!("{line}");
        }
    }

    Ok(if report.is_clean() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

/// Activate a finished load unless the record itself asks to refuse
/// unclean configurations.
fn activate(manager: &ConfigManager, outcome: LoadOutcome, dump: bool) -> bool {
    if outcome.refused_by_policy() {
        error!(
            load_id = %outcome.report.load_id,
            errors = outcome.report.errors.len(),
            "configuration has errors and $AbortOnUncleanConfig is on, not activating"
        );
        return false;
    }
    manager.activate(outcome.candidate);
    if dump {
        manager.dump_active();
    }
    true
}

async fn reload(manager: &Arc<ConfigManager>, file: &Path) -> Result<LoadOutcome, Box<dyn Error>> {
    let manager = Arc::clone(manager);
    let file = file.to_path_buf();
    let outcome = tokio::task::spawn_blocking(move || load_config(&manager, &file)).await??;
    Ok(outcome)
}

async fn next_update(updates: &mut Option<mpsc::UnboundedReceiver<LoadOutcome>>) -> Option<LoadOutcome> {
    match updates {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn run(file: &Path, watch: bool, settings: &EngineSettings) -> Result<ExitCode, Box<dyn Error>> {
    let manager = Arc::new(ConfigManager::new(Collaborators::default())?);
    info!(file = %file.display(), watch, "confstage v{} starting", env!("CARGO_PKG_VERSION"));

    let outcome = reload(&manager, file).await?;
    if !activate(&manager, outcome, settings.dump_on_activate) {
        return Ok(ExitCode::FAILURE);
    }

    let mut signals = Signals::new()?;
    let (_watcher, mut updates) = if watch {
        let (watcher, rx) = ConfigWatcher::new(file, Arc::clone(&manager));
        let handle = watcher
            .with_poll_interval(Duration::from_secs(settings.watch_poll_secs))
            .run()?;
        (Some(handle), Some(rx))
    } else {
        (None, None)
    };

    loop {
        tokio::select! {
            event = signals.next() => match event {
                SignalEvent::Reload => match reload(&manager, file).await {
                    Ok(outcome) => {
                        activate(&manager, outcome, settings.dump_on_activate);
                    }
                    Err(e) => error!(error = %e, "reload failed, keeping current configuration"),
                },
                SignalEvent::Shutdown => break,
            },
            Some(outcome) = next_update(&mut updates) => {
                activate(&manager, outcome, settings.dump_on_activate);
            }
        }
    }

    info!("shutdown complete");
    Ok(ExitCode::SUCCESS)
}
