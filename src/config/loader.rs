//! Run a directive source through a load.
//!
//! # Data Flow
//! ```text
//! file ─read─▶ parse_statements ─┬─ $Directive ──▶ registry dispatch
//!   │                            │      └─ $IncludeConfig ─▶ expanded in place
//!   │                            └─ rule line ───▶ rule compiler (current ruleset)
//!   │
//!   └─ unreadable ─▶ hard failure
//!
//! end of source: hard failure or zero actions ─▶ fallback
//!              ─▶ validate ─(invalid)─▶ report, default queue tuning
//!              ─▶ finalize ─▶ LoadOutcome
//! ```
//!
//! Every configuration problem is reported against the load and the load
//! still yields a record that can start the process. Only structural
//! errors (another load in progress) are returned as `Err`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, debug_span, info, warn};
use uuid::Uuid;

use crate::config::schema::QueueTuning;
use crate::config::validation::validate_record;
use crate::error::{ConfError, ConfResult};
use crate::lifecycle::{build_fallback, ActiveCandidate, ConfigManager, FallbackReport, StagedConfig};
use crate::observability::metrics;
use crate::source::{parse_statements, Statement};

/// How deep `$IncludeConfig` may nest.
pub const MAX_INCLUDE_DEPTH: usize = 16;

/// Extension of files picked up from an included directory.
const INCLUDE_EXTENSION: &str = "conf";

/// What happened during a load.
#[derive(Debug)]
pub struct LoadReport {
    pub load_id: Uuid,
    /// Recoverable errors, in the order they occurred.
    pub errors: Vec<ConfError>,
    /// Set when the emergency configuration was built.
    pub fallback: Option<FallbackReport>,
}

impl LoadReport {
    /// No recoverable errors were reported.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn error_messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// A finished load: the candidate to activate plus its report.
#[derive(Debug)]
pub struct LoadOutcome {
    pub candidate: ActiveCandidate,
    pub report: LoadReport,
}

impl LoadOutcome {
    /// The record sets `$AbortOnUncleanConfig` and the load was not clean,
    /// so it must not be activated.
    pub fn refused_by_policy(&self) -> bool {
        !self.report.is_clean() && self.candidate.record().globals.abort_on_unclean_config
    }
}

/// Load the directive file at `path`.
///
/// A root file that cannot be read counts as a hard parse failure and
/// yields the emergency configuration.
pub fn load_config(manager: &ConfigManager, path: &Path) -> ConfResult<LoadOutcome> {
    let mut staged = manager.begin_load()?;
    info!(load_id = %staged.load_id(), path = %path.display(), "loading configuration");

    let hard_failure = match fs::read_to_string(path) {
        Ok(text) => {
            run_source(&mut staged, &text, path, 0)?;
            false
        }
        Err(source) => {
            staged.report(ConfError::Io {
                path: path.to_path_buf(),
                source,
            });
            true
        }
    };

    finish(manager, staged, hard_failure)
}

/// Load directives from an in-memory source. Relative includes resolve
/// against the working directory.
pub fn load_from_str(manager: &ConfigManager, text: &str) -> ConfResult<LoadOutcome> {
    let mut staged = manager.begin_load()?;
    run_source(&mut staged, text, Path::new("<memory>"), 0)?;
    finish(manager, staged, false)
}

fn run_source(staged: &mut StagedConfig, text: &str, origin: &Path, depth: usize) -> ConfResult<()> {
    let origin_name = origin.display().to_string();

    for statement in parse_statements(text, &origin_name) {
        let statement = match statement {
            Ok(statement) => statement,
            Err(e) => {
                staged.report(e);
                continue;
            }
        };

        match statement {
            Statement::Directive { name, value, line } => {
                let span = debug_span!("directive", origin = %origin_name, line);
                let _entered = span.enter();
                staged.apply(&name, value)?;

                for include in staged.take_includes() {
                    let include = resolve(origin, include);
                    run_include(staged, &include, depth + 1)?;
                }
            }
            Statement::Rule { text, line } => {
                let span = debug_span!("rule", origin = %origin_name, line);
                let _entered = span.enter();
                if let Err(e) = staged.add_rule(&text) {
                    if e.is_fatal() {
                        return Err(e);
                    }
                    staged.report(e);
                }
            }
        }
    }
    Ok(())
}

/// Relative include paths are taken relative to the including file.
fn resolve(origin: &Path, include: PathBuf) -> PathBuf {
    if include.is_absolute() {
        return include;
    }
    match origin.parent() {
        Some(dir) if origin.is_file() => dir.join(include),
        _ => include,
    }
}

fn run_include(staged: &mut StagedConfig, path: &Path, depth: usize) -> ConfResult<()> {
    if depth > MAX_INCLUDE_DEPTH {
        staged.report(ConfError::handler(
            "includeconfig",
            format!("'{}' exceeds the include depth of {MAX_INCLUDE_DEPTH}", path.display()),
        ));
        return Ok(());
    }

    if path.is_dir() {
        let files = match included_files(path) {
            Ok(files) => files,
            Err(source) => {
                staged.report(ConfError::Io {
                    path: path.to_path_buf(),
                    source,
                });
                return Ok(());
            }
        };
        debug!(dir = %path.display(), files = files.len(), "including directory");
        for file in files {
            run_include_file(staged, &file, depth)?;
        }
        return Ok(());
    }

    run_include_file(staged, path, depth)
}

fn run_include_file(staged: &mut StagedConfig, path: &Path, depth: usize) -> ConfResult<()> {
    match fs::read_to_string(path) {
        Ok(text) => {
            debug!(path = %path.display(), depth, "including file");
            run_source(staged, &text, path, depth)
        }
        Err(source) => {
            staged.report(ConfError::Io {
                path: path.to_path_buf(),
                source,
            });
            Ok(())
        }
    }
}

/// `*.conf` files of `dir`, sorted by name.
fn included_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == INCLUDE_EXTENSION) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn finish(manager: &ConfigManager, mut staged: StagedConfig, hard_failure: bool) -> ConfResult<LoadOutcome> {
    let fallback = if hard_failure || staged.record().actions == 0 {
        if !hard_failure {
            staged.report(ConfError::NoActions);
        }
        let tty = manager.collaborators().process.controlling_terminal();
        Some(build_fallback(&mut staged, tty.as_deref()))
    } else {
        None
    };

    if let Err(errors) = validate_record(staged.record()) {
        staged.report(ConfError::Validation(errors));
        warn!(load_id = %staged.load_id(), "main queue tuning rejected, using built-in defaults");
        staged.record_mut().main_queue = QueueTuning::default();
    }

    let report = LoadReport {
        load_id: staged.load_id(),
        errors: staged.take_errors(),
        fallback,
    };

    let candidate = match manager.finalize_load(staged) {
        Ok(candidate) => candidate,
        Err(e) => {
            metrics::record_load("failed");
            return Err(e);
        }
    };

    let outcome = match (&report.fallback, report.is_clean()) {
        (Some(_), _) => "fallback",
        (None, true) => "clean",
        (None, false) => "unclean",
    };
    metrics::record_load(outcome);
    info!(
        load_id = %report.load_id,
        outcome,
        errors = report.errors.len(),
        "configuration load complete"
    );

    Ok(LoadOutcome { candidate, report })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::config::schema::QueueType;
    use crate::lifecycle::Collaborators;
    use crate::process::DryRunProcess;

    fn manager() -> ConfigManager {
        let collaborators = Collaborators::default().with_process(Arc::new(DryRunProcess::new()));
        ConfigManager::new(collaborators).unwrap()
    }

    #[test]
    fn test_errors_do_not_stop_the_load() {
        let manager = manager();
        let outcome = load_from_str(
            &manager,
            "$MainMsgQueueSize lots\n$\n$NoSuchThing 1\n*.info /var/log/messages\n",
        )
        .unwrap();

        assert_eq!(outcome.report.errors.len(), 3);
        assert!(outcome.report.fallback.is_none());
        assert_eq!(outcome.candidate.record().actions, 1);
        assert!(!manager.is_loading());
    }

    #[test]
    fn test_bad_rule_is_reported() {
        let manager = manager();
        let outcome = load_from_str(&manager, "nonsense\n*.* /var/log/all\n").unwrap();

        assert_eq!(outcome.report.errors.len(), 1);
        assert_eq!(outcome.candidate.record().actions, 1);
    }

    #[test]
    fn test_include_depth_is_limited() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("self.conf");
        fs::write(&path, "$IncludeConfig self.conf\n").unwrap();

        let manager = manager();
        let outcome = load_config(&manager, &path).unwrap();

        assert_eq!(outcome.report.errors.len(), 2);
        assert!(matches!(outcome.report.errors[0], ConfError::Handler { .. }));
        assert!(matches!(outcome.report.errors[1], ConfError::NoActions));
        assert!(outcome.report.fallback.is_some());
    }

    #[test]
    fn test_zero_actions_is_unclean() {
        let manager = manager();
        let outcome = load_from_str(&manager, "$AbortOnUncleanConfig on\n").unwrap();

        assert!(!outcome.report.is_clean());
        assert!(matches!(outcome.report.errors[..], [ConfError::NoActions]));
        assert!(outcome.report.fallback.is_some());
        assert!(outcome.refused_by_policy());
    }

    #[test]
    fn test_policy_needs_the_flag() {
        let manager = manager();
        let outcome = load_from_str(&manager, "# nothing\n").unwrap();
        assert!(!outcome.report.is_clean());
        assert!(!outcome.refused_by_policy());

        let outcome = load_from_str(&manager, "$AbortOnUncleanConfig on\n*.* /dev/null\n").unwrap();
        assert!(outcome.report.is_clean());
        assert!(!outcome.refused_by_policy());
    }

    #[test]
    fn test_invalid_queue_tuning_is_reported_and_replaced() {
        let manager = manager();
        let outcome = load_from_str(
            &manager,
            "$MainMsgQueueHighWaterMark 20000\n$RepeatedMsgReduction on\n*.* /dev/null\n",
        )
        .unwrap();

        assert!(matches!(outcome.report.errors[..], [ConfError::Validation(_)]));
        let record = outcome.candidate.record();
        assert_eq!(record.main_queue, QueueTuning::default());
        assert!(record.globals.reduce_repeat_msgs);
        assert_eq!(record.actions, 1);
        assert!(!manager.is_loading());
    }

    #[test]
    fn test_invalid_record_without_actions_still_starts() {
        let manager = manager();
        let outcome = load_from_str(&manager, "$MainMsgQueueType disk\n").unwrap();

        assert_eq!(outcome.report.errors.len(), 2);
        assert!(matches!(outcome.report.errors[0], ConfError::NoActions));
        assert!(matches!(outcome.report.errors[1], ConfError::Validation(_)));
        assert!(outcome.report.fallback.is_some());

        manager.activate(outcome.candidate);
        let active = manager.active().unwrap();
        assert_eq!(active.main_queue.queue_type, QueueType::FixedArray);
        assert!(active.actions >= 4);
    }
}
