//! Staged/active configuration slots.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::schema::ConfigRecord;
use crate::config::validation::validate_record;
use crate::directive::{register_builtin_directives, DirectiveRegistry};
use crate::error::{ConfError, ConfResult};
use crate::lifecycle::staged::{StagedConfig, StagingSlot};
use crate::modules::{ModuleLoader, StaticModuleLoader};
use crate::observability::diagnostics::{dump_record, DiagnosticSink, TracingSink};
use crate::observability::metrics;
use crate::process::{ProcessControl, SystemProcess};
use crate::rules::{RuleCompiler, SelectorCompiler};

/// External collaborators a load calls into.
#[derive(Clone)]
pub struct Collaborators {
    pub compiler: Arc<dyn RuleCompiler>,
    pub modules: Arc<dyn ModuleLoader>,
    pub process: Arc<dyn ProcessControl>,
    pub diagnostics: Arc<dyn DiagnosticSink>,
}

impl Collaborators {
    pub fn with_compiler(mut self, compiler: Arc<dyn RuleCompiler>) -> Self {
        self.compiler = compiler;
        self
    }

    pub fn with_modules(mut self, modules: Arc<dyn ModuleLoader>) -> Self {
        self.modules = modules;
        self
    }

    pub fn with_process(mut self, process: Arc<dyn ProcessControl>) -> Self {
        self.process = process;
        self
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = diagnostics;
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            compiler: Arc::new(SelectorCompiler::new()),
            modules: Arc::new(StaticModuleLoader::new()),
            process: Arc::new(SystemProcess),
            diagnostics: Arc::new(TracingSink),
        }
    }
}

impl fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collaborators").finish_non_exhaustive()
    }
}

/// A validated record ready to be activated. Immutable from here on.
#[derive(Debug, Clone)]
pub struct ActiveCandidate {
    load_id: Uuid,
    record: Arc<ConfigRecord>,
}

impl ActiveCandidate {
    pub fn load_id(&self) -> Uuid {
        self.load_id
    }

    pub fn record(&self) -> &Arc<ConfigRecord> {
        &self.record
    }
}

/// Owner of the process-wide staged and active configuration.
///
/// At most one load is staged at a time. The active record is swapped in
/// atomically; readers see either the previous or the new record.
///
/// The staging slot belongs to the manager, not to the process. A process
/// must own exactly one manager and share it (the binary keeps a single
/// `Arc<ConfigManager>`); a second manager has its own slot and its own
/// active record.
pub struct ConfigManager {
    registry: DirectiveRegistry,
    collaborators: Collaborators,
    loading: Arc<AtomicBool>,
    active: ArcSwapOption<ConfigRecord>,
}

impl ConfigManager {
    /// Create a manager with the built-in directives registered.
    pub fn new(collaborators: Collaborators) -> ConfResult<Self> {
        let registry = DirectiveRegistry::new();
        register_builtin_directives(&registry)?;
        Ok(Self {
            registry,
            collaborators,
            loading: Arc::new(AtomicBool::new(false)),
            active: ArcSwapOption::empty(),
        })
    }

    pub fn registry(&self) -> &DirectiveRegistry {
        &self.registry
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    /// Whether a load currently occupies the staging slot.
    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::Acquire)
    }

    /// Start a load with a fresh record carrying the built-in defaults.
    pub fn begin_load(&self) -> ConfResult<StagedConfig> {
        let slot = StagingSlot::claim(&self.loading).ok_or_else(|| {
            warn!("configuration load refused: another load is in progress");
            ConfError::AlreadyLoading
        })?;
        Ok(StagedConfig::new(
            self.registry.clone(),
            self.collaborators.clone(),
            slot,
        ))
    }

    /// Validate the staged record and turn it into an activation candidate.
    ///
    /// The staging slot is released whether or not validation passes.
    pub fn finalize_load(&self, staged: StagedConfig) -> ConfResult<ActiveCandidate> {
        let load_id = staged.load_id();
        let (record, _slot) = staged.into_record();
        validate_record(&record).map_err(ConfError::Validation)?;
        info!(
            load_id = %load_id,
            rulesets = record.rulesets.len(),
            actions = record.actions,
            "configuration finalized"
        );
        Ok(ActiveCandidate {
            load_id,
            record: Arc::new(record),
        })
    }

    /// Make `candidate` the active record. Returns the record it replaced.
    pub fn activate(&self, candidate: ActiveCandidate) -> Option<Arc<ConfigRecord>> {
        let previous = self.active.swap(Some(candidate.record));
        metrics::record_activation();
        info!(load_id = %candidate.load_id, "configuration activated");
        previous
    }

    /// The record currently governing the process.
    pub fn active(&self) -> Option<Arc<ConfigRecord>> {
        self.active.load_full()
    }

    /// Write the active record to the diagnostic sink.
    pub fn dump_active(&self) {
        if let Some(record) = self.active() {
            dump_record(&record, &self.registry, self.collaborators.diagnostics.as_ref());
        }
    }
}

impl fmt::Debug for ConfigManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigManager")
            .field("registry", &self.registry)
            .field("loading", &self.is_loading())
            .field("active", &self.active.load().is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::process::DryRunProcess;
    use std::thread;

    fn manager() -> ConfigManager {
        let collaborators = Collaborators::default().with_process(Arc::new(DryRunProcess::new()));
        ConfigManager::new(collaborators).unwrap()
    }

    #[test]
    fn test_second_begin_load_is_refused() {
        let manager = manager();
        let _staged = manager.begin_load().unwrap();

        let err = manager.begin_load().unwrap_err();
        assert!(matches!(err, ConfError::AlreadyLoading));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_slot_released_after_finalize_and_drop() {
        let manager = manager();

        let staged = manager.begin_load().unwrap();
        manager.finalize_load(staged).unwrap();
        assert!(!manager.is_loading());

        let staged = manager.begin_load().unwrap();
        drop(staged);
        assert!(!manager.is_loading());

        let mut staged = manager.begin_load().unwrap();
        staged.dispatch("mainmsgqueuelowwatermark", "9999").unwrap();
        assert!(matches!(manager.finalize_load(staged), Err(ConfError::Validation(_))));
        assert!(manager.begin_load().is_ok());
    }

    #[test]
    fn test_staging_slot_is_per_manager() {
        let first = manager();
        let second = manager();

        let _staged = first.begin_load().unwrap();
        assert!(matches!(first.begin_load(), Err(ConfError::AlreadyLoading)));
        assert!(!second.is_loading());
        assert!(second.begin_load().is_ok());
    }

    #[test]
    fn test_activate_swaps_records() {
        let manager = manager();
        assert!(manager.active().is_none());

        let first = manager.finalize_load(manager.begin_load().unwrap()).unwrap();
        assert!(manager.activate(first).is_none());

        let mut staged = manager.begin_load().unwrap();
        staged.dispatch("mainmsgqueuesize", "20000").unwrap();
        let second = manager.finalize_load(staged).unwrap();

        let previous = manager.activate(second).unwrap();
        assert_eq!(previous.main_queue.size, 10000);
        assert_eq!(manager.active().unwrap().main_queue.size, 20000);
    }

    #[test]
    fn test_readers_never_see_partial_records() {
        let manager = Arc::new(manager());

        let mut staged = manager.begin_load().unwrap();
        staged.dispatch("mainmsgqueuesize", "10000").unwrap();
        staged.dispatch("mainmsgqueueworkerthreads", "1").unwrap();
        manager.activate(manager.finalize_load(staged).unwrap());

        let reader = {
            let manager = Arc::clone(&manager);
            thread::spawn(move || {
                for _ in 0..10_000 {
                    let record = manager.active().expect("an active record");
                    let q = &record.main_queue;
                    // Both fields always come from the same load.
                    assert!(
                        (q.size == 10000 && q.worker_threads == 1)
                            || (q.size == 20000 && q.worker_threads == 4)
                    );
                }
            })
        };

        for i in 0..50 {
            let mut staged = manager.begin_load().unwrap();
            let (size, workers) = if i % 2 == 0 { ("20000", "4") } else { ("10000", "1") };
            staged.dispatch("mainmsgqueuesize", size).unwrap();
            staged.dispatch("mainmsgqueueworkerthreads", workers).unwrap();
            manager.activate(manager.finalize_load(staged).unwrap());
        }

        reader.join().unwrap();
    }
}
