//! The configuration currently being built.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, error};
use uuid::Uuid;

use crate::config::schema::ConfigRecord;
use crate::directive::DirectiveRegistry;
use crate::error::{ConfError, ConfResult};
use crate::lifecycle::Collaborators;
use crate::modules::ModuleLoader;
use crate::observability::metrics;
use crate::process::ProcessControl;
use crate::rules::{NameLineKind, RuleCompiler};
use crate::ruleset::RulesetContext;

/// Occupancy of the process-wide staging slot. Released on drop, so an
/// abandoned load frees the slot too.
#[derive(Debug)]
pub(crate) struct StagingSlot {
    loading: Arc<AtomicBool>,
}

impl StagingSlot {
    /// Claim the slot, or `None` if another load holds it.
    pub(crate) fn claim(loading: &Arc<AtomicBool>) -> Option<Self> {
        loading
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self {
                loading: Arc::clone(loading),
            })
    }
}

impl Drop for StagingSlot {
    fn drop(&mut self) {
        self.loading.store(false, Ordering::Release);
    }
}

/// A configuration under construction.
///
/// Directive handlers mutate it exclusively; nothing else in the process
/// observes it until it is finalized and activated.
pub struct StagedConfig {
    load_id: Uuid,
    record: ConfigRecord,
    rulesets: RulesetContext,
    registry: DirectiveRegistry,
    collaborators: Collaborators,
    includes: Vec<PathBuf>,
    errors: Vec<ConfError>,
    slot: StagingSlot,
}

impl std::fmt::Debug for StagedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagedConfig")
            .field("load_id", &self.load_id)
            .field("record", &self.record)
            .field("rulesets", &self.rulesets)
            .field("includes", &self.includes)
            .field("errors", &self.errors)
            .field("slot", &self.slot)
            .finish_non_exhaustive()
    }
}

impl StagedConfig {
    pub(crate) fn new(registry: DirectiveRegistry, collaborators: Collaborators, slot: StagingSlot) -> Self {
        let load_id = Uuid::new_v4();
        debug!(load_id = %load_id, "configuration load started");
        Self {
            load_id,
            record: ConfigRecord::new(),
            rulesets: RulesetContext::new(),
            registry,
            collaborators,
            includes: Vec::new(),
            errors: Vec::new(),
            slot,
        }
    }

    pub fn load_id(&self) -> Uuid {
        self.load_id
    }

    pub fn record(&self) -> &ConfigRecord {
        &self.record
    }

    pub fn record_mut(&mut self) -> &mut ConfigRecord {
        &mut self.record
    }

    pub fn registry(&self) -> &DirectiveRegistry {
        &self.registry
    }

    pub fn process(&self) -> &dyn ProcessControl {
        self.collaborators.process.as_ref()
    }

    pub fn modules(&self) -> &dyn ModuleLoader {
        self.collaborators.modules.as_ref()
    }

    pub fn compiler(&self) -> &dyn RuleCompiler {
        self.collaborators.compiler.as_ref()
    }

    /// Dispatch one directive. Errors are returned, not recorded.
    pub fn dispatch(&mut self, name: &str, raw: impl Into<String>) -> ConfResult<()> {
        let registry = self.registry.clone();
        registry.dispatch(self, name, raw.into())
    }

    /// Dispatch one directive, recording recoverable errors so the load can
    /// continue. Only fatal errors are returned.
    pub fn apply(&mut self, name: &str, raw: impl Into<String>) -> ConfResult<()> {
        match self.dispatch(name, raw) {
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                self.report(e);
                Ok(())
            }
            Ok(()) => Ok(()),
        }
    }

    /// Record a recoverable error against this load.
    pub fn report(&mut self, err: ConfError) {
        error!(load_id = %self.load_id, kind = err.kind(), "CONFIG ERROR: {err}");
        metrics::record_directive_error(err.kind());
        self.errors.push(err);
    }

    pub fn errors(&self) -> &[ConfError] {
        &self.errors
    }

    pub(crate) fn take_errors(&mut self) -> Vec<ConfError> {
        std::mem::take(&mut self.errors)
    }

    /// No recoverable errors so far.
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Compile a rule line into the current ruleset.
    pub fn add_rule(&mut self, line: &str) -> ConfResult<()> {
        let ruleset = self.rulesets.current_mut(&mut self.record.rulesets)?;
        let added = self.collaborators.compiler.compile_rule(ruleset, line)?;
        self.record.actions += added;
        Ok(())
    }

    /// Hand a definition line to the rule compiler.
    pub fn add_name_line(&mut self, kind: NameLineKind, line: &str) -> ConfResult<()> {
        self.collaborators
            .compiler
            .compile_name_line(&mut self.record, kind, line)
    }

    pub fn current_ruleset_name(&self) -> &str {
        self.rulesets.current_name()
    }

    /// Switch to `name`, creating the ruleset on first reference.
    pub fn set_current_ruleset(&mut self, name: &str) -> ConfResult<()> {
        self.rulesets.set_current(&mut self.record.rulesets, name)
    }

    /// Make an existing ruleset the default.
    pub fn set_default_ruleset(&mut self, name: &str) -> ConfResult<()> {
        self.rulesets.set_default(&mut self.record.rulesets, name)
    }

    /// Restore every tunable to its built-in default.
    pub fn reset_defaults(&mut self) {
        self.record.reset_defaults();
    }

    pub(crate) fn queue_include(&mut self, path: PathBuf) {
        self.includes.push(path);
    }

    pub(crate) fn take_includes(&mut self) -> Vec<PathBuf> {
        std::mem::take(&mut self.includes)
    }

    pub(crate) fn into_record(self) -> (ConfigRecord, StagingSlot) {
        (self.record, self.slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::ConfigManager;
    use crate::process::DryRunProcess;

    fn manager() -> ConfigManager {
        let collaborators = Collaborators::default().with_process(Arc::new(DryRunProcess::new()));
        ConfigManager::new(collaborators).unwrap()
    }

    #[test]
    fn test_apply_records_recoverable_errors() {
        let manager = manager();
        let mut staged = manager.begin_load().unwrap();

        staged.apply("nosuchdirective", "1").unwrap();
        staged.apply("mainmsgqueuesize", "many").unwrap();
        staged.apply("mainmsgqueuesize", "20000").unwrap();

        assert_eq!(staged.errors().len(), 2);
        assert!(matches!(staged.errors()[0], ConfError::UnknownDirective(_)));
        assert_eq!(staged.record().main_queue.size, 20000);
        assert!(!staged.is_clean());
    }

    #[test]
    fn test_rules_attach_to_current_ruleset() {
        let manager = manager();
        let mut staged = manager.begin_load().unwrap();

        staged.add_rule("*.info /var/log/messages").unwrap();
        staged.apply("ruleset", "remote").unwrap();
        staged.add_rule("*.* /var/log/remote").unwrap();
        staged.add_rule("kern.* /var/log/kern").unwrap();

        let record = staged.record();
        assert_eq!(record.actions, 3);
        assert_eq!(record.rulesets.default_ruleset().unwrap().rules().len(), 1);
        assert_eq!(record.rulesets.get("remote").unwrap().rules().len(), 2);
    }

    #[test]
    fn test_each_kind_writes_its_target() {
        let manager = manager();
        let mut staged = manager.begin_load().unwrap();

        staged.dispatch("RepeatedMsgReduction", "on").unwrap();
        staged.dispatch("MainMsgQueueHighWaterMark", "9000").unwrap();
        staged.dispatch("MainMsgQueueMaxDiskSpace", "2G").unwrap();
        staged.dispatch("MainMsgQueueDiscardSeverity", "warning").unwrap();
        staged.dispatch("PrivDropToUserID", "1000").unwrap();
        staged.dispatch("PrivDropToGroup", "1001").unwrap();
        staged.dispatch("MainMsgQueueFileName", "mainq extra").unwrap();
        staged.dispatch("umask", "0027").unwrap();
        staged.dispatch("sleep", "1").unwrap();

        let record = staged.record();
        assert!(record.globals.reduce_repeat_msgs);
        assert_eq!(record.main_queue.high_watermark, 9000);
        assert_eq!(record.main_queue.max_disk_space, 2 * 1024 * 1024 * 1024);
        assert_eq!(record.main_queue.discard_severity, 4);
        assert_eq!(record.globals.drop_priv_user, Some(1000));
        assert_eq!(record.globals.drop_priv_group, Some(1001));
        assert_eq!(record.main_queue.file_name.as_deref(), Some("mainq"));
        assert_eq!(record.globals.umask, Some(0o027));
    }

    #[test]
    fn test_group_id_directive_takes_numbers_only() {
        let manager = manager();
        let mut staged = manager.begin_load().unwrap();

        let err = staged.dispatch("PrivDropToGroupID", "root").unwrap_err();
        assert!(matches!(err, ConfError::TypeConversion { .. }));
        let err = staged.dispatch("PrivDropToGroupID", "-1").unwrap_err();
        assert!(matches!(err, ConfError::TypeConversion { .. }));
        assert_eq!(staged.record().globals.drop_priv_group, None);

        staged.dispatch("PrivDropToGroupID", "1001").unwrap();
        assert_eq!(staged.record().globals.drop_priv_group, Some(1001));
    }

    #[test]
    fn test_queue_type_variants() {
        use crate::config::schema::QueueType;

        let manager = manager();
        let mut staged = manager.begin_load().unwrap();

        for (literal, expected) in [
            ("FixedArray", QueueType::FixedArray),
            ("linkedlist", QueueType::LinkedList),
            ("DISK", QueueType::Disk),
            ("direct", QueueType::Direct),
        ] {
            staged.dispatch("mainmsgqueuetype", literal).unwrap();
            assert_eq!(staged.record().main_queue.queue_type, expected);
        }

        let err = staged.dispatch("mainmsgqueuetype", "ringbuffer").unwrap_err();
        assert!(matches!(err, ConfError::TypeConversion { .. }));
        assert_eq!(staged.record().main_queue.queue_type, QueueType::Direct);
    }

    #[test]
    fn test_reset_restores_queue_defaults() {
        use crate::config::schema::QueueTuning;

        let manager = manager();
        let mut staged = manager.begin_load().unwrap();

        staged.dispatch("mainmsgqueuesize", "500").unwrap();
        staged.dispatch("mainmsgqueuetype", "disk").unwrap();
        staged.dispatch("mainmsgqueuefilename", "q").unwrap();
        staged.dispatch("mainmsgqueuedequeuetimeend", "6").unwrap();
        staged.dispatch("resetconfigvariables", "").unwrap();
        staged.dispatch("resetconfigvariables", "").unwrap();

        assert_eq!(staged.record().main_queue, QueueTuning::default());
    }

    #[test]
    fn test_default_ruleset_must_exist() {
        let manager = manager();
        let mut staged = manager.begin_load().unwrap();

        let err = staged.dispatch("defaultruleset", "remote").unwrap_err();
        assert!(matches!(err, ConfError::NotFound { .. }));

        staged.dispatch("ruleset", "remote").unwrap();
        staged.dispatch("defaultruleset", "remote").unwrap();
        assert_eq!(staged.record().rulesets.default_name(), "remote");
    }
}
