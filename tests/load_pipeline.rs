//! End-to-end tests of the load → finalize → activate pipeline.

use std::sync::Arc;

use confstage::config::schema::{QueueTuning, QueueType};
use confstage::config::validation::ValidationError;
use confstage::config::{load_config, load_from_str};
use confstage::directive::{Handler, Scope};
use confstage::error::ConfError;
use confstage::lifecycle::{fallback_rules, Collaborators};
use confstage::modules::StaticModuleLoader;
use confstage::ruleset::DEFAULT_RULESET_NAME;
use confstage::{ConfResult, ConfigManager, DirectiveRegistry};

mod common;

const BASIC: &str = "\
# a small but complete configuration
$RepeatedMsgReduction on
$MainMsgQueueType LinkedList
$MainMsgQueueSize 50k
$MainMsgQueueHighWaterMark 40000
$MainMsgQueueLowWaterMark 10000
$MainMsgQueueDiscardMark 45000
$MainMsgQueueDiscardSeverity notice
$PrivDropToUser syslog
$PrivDropToGroup adm

*.info;mail.none    /var/log/messages
mail.*              /var/log/maillog
";

#[test]
fn test_configuration_with_actions_needs_no_fallback() {
    let manager = common::manager_with_tty(Some("/dev/pts/0"));
    let outcome = load_from_str(&manager, BASIC).unwrap();

    assert!(outcome.report.is_clean(), "{:?}", outcome.report.errors);
    assert!(outcome.report.fallback.is_none());

    let record = outcome.candidate.record();
    assert_eq!(record.actions, 2);
    assert!(record.globals.reduce_repeat_msgs);
    assert_eq!(record.globals.drop_priv_user, Some(104));
    assert_eq!(record.globals.drop_priv_group, Some(4));
    assert_eq!(record.main_queue.queue_type, QueueType::LinkedList);
    assert_eq!(record.main_queue.size, 50_000);
    assert_eq!(record.main_queue.discard_severity, 5);
}

#[test]
fn test_zero_actions_yield_five_fallback_rules() {
    let manager = common::manager_with_tty(Some("/dev/pts/7"));
    let outcome = load_from_str(&manager, "$MainMsgQueueSize 20000\n").unwrap();

    assert!(matches!(outcome.report.errors[..], [ConfError::NoActions]));
    let fallback = outcome.report.fallback.expect("fallback built");
    assert_eq!(fallback.injected, 5);

    let record = outcome.candidate.record();
    let rules = record.rulesets.get(DEFAULT_RULESET_NAME).unwrap().rules();
    let lines: Vec<String> = rules
        .iter()
        .map(|r| format!("{}\t{}", r.selector, r.action))
        .collect();
    assert_eq!(lines, fallback_rules(Some("/dev/pts/7")));
    assert_eq!(record.actions, 5);
    // Settings parsed before the fallback are kept.
    assert_eq!(record.main_queue.size, 20000);
}

#[test]
fn test_fallback_without_terminal() {
    let manager = common::manager_with_tty(None);
    let outcome = load_from_str(&manager, "# nothing\n").unwrap();

    assert_eq!(outcome.report.fallback.unwrap().injected, 4);
    assert_eq!(outcome.candidate.record().actions, 4);
}

#[test]
fn test_unreadable_file_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let manager = common::manager_with_tty(None);

    let outcome = load_config(&manager, &dir.path().join("missing.conf")).unwrap();

    assert!(!outcome.report.is_clean());
    assert!(matches!(outcome.report.errors[0], ConfError::Io { .. }));
    assert_eq!(outcome.report.fallback.unwrap().injected, 4);

    manager.activate(outcome.candidate);
    assert_eq!(manager.active().unwrap().actions, 4);
}

#[test]
fn test_includes_expand_in_place() {
    let dir = tempfile::tempdir().unwrap();
    common::write_config(dir.path(), "rsyslog.d/20-remote.conf", "$Ruleset remote\n*.* /var/log/remote\n");
    common::write_config(dir.path(), "rsyslog.d/10-queue.conf", "$MainMsgQueueSize 30000\n");
    common::write_config(dir.path(), "rsyslog.d/ignored.txt", "$MainMsgQueueSize 1\n");
    let root = common::write_config(
        dir.path(),
        "rsyslog.conf",
        "$MainMsgQueueSize 15000\n$IncludeConfig rsyslog.d\nkern.* /var/log/kern\n",
    );

    let manager = common::manager_with_tty(None);
    let outcome = load_config(&manager, &root).unwrap();
    assert!(outcome.report.is_clean(), "{:?}", outcome.report.errors);

    let record = outcome.candidate.record();
    assert_eq!(record.main_queue.size, 30000);
    // The include switched the current ruleset; the rule after it follows.
    assert_eq!(record.rulesets.get("remote").unwrap().rules().len(), 2);
    assert!(record.rulesets.default_ruleset().unwrap().rules().is_empty());
}

#[test]
fn test_missing_include_is_recoverable() {
    let dir = tempfile::tempdir().unwrap();
    let root = common::write_config(
        dir.path(),
        "rsyslog.conf",
        "$IncludeConfig /nonexistent/confstage/extra.conf\n*.* /var/log/all\n",
    );

    let manager = common::manager_with_tty(None);
    let outcome = load_config(&manager, &root).unwrap();

    assert_eq!(outcome.report.errors.len(), 1);
    assert!(outcome.report.fallback.is_none());
}

#[test]
fn test_begin_load_twice_is_refused() {
    let manager = common::manager_with_tty(None);
    let _staged = manager.begin_load().unwrap();

    assert!(matches!(manager.begin_load(), Err(ConfError::AlreadyLoading)));
    assert!(matches!(load_from_str(&manager, BASIC), Err(ConfError::AlreadyLoading)));
}

#[test]
fn test_disk_queue_without_file_falls_back_to_default_queue() {
    let manager = common::manager_with_tty(None);
    let outcome = load_from_str(&manager, "$MainMsgQueueType disk\n*.* /var/log/all\n").unwrap();

    match &outcome.report.errors[..] {
        [ConfError::Validation(errors)] => assert_eq!(errors, &vec![ValidationError::MissingQueueFile]),
        other => panic!("unexpected errors: {other:?}"),
    }
    assert!(outcome.report.fallback.is_none());
    assert_eq!(outcome.candidate.record().main_queue, QueueTuning::default());
    assert_eq!(outcome.candidate.record().actions, 1);

    manager.activate(outcome.candidate);
    assert_eq!(manager.active().unwrap().main_queue.queue_type, QueueType::FixedArray);
}

#[test]
fn test_invalid_queue_without_rules_still_yields_a_startable_record() {
    let manager = common::manager_with_tty(Some("/dev/tty1"));
    let outcome = load_from_str(&manager, "$MainMsgQueueType disk\n").unwrap();

    assert!(!outcome.report.is_clean());
    assert!(outcome.report.fallback.is_some());
    assert!(!outcome.refused_by_policy());

    manager.activate(outcome.candidate);
    let active = manager.active().unwrap();
    assert_eq!(active.actions, fallback_rules(Some("/dev/tty1")).len());
    assert_eq!(active.main_queue, QueueTuning::default());
}

#[test]
fn test_zero_actions_is_refused_under_abort_on_unclean() {
    let manager = common::manager_with_tty(None);
    let outcome = load_from_str(&manager, "$AbortOnUncleanConfig on\n$RepeatedMsgReduction on\n").unwrap();

    assert!(!outcome.report.is_clean());
    assert!(matches!(outcome.report.errors[..], [ConfError::NoActions]));
    assert!(outcome.report.fallback.is_some());
    assert!(outcome.refused_by_policy());
}

#[test]
fn test_reset_reproduces_queue_defaults() {
    let manager = common::manager_with_tty(None);
    let outcome = load_from_str(
        &manager,
        "$MainMsgQueueSize 99\n$MainMsgQueueType direct\n$MainMsgQueueDequeueTimeBegin 3\n\
         $ResetConfigVariables\n*.* /var/log/all\n",
    )
    .unwrap();

    assert_eq!(outcome.candidate.record().main_queue, QueueTuning::default());
}

#[test]
fn test_apply_now_effects_survive_a_failed_load() {
    let process = Arc::new(common::FakeProcess::new(None));
    let collaborators = Collaborators::default().with_process(process.clone());
    let manager = ConfigManager::new(collaborators).unwrap();

    let outcome = load_from_str(&manager, "$umask 0077\n$MainMsgQueueLowWaterMark 9000\n*.* /dev/null\n").unwrap();
    assert!(matches!(outcome.report.errors[..], [ConfError::Validation(_)]));
    assert_eq!(outcome.candidate.record().main_queue.low_watermark, QueueTuning::default().low_watermark);
    assert_eq!(process.umask(), 0o077);
}

fn register_imdemo(registry: &DirectiveRegistry) -> ConfResult<()> {
    registry.register(
        "demomarker",
        Scope::Global,
        Handler::custom(|staged, value| {
            staged.record_mut().templates.push(format!("demo:{value}"));
            Ok(())
        }),
        false,
    )
}

#[test]
fn test_module_directives_usable_after_modload() {
    let modules = Arc::new(StaticModuleLoader::new().with_module("imdemo", register_imdemo));
    let collaborators = Collaborators::default()
        .with_process(Arc::new(common::FakeProcess::new(None)))
        .with_modules(modules);
    let manager = ConfigManager::new(collaborators).unwrap();

    let outcome = load_from_str(
        &manager,
        "$DemoMarker early\n$ModDir /opt/mods\n$ModLoad imdemo\n$DemoMarker late\n*.* /dev/null\n",
    )
    .unwrap();

    assert_eq!(outcome.report.errors.len(), 1);
    assert!(matches!(outcome.report.errors[0], ConfError::UnknownDirective(_)));
    let record = outcome.candidate.record();
    assert_eq!(record.templates, vec!["demo:late".to_string()]);
    assert_eq!(record.globals.modules, vec!["imdemo".to_string()]);
    assert_eq!(record.globals.module_dir.as_deref(), Some("/opt/mods"));
}

#[test]
fn test_reload_replaces_active_record() {
    let manager = common::manager_with_tty(None);

    let first = load_from_str(&manager, BASIC).unwrap();
    manager.activate(first.candidate);
    let held = manager.active().unwrap();

    let second = load_from_str(&manager, "$MainMsgQueueSize 12345\n*.* /dev/null\n").unwrap();
    manager.activate(second.candidate);

    assert_eq!(held.main_queue.size, 50_000);
    assert_eq!(manager.active().unwrap().main_queue.size, 12345);
}
