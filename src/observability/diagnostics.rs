//! Human-readable dumps of a configuration record.

use std::sync::{Mutex, PoisonError};

use crate::config::schema::ConfigRecord;
use crate::directive::DirectiveRegistry;

/// Receives dump lines. Write-only.
pub trait DiagnosticSink: Send + Sync {
    fn emit(&self, line: &str);
}

/// Emits each line as a debug event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, line: &str) {
        tracing::debug!(target: "confstage::dump", "{line}");
    }
}

/// Keeps lines in memory, e.g. for printing after a `check` run.
#[derive(Debug, Default)]
pub struct CollectingSink {
    lines: Mutex<Vec<String>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}

fn flag(value: bool) -> u8 {
    u8::from(value)
}

/// Dump globals, rulesets, queue tuning and, if the record asks for them,
/// the template, module and directive lists.
pub fn dump_record(record: &ConfigRecord, registry: &DirectiveRegistry, sink: &dyn DiagnosticSink) {
    let g = &record.globals;
    sink.emit("Global Settings:");
    sink.emit(&format!("  debug print template list .........: {}", flag(g.debug_print_template_list)));
    sink.emit(&format!("  debug print module list ...........: {}", flag(g.debug_print_module_list)));
    sink.emit(&format!("  debug print directive list ........: {}", flag(g.debug_print_handler_list)));
    sink.emit(&format!("  log status messages ...............: {}", flag(g.log_status_msgs)));
    sink.emit(&format!("  error messages to stderr ..........: {}", flag(g.err_msg_to_stderr)));
    sink.emit(&format!("  abort on unclean config ...........: {}", flag(g.abort_on_unclean_config)));
    sink.emit(&format!("  repeated message reduction ........: {}", flag(g.reduce_repeat_msgs)));
    if let Some(uid) = g.drop_priv_user {
        sink.emit(&format!("  drop privileges to uid ............: {uid}"));
    }
    if let Some(gid) = g.drop_priv_group {
        sink.emit(&format!("  drop privileges to gid ............: {gid}"));
    }
    if let Some(path) = &g.config_graph_file {
        sink.emit(&format!("  config graph file .................: {path}"));
    }

    sink.emit(&format!(
        "Rulesets ({}, default '{}'):",
        record.rulesets.len(),
        record.rulesets.default_name()
    ));
    for ruleset in record.rulesets.iter() {
        sink.emit(&format!("  ruleset '{}': {} rule(s)", ruleset.name(), ruleset.rules().len()));
        for rule in ruleset.rules() {
            sink.emit(&format!("    {:<24} {}", rule.selector, rule.action));
        }
    }

    if g.debug_print_template_list {
        sink.emit(&format!("Templates ({}):", record.templates.len()));
        for template in &record.templates {
            sink.emit(&format!("  {template}"));
        }
    }
    if g.debug_print_module_list {
        sink.emit(&format!("Modules ({}):", g.modules.len()));
        for module in &g.modules {
            sink.emit(&format!("  {module}"));
        }
    }
    if g.debug_print_handler_list {
        sink.emit(&format!("Directives ({}):", registry.len()));
        for entry in registry.entries() {
            sink.emit(&format!(
                "  ${:<40} {:<16} {}{}",
                entry.name(),
                entry.kind(),
                entry.scope(),
                if entry.once_only() { " once-only" } else { "" }
            ));
        }
    }

    let q = &record.main_queue;
    sink.emit(&format!("Main queue size {} messages, type {}.", q.size, q.queue_type));
    sink.emit(&format!(
        "Main queue worker threads: {}, wThread shutdown: {}, persists every {} updates.",
        q.worker_threads, q.timeout_worker_shutdown, q.checkpoint_interval
    ));
    sink.emit(&format!(
        "Main queue timeouts: shutdown: {}, action completion shutdown: {}, enq: {}",
        q.timeout_shutdown, q.timeout_action_completion, q.timeout_enqueue
    ));
    sink.emit(&format!(
        "Main queue watermarks: high: {}, low: {}, discard: {}, discard-severity: {}",
        q.high_watermark, q.low_watermark, q.discard_mark, q.discard_severity
    ));
    sink.emit(&format!(
        "Main queue save on shutdown {}, max disk space allowed {}",
        flag(q.save_on_shutdown),
        q.max_disk_space
    ));
    sink.emit(&format!(
        "Main queue dequeue batch size {}, window {}-{}",
        q.dequeue_batch_size, q.dequeue_time_begin, q.dequeue_time_end
    ));
    if let Some(file) = &q.file_name {
        sink.emit(&format!("Main queue file name '{file}', max file size {}", q.max_file_size));
    }
    sink.emit(&format!("Output actions configured: {}", record.actions));
}
