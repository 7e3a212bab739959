//! Configuration record definitions.
//!
//! This module defines the in-memory configuration record a load produces
//! and the tuning schema of the main message queue. All types derive
//! `Serialize` so an active record can be dumped as JSON.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ruleset::RulesetCollection;

/// Default value of the status-message flag.
pub const DEFAULT_LOG_STATUS_MSGS: bool = true;

/// Discard severity meaning "never discard by severity".
pub const DISCARD_SEVERITY_NONE: u8 = 8;

/// Dequeue window end hour that disables the window.
pub const DEQUEUE_WINDOW_DISABLED: i64 = 25;

/// Root configuration record.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigRecord {
    /// Process-wide settings.
    pub globals: Globals,

    /// Main message queue tuning.
    pub main_queue: QueueTuning,

    /// Named rule groups, default entry always present.
    pub rulesets: RulesetCollection,

    /// Template definitions in source order.
    pub templates: Vec<String>,

    /// Output channel definitions in source order.
    pub output_channels: Vec<String>,

    /// Allowed sender definitions in source order.
    pub allowed_senders: Vec<String>,

    /// Number of configured output actions across all rulesets.
    pub actions: usize,
}

impl ConfigRecord {
    /// Create an empty record carrying the built-in defaults and the
    /// default ruleset.
    pub fn new() -> Self {
        Self {
            globals: Globals::default(),
            main_queue: QueueTuning::default(),
            rulesets: RulesetCollection::new(),
            templates: Vec::new(),
            output_channels: Vec::new(),
            allowed_senders: Vec::new(),
            actions: 0,
        }
    }

    /// Restore every default-bearing setting.
    ///
    /// Privilege identities, rulesets and definitions are left untouched.
    pub fn reset_defaults(&mut self) {
        self.globals.reset_defaults();
        self.main_queue = QueueTuning::default();
    }
}

impl Default for ConfigRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Global flags and identities.
#[derive(Debug, Clone, Serialize)]
pub struct Globals {
    pub debug_print_template_list: bool,
    pub debug_print_module_list: bool,
    pub debug_print_handler_list: bool,
    pub log_status_msgs: bool,
    pub err_msg_to_stderr: bool,
    pub abort_on_unclean_config: bool,
    pub reduce_repeat_msgs: bool,

    /// UID to drop privileges to. Resolved at parse time, applied later.
    pub drop_priv_user: Option<u32>,

    /// GID to drop privileges to. Resolved at parse time, applied later.
    pub drop_priv_group: Option<u32>,

    /// Where to write the configuration graph, if requested.
    pub config_graph_file: Option<String>,

    /// Module search directory override.
    pub module_dir: Option<String>,

    /// Modules loaded during this load, in load order.
    pub modules: Vec<String>,

    /// Maximum message size in bytes.
    pub max_message_size: Option<i64>,

    /// Action resume interval in seconds.
    pub action_resume_interval: Option<i64>,

    /// File creation mask applied during the load.
    pub umask: Option<u32>,

    /// Open file limit applied during the load.
    pub max_open_files: Option<u64>,
}

impl Globals {
    fn reset_defaults(&mut self) {
        self.log_status_msgs = DEFAULT_LOG_STATUS_MSGS;
        self.debug_print_template_list = true;
        self.debug_print_handler_list = true;
        self.debug_print_module_list = true;
        self.abort_on_unclean_config = false;
        self.reduce_repeat_msgs = false;
    }
}

impl Default for Globals {
    fn default() -> Self {
        Self {
            debug_print_template_list: true,
            debug_print_module_list: true,
            debug_print_handler_list: true,
            log_status_msgs: DEFAULT_LOG_STATUS_MSGS,
            err_msg_to_stderr: true,
            abort_on_unclean_config: false,
            reduce_repeat_msgs: false,
            drop_priv_user: None,
            drop_priv_group: None,
            config_graph_file: None,
            module_dir: None,
            modules: Vec::new(),
            max_message_size: None,
            action_resume_interval: None,
            umask: None,
            max_open_files: None,
        }
    }
}

/// Backing mode of the main message queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueueType {
    /// In-memory array of fixed capacity.
    FixedArray,
    /// In-memory linked list.
    LinkedList,
    /// Disk-backed queue; requires a file name.
    Disk,
    /// No queueing at all.
    Direct,
}

impl QueueType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueType::FixedArray => "fixedarray",
            QueueType::LinkedList => "linkedlist",
            QueueType::Disk => "disk",
            QueueType::Direct => "direct",
        }
    }
}

impl fmt::Display for QueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognized queue type literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownQueueType(pub String);

impl fmt::Display for UnknownQueueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown main message queue type '{}'", self.0)
    }
}

impl std::error::Error for UnknownQueueType {}

impl FromStr for QueueType {
    type Err = UnknownQueueType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fixedarray" => Ok(QueueType::FixedArray),
            "linkedlist" => Ok(QueueType::LinkedList),
            "disk" => Ok(QueueType::Disk),
            "direct" => Ok(QueueType::Direct),
            _ => Err(UnknownQueueType(s.to_string())),
        }
    }
}

/// Tunable parameters of the main message queue.
///
/// Counts are in messages, timeouts in milliseconds, sizes in bytes.
/// Ordering between watermarks is checked by validation, not on each set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueTuning {
    pub size: i64,
    pub high_watermark: i64,
    pub low_watermark: i64,
    pub discard_mark: i64,
    /// 0-7, or 8 for "none".
    pub discard_severity: u8,
    pub worker_threads: i64,
    pub queue_type: QueueType,
    /// Required iff `queue_type` is `Disk`.
    pub file_name: Option<String>,
    /// 0 = unlimited.
    pub max_file_size: i64,
    /// 0 = unlimited.
    pub max_disk_space: i64,
    /// Updates between persists; 0 = only on shutdown.
    pub checkpoint_interval: i64,
    pub sync_queue_files: bool,
    pub timeout_shutdown: i64,
    pub timeout_action_completion: i64,
    pub timeout_enqueue: i64,
    pub timeout_worker_shutdown: i64,
    pub dequeue_batch_size: i64,
    /// Hour the dequeue window opens.
    pub dequeue_time_begin: i64,
    /// Hour the dequeue window closes; 25 disables the window.
    pub dequeue_time_end: i64,
    pub save_on_shutdown: bool,
    /// Microseconds.
    pub dequeue_slowdown: i64,
    pub worker_min_messages: i64,
}

impl Default for QueueTuning {
    fn default() -> Self {
        Self {
            size: 10_000,
            high_watermark: 8_000,
            low_watermark: 2_000,
            discard_mark: 9_800,
            discard_severity: DISCARD_SEVERITY_NONE,
            worker_threads: 1,
            queue_type: QueueType::FixedArray,
            file_name: None,
            max_file_size: 1024 * 1024,
            max_disk_space: 0,
            checkpoint_interval: 0,
            sync_queue_files: false,
            timeout_shutdown: 1_500,
            timeout_action_completion: 1_000,
            timeout_enqueue: 2_000,
            timeout_worker_shutdown: 60_000,
            dequeue_batch_size: 32,
            dequeue_time_begin: 0,
            dequeue_time_end: DEQUEUE_WINDOW_DISABLED,
            save_on_shutdown: true,
            dequeue_slowdown: 0,
            worker_min_messages: 100,
        }
    }
}
