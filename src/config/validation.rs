//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic checks of a finished record before it may be activated
//! - Value ranges (non-negative counts, dequeue window hours)
//! - Ordering between low/high watermarks and the discard mark
//! - Disk-backed queue requires a backing file name
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ConfigRecord → Result<(), Vec<ValidationError>>
//! - Runs when a load is finalized; activation itself never validates

use thiserror::Error;

use crate::config::schema::{ConfigRecord, QueueTuning, QueueType, DISCARD_SEVERITY_NONE};

/// A single semantic problem found in a record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be negative (got {value})")]
    Negative { field: &'static str, value: i64 },

    #[error("{field} must be at least 1 (got {value})")]
    NotPositive { field: &'static str, value: i64 },

    #[error("high watermark {high} must be greater than low watermark {low}")]
    WatermarkOrder { high: i64, low: i64 },

    #[error("discard mark {discard} must lie between high watermark {high} and queue size {size}")]
    DiscardMarkOrder { discard: i64, high: i64, size: i64 },

    #[error("discard severity {0} is out of range 0-8")]
    DiscardSeverity(u8),

    #[error("disk-backed main queue requires $MainMsgQueueFileName")]
    MissingQueueFile,

    #[error("dequeue window hour {field} = {value} is out of range 0-25")]
    DequeueWindow { field: &'static str, value: i64 },

    #[error("default ruleset '{0}' does not exist")]
    MissingDefaultRuleset(String),
}

/// Validate a finished record.
pub fn validate_record(record: &ConfigRecord) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_queue(&record.main_queue);

    let default = record.rulesets.default_name();
    if record.rulesets.get(default).is_none() {
        errors.push(ValidationError::MissingDefaultRuleset(default.to_string()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate the queue tuning schema in isolation.
pub fn validate_queue(q: &QueueTuning) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    let non_negative = [
        ("size", q.size),
        ("high_watermark", q.high_watermark),
        ("low_watermark", q.low_watermark),
        ("discard_mark", q.discard_mark),
        ("max_file_size", q.max_file_size),
        ("max_disk_space", q.max_disk_space),
        ("checkpoint_interval", q.checkpoint_interval),
        ("timeout_shutdown", q.timeout_shutdown),
        ("timeout_action_completion", q.timeout_action_completion),
        ("timeout_enqueue", q.timeout_enqueue),
        ("timeout_worker_shutdown", q.timeout_worker_shutdown),
        ("dequeue_slowdown", q.dequeue_slowdown),
        ("worker_min_messages", q.worker_min_messages),
    ];
    for (field, value) in non_negative {
        if value < 0 {
            errors.push(ValidationError::Negative { field, value });
        }
    }

    for (field, value) in [
        ("worker_threads", q.worker_threads),
        ("dequeue_batch_size", q.dequeue_batch_size),
    ] {
        if value < 1 {
            errors.push(ValidationError::NotPositive { field, value });
        }
    }

    if q.high_watermark <= q.low_watermark {
        errors.push(ValidationError::WatermarkOrder {
            high: q.high_watermark,
            low: q.low_watermark,
        });
    }

    if q.discard_mark < q.high_watermark || q.discard_mark > q.size {
        errors.push(ValidationError::DiscardMarkOrder {
            discard: q.discard_mark,
            high: q.high_watermark,
            size: q.size,
        });
    }

    if q.discard_severity > DISCARD_SEVERITY_NONE {
        errors.push(ValidationError::DiscardSeverity(q.discard_severity));
    }

    if q.queue_type == QueueType::Disk && q.file_name.as_deref().map_or(true, str::is_empty) {
        errors.push(ValidationError::MissingQueueFile);
    }

    for (field, value) in [
        ("dequeue_time_begin", q.dequeue_time_begin),
        ("dequeue_time_end", q.dequeue_time_end),
    ] {
        if !(0..=25).contains(&value) {
            errors.push(ValidationError::DequeueWindow { field, value });
        }
    }

    errors
}
