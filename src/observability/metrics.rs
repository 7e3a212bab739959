//! Metrics collection.
//!
//! # Metrics
//! - `confstage_loads_total` (counter): loads by outcome (clean, unclean, fallback, failed)
//! - `confstage_directive_errors_total` (counter): recoverable errors by kind
//! - `confstage_fallback_total` (counter): emergency configurations built
//! - `confstage_activations_total` (counter): records swapped in
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; without an installed recorder
//!   every call is a no-op

use metrics::counter;

pub fn record_load(outcome: &'static str) {
    counter!("confstage_loads_total", "outcome" => outcome).increment(1);
}

pub fn record_directive_error(kind: &'static str) {
    counter!("confstage_directive_errors_total", "kind" => kind).increment(1);
}

pub fn record_fallback() {
    counter!("confstage_fallback_total").increment(1);
}

pub fn record_activation() {
    counter!("confstage_activations_total").increment(1);
}
