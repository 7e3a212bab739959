//! Emergency configuration.
//!
//! # Responsibilities
//! - Inject a small, hard-coded rule set when a load produced nothing usable
//! - Keep going when single rules fail to compile
//!
//! # Data Flow
//! ```text
//! load finished ─┬─ hard parse failure ──┐
//!                └─ zero output actions ─┴─▶ build_fallback
//!                                              ├─ *.err      → console
//!                                              ├─ syslog.*   → console
//!                                              ├─ *.panic    → all users
//!                                              ├─ syslog.*   → root
//!                                              └─ *.*        → controlling tty (if any)
//! ```

use serde::Serialize;
use tracing::{error, warn};

use crate::lifecycle::StagedConfig;
use crate::observability::metrics;

/// System console device.
pub const CONSOLE_DEVICE: &str = "/dev/console";

/// The emergency rules, in injection order.
pub fn fallback_rules(tty: Option<&str>) -> Vec<String> {
    let mut rules = vec![
        format!("*.err\t{CONSOLE_DEVICE}"),
        format!("syslog.*\t{CONSOLE_DEVICE}"),
        "*.panic\t*".to_string(),
        "syslog.*\troot".to_string(),
    ];
    if let Some(tty) = tty {
        rules.push(format!("*.*\t{tty}"));
    }
    rules
}

/// What the fallback managed to inject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FallbackReport {
    pub injected: usize,
    pub failed: usize,
}

/// Attach the emergency rules to the current ruleset of `staged`.
///
/// Best-effort: a rule the compiler rejects is logged and skipped.
pub fn build_fallback(staged: &mut StagedConfig, tty: Option<&str>) -> FallbackReport {
    error!(
        load_id = %staged.load_id(),
        ruleset = %staged.current_ruleset_name(),
        "EMERGENCY CONFIGURATION ACTIVATED - fix the configuration to get rid of this message"
    );

    let mut report = FallbackReport::default();
    for rule in fallback_rules(tty) {
        match staged.add_rule(&rule) {
            Ok(()) => report.injected += 1,
            Err(e) => {
                warn!(load_id = %staged.load_id(), rule = %rule, error = %e, "fallback rule rejected");
                report.failed += 1;
            }
        }
    }
    metrics::record_fallback();
    report
}
