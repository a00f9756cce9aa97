//! Timeout detection rules for a single record.
//!
//! Pure time comparison: no I/O, no clock, never blocks. The manager calls
//! [`evaluate`] once per slot per tick and runs the recovery action when it
//! reports [`Transition::Timeout`].

use super::{WatchdogRecord, WatchdogState};

/// Escalation produced by one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// ENABLED → WARNING.
    Warning { elapsed_ms: u64 },
    /// ENABLED/WARNING → TIMEOUT. The record is already stamped and counted.
    Timeout { elapsed_ms: u64 },
}

/// Apply the WARNING rule, then the TIMEOUT rule.
///
/// Only armed records in a monitoring state are evaluated, so a record that
/// sits in TIMEOUT (auto-reset off) is never re-triggered. A record can
/// jump from ENABLED straight to TIMEOUT when the tick is coarse; the
/// returned transition is then `Timeout` and the warning is implied.
pub fn evaluate(record: &mut WatchdogRecord, now_ms: u64) -> Option<Transition> {
    if !record.config.enabled || !record.state.is_monitoring() {
        return None;
    }

    let elapsed_ms = record.elapsed_ms(now_ms);
    let mut transition = None;

    if elapsed_ms >= record.warning_threshold_ms() && record.state == WatchdogState::Enabled {
        record.state = WatchdogState::Warning;
        transition = Some(Transition::Warning { elapsed_ms });
    }

    if elapsed_ms >= record.timeout_ms() {
        record.enter_timeout(now_ms);
        transition = Some(Transition::Timeout { elapsed_ms });
    }

    transition
}
