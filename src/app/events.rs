//! Outbound supervisor events.
//!
//! The [`WatchdogManager`](crate::watchdog::WatchdogManager) emits these
//! through the [`EventSink`](super::ports::EventSink) port. Adapters on the
//! other side decide what to do with them: log to serial, drive the alert
//! indicator, forward to telemetry.

use crate::app::ports::ResetReason;
use crate::watchdog::{RecoveryAction, WatchdogId, WatchdogName};

/// Bounded restart reason carried by [`WatchdogEvent::SystemResetRequested`].
pub type ResetMessage = heapless::String<48>;

/// Structured events emitted by the supervisor core.
#[derive(Debug, Clone, PartialEq)]
pub enum WatchdogEvent {
    /// `init` completed; carries the boot reset cause.
    Initialized { reset_reason: ResetReason },

    /// Unfed for at least 80 % of the timeout.
    Warning {
        id: WatchdogId,
        name: WatchdogName,
        elapsed_ms: u64,
        timeout_ms: u32,
    },

    /// Entered TIMEOUT. Emitted exactly once per entry.
    Timeout {
        id: WatchdogId,
        name: WatchdogName,
        elapsed_ms: u64,
        timeout_count: u32,
        action: RecoveryAction,
    },

    /// The `LOG` recovery action's diagnostic record.
    ActionLogged { id: WatchdogId, name: WatchdogName },

    TaskRestarted { id: WatchdogId, name: WatchdogName },

    TaskRestartFailed { id: WatchdogId, name: WatchdogName },

    /// A `CUSTOM` action's callback reported failure.
    CallbackFailed { id: WatchdogId, name: WatchdogName },

    /// Safe mode entered; `disabled` watchdogs were disarmed.
    SafeModeEntered { disabled: usize },

    /// A full restart is about to happen.
    SystemResetRequested { reason: ResetMessage },

    /// A TIMEOUT cleared itself back to ENABLED.
    AutoReset { id: WatchdogId },

    RecoveryStarted { id: WatchdogId },

    Recovered { id: WatchdogId },

    /// The action failed again during recovery; the record is FAILED.
    RecoveryFailed { id: WatchdogId },

    /// Counters were zeroed by `reset_stats`.
    StatsReset,

    /// Every watchdog was disarmed by `shutdown`.
    Shutdown,
}

impl WatchdogEvent {
    /// Whether an operator-visible alert should accompany this event.
    pub fn is_alert(&self) -> bool {
        matches!(
            self,
            Self::Timeout { .. }
                | Self::TaskRestartFailed { .. }
                | Self::CallbackFailed { .. }
                | Self::SafeModeEntered { .. }
                | Self::SystemResetRequested { .. }
                | Self::RecoveryFailed { .. }
        )
    }
}

/// Truncating conversion into a [`ResetMessage`].
pub fn reset_message(reason: &str) -> ResetMessage {
    let mut out = ResetMessage::new();
    for c in reason.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}
