//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing supervisor events to the ESP-IDF
//! logger (UART / USB-CDC in production). Severity follows the event:
//! timeouts and failures are warnings, restarts are errors.

use log::{error, info, warn};

use crate::app::events::WatchdogEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`WatchdogEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &WatchdogEvent) {
        match event {
            WatchdogEvent::Initialized { reset_reason } => {
                info!("WDT | init | reset_reason={}", reset_reason);
            }
            WatchdogEvent::Warning {
                id,
                name,
                elapsed_ms,
                timeout_ms,
            } => {
                info!(
                    "WDT | warning | {} {} | {}/{} ms",
                    id, name, elapsed_ms, timeout_ms
                );
            }
            WatchdogEvent::Timeout {
                id,
                name,
                elapsed_ms,
                timeout_count,
                action,
            } => {
                warn!(
                    "WDT | timeout | {} {} | elapsed={} ms count={} action={}",
                    id, name, elapsed_ms, timeout_count, action
                );
            }
            WatchdogEvent::ActionLogged { id, name } => {
                info!("WDT | log | {} {} timed out", id, name);
            }
            WatchdogEvent::TaskRestarted { id, name } => {
                info!("WDT | task | {} {} restarted", id, name);
            }
            WatchdogEvent::TaskRestartFailed { id, name } => {
                warn!("WDT | task | {} {} restart FAILED", id, name);
            }
            WatchdogEvent::CallbackFailed { id, name } => {
                warn!("WDT | custom | {} {} callback FAILED", id, name);
            }
            WatchdogEvent::SafeModeEntered { disabled } => {
                warn!("WDT | safe mode | {} watchdogs disabled", disabled);
            }
            WatchdogEvent::SystemResetRequested { reason } => {
                error!("WDT | RESET | {}", reason);
            }
            WatchdogEvent::AutoReset { id } => {
                info!("WDT | auto-reset | {}", id);
            }
            WatchdogEvent::RecoveryStarted { id } => {
                info!("WDT | recovery | {} started", id);
            }
            WatchdogEvent::Recovered { id } => {
                info!("WDT | recovery | {} re-armed", id);
            }
            WatchdogEvent::RecoveryFailed { id } => {
                warn!("WDT | recovery | {} FAILED", id);
            }
            WatchdogEvent::StatsReset => {
                info!("WDT | stats reset");
            }
            WatchdogEvent::Shutdown => {
                info!("WDT | shutdown");
            }
        }
    }
}
