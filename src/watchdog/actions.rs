//! Recovery action execution.
//!
//! Maps a [`RecoveryAction`] to its effect. Everything except
//! `RESET_SYSTEM` returns normally; that one is a control transfer through
//! [`SystemPort::restart`] and never comes back.

use core::fmt::Write as _;

use log::{debug, error, info, warn};

use super::{
    CallbackOutcome, RecoveryAction, StatsCollector, WatchdogCategory, WatchdogId,
    WatchdogRegistry,
};
use crate::app::events::{ResetMessage, WatchdogEvent, reset_message};
use crate::app::ports::{EventSink, SystemPort, TaskPort};

/// Result of one action execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionOutcome {
    Completed,
    /// The action could not be carried out; the record moves to FAILED.
    Failed,
}

/// Borrowed view of the supervisor state an action may touch.
pub(crate) struct ActionExecutor<'a, const N: usize> {
    pub registry: &'a mut WatchdogRegistry<N>,
    pub stats: &'a mut StatsCollector,
    pub safe_mode: &'a mut bool,
    pub now_ms: u64,
}

impl<const N: usize> ActionExecutor<'_, N> {
    /// Execute the configured action of `id`.
    ///
    /// An unknown id is a no-op that reports `Completed`; the caller has
    /// already validated it.
    pub fn run(
        &mut self,
        id: WatchdogId,
        hooks: &mut (impl SystemPort + TaskPort),
        sink: &mut impl EventSink,
    ) -> ActionOutcome {
        let Ok(record) = self.registry.get(id) else {
            return ActionOutcome::Completed;
        };
        let name = record.config.name.clone();
        let action = record.config.action;
        let callback = record.config.callback.clone();

        debug!("WDT action {} for '{}'", action, name);

        match action {
            RecoveryAction::None => ActionOutcome::Completed,

            RecoveryAction::Log => {
                sink.emit(&WatchdogEvent::ActionLogged { id, name });
                ActionOutcome::Completed
            }

            RecoveryAction::ResetTask => match hooks.restart_task(&name) {
                Ok(()) => {
                    info!("WDT: task '{}' restarted", name);
                    sink.emit(&WatchdogEvent::TaskRestarted { id, name });
                    ActionOutcome::Completed
                }
                Err(e) => {
                    warn!("WDT: restart of task '{}' failed: {}", name, e);
                    sink.emit(&WatchdogEvent::TaskRestartFailed { id, name });
                    ActionOutcome::Failed
                }
            },

            RecoveryAction::ResetSystem => {
                let mut reason = ResetMessage::new();
                // Truncation on overflow is acceptable for a log line.
                let _ = write!(reason, "Watchdog timeout: {}", name);
                system_reset(self.stats, self.now_ms, hooks, sink, &reason)
            }

            RecoveryAction::SafeMode => {
                enter_safe_mode(self.registry, self.safe_mode, self.now_ms, sink);
                ActionOutcome::Completed
            }

            RecoveryAction::Custom => match callback.map(|cb| cb.invoke()) {
                Some(CallbackOutcome::Failed) => {
                    sink.emit(&WatchdogEvent::CallbackFailed { id, name });
                    ActionOutcome::Failed
                }
                // A missing callback is a silent no-op.
                Some(CallbackOutcome::Handled) | None => ActionOutcome::Completed,
            },
        }
    }
}

/// Count the reset, announce it, then restart. Never returns.
pub(crate) fn system_reset(
    stats: &mut StatsCollector,
    now_ms: u64,
    system: &mut impl SystemPort,
    sink: &mut impl EventSink,
    reason: &str,
) -> ! {
    stats.record_reset(now_ms);
    error!("WDT: system reset requested: {}", reason);
    sink.emit(&WatchdogEvent::SystemResetRequested {
        reason: reset_message(reason),
    });
    system.restart(reason)
}

/// Disarm every non-MAIN_LOOP watchdog and raise the safe-mode flag.
///
/// Returns how many watchdogs were disarmed. Idempotent.
pub(crate) fn enter_safe_mode<const N: usize>(
    registry: &mut WatchdogRegistry<N>,
    safe_mode: &mut bool,
    now_ms: u64,
    sink: &mut impl EventSink,
) -> usize {
    let mut disabled = 0;
    for (_, record) in registry.iter_mut() {
        if record.config.category != WatchdogCategory::MainLoop && record.config.enabled {
            record.set_enabled(false, now_ms);
            disabled += 1;
        }
    }
    if !*safe_mode {
        warn!("WDT: entering safe mode ({} watchdogs disabled)", disabled);
    }
    *safe_mode = true;
    sink.emit(&WatchdogEvent::SafeModeEntered { disabled });
    disabled
}
