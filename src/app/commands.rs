//! Inbound commands to the supervisor.
//!
//! These represent operator actions requested by the outside world (RPC,
//! serial console, maintenance tooling) that the
//! [`WatchdogManager`](crate::watchdog::WatchdogManager) interprets via
//! `handle_command`.

use crate::watchdog::manager::SelfTestReport;
use crate::watchdog::{RecoveryAction, WatchdogId};

/// Commands that external adapters can send into the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorCommand {
    /// Arm (`true`) or disarm every registered watchdog.
    EnableAll(bool),

    /// Raise routine traces to info level.
    SetDebugMode(bool),

    /// Change the timeout used by later `register_task` calls.
    SetGlobalTimeout(u32),

    /// Change the action used by later `register_task` calls.
    SetDefaultAction(RecoveryAction),

    /// Zero the counters (reset reason is kept).
    ResetStats,

    /// Disarm everything but the main loop.
    EnterSafeMode,

    /// Re-run the action of a TIMEOUT/FAILED watchdog and re-arm it.
    Recover(WatchdogId),

    /// Exercise the supervisor end to end with a temporary watchdog.
    SelfTest,
}

/// What a command produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandReply {
    Done,
    /// Whether the recovery re-armed the watchdog.
    Recovered(bool),
    SelfTest(SelfTestReport),
}
