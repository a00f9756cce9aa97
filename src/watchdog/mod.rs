//! Software watchdog supervision.
//!
//! A fixed-capacity registry of independent liveness detectors. Cooperating
//! subsystems register a watchdog, then *feed* it periodically; an external
//! tick drives a single-pass scan that escalates unfed watchdogs and runs the
//! configured recovery action.
//!
//! ```text
//!   register ──▶ ┌──────────┐  feed   ┌─────────┐  ≥ 80 %  ┌─────────┐
//!                │ DISABLED │ ──────▶ │ ENABLED │ ───────▶ │ WARNING │
//!                └──────────┘ enable  └─────────┘ ◀─────── └─────────┘
//!                                       ▲    │ ≥ 100 %  feed    │ ≥ 100 %
//!                          auto_reset   │    ▼                  ▼
//!                                     ┌──────────────────────────────┐
//!                                     │ TIMEOUT ──(action)──▶ FAILED │
//!                                     └──────────────────────────────┘
//!                                                │ attempt_recovery
//!                                                ▼
//!                                           RECOVERY ──▶ ENABLED
//! ```
//!
//! This layer is independent of the platform's hardware task watchdog
//! ([`crate::drivers::watchdog::HardwareWatchdog`]). The host loop services
//! that timer separately; keeping both timeout budgets consistent is the
//! integrator's responsibility.

pub mod actions;
pub mod detector;
pub mod manager;
pub mod record;
pub mod registry;
pub mod report;
pub mod stats;

use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, WatchdogError};

pub use manager::WatchdogManager;
pub use record::WatchdogRecord;
pub use registry::{MAX_WATCHDOGS, TIMEOUT_FLOOR_MS, WatchdogRegistry};
pub use stats::{GlobalStats, StatsCollector};

/// Longest watchdog name, in bytes.
pub const MAX_NAME_LEN: usize = 24;

/// Fixed-capacity watchdog name (no heap).
pub type WatchdogName = heapless::String<MAX_NAME_LEN>;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Stable slot index of a registered watchdog.
///
/// Valid until the watchdog is explicitly unregistered; the index may then
/// be handed out again by a later registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WatchdogId(u8);

impl WatchdogId {
    pub const fn new(index: u8) -> Self {
        Self(index)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for WatchdogId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Enumerations
// ---------------------------------------------------------------------------

/// What kind of subsystem a watchdog supervises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchdogCategory {
    Task,
    Interrupt,
    MainLoop,
    Communication,
    Hardware,
    Custom,
}

/// Per-record supervision state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WatchdogState {
    /// Not armed; the scan ignores it.
    Disabled,
    /// Armed and fed recently.
    Enabled,
    /// Armed, unfed for at least 80 % of its timeout.
    Warning,
    /// Unfed for the whole timeout; the action has fired.
    Timeout,
    /// `attempt_recovery` is re-running the action.
    Recovery,
    /// The recovery action reported failure.
    Failed,
}

impl WatchdogState {
    /// States in which `feed` is accepted and the scan evaluates elapsed time.
    pub const fn is_monitoring(self) -> bool {
        matches!(self, Self::Enabled | Self::Warning)
    }

    /// States that make the system unhealthy when the record is enabled.
    pub const fn is_fault(self) -> bool {
        matches!(self, Self::Timeout | Self::Failed)
    }
}

impl fmt::Display for WatchdogState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disabled => "DISABLED",
            Self::Enabled => "ENABLED",
            Self::Warning => "WARNING",
            Self::Timeout => "TIMEOUT",
            Self::Recovery => "RECOVERY",
            Self::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

/// Recovery behaviour executed when a watchdog times out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryAction {
    None,
    Log,
    ResetTask,
    /// Full system restart. Never returns.
    ResetSystem,
    SafeMode,
    Custom,
}

impl fmt::Display for RecoveryAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::None => "NONE",
            Self::Log => "LOG",
            Self::ResetTask => "RESET_TASK",
            Self::ResetSystem => "RESET_SYSTEM",
            Self::SafeMode => "SAFE_MODE",
            Self::Custom => "CUSTOM",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Callbacks
// ---------------------------------------------------------------------------

/// Result reported by a per-watchdog callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackOutcome {
    Handled,
    /// The custom recovery could not be performed; the record moves to FAILED.
    Failed,
}

/// Per-watchdog timeout hook. Takes no arguments and must not block.
///
/// Only `Fn` closures are accepted, so a callback cannot hold captured
/// mutable state; shared counters have to go through atomics.
#[derive(Clone)]
pub struct WatchdogCallback(Arc<dyn Fn() -> CallbackOutcome + Send + Sync>);

impl WatchdogCallback {
    pub fn new(f: impl Fn() -> CallbackOutcome + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn invoke(&self) -> CallbackOutcome {
        (self.0)()
    }
}

impl fmt::Debug for WatchdogCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WatchdogCallback(..)")
    }
}

/// Supervisor-wide hook run on every TIMEOUT, before the per-watchdog callback.
#[derive(Clone)]
pub struct GlobalTimeoutCallback(Arc<dyn Fn(WatchdogId) + Send + Sync>);

impl GlobalTimeoutCallback {
    pub fn new(f: impl Fn(WatchdogId) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn invoke(&self, id: WatchdogId) {
        (self.0)(id);
    }
}

impl fmt::Debug for GlobalTimeoutCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("GlobalTimeoutCallback(..)")
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Immutable per-watchdog configuration.
///
/// Replaceable only by unregistering and registering again.
#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    pub category: WatchdogCategory,
    pub timeout_ms: u32,
    pub action: RecoveryAction,
    pub auto_reset: bool,
    /// Initial armed state.
    pub enabled: bool,
    pub name: WatchdogName,
    pub callback: Option<WatchdogCallback>,
}

impl WatchdogConfig {
    /// Build a config with action `Log`, auto-reset on and armed.
    ///
    /// Fails if `name` is empty or longer than [`MAX_NAME_LEN`].
    pub fn new(name: &str, category: WatchdogCategory, timeout_ms: u32) -> Result<Self> {
        Ok(Self {
            category,
            timeout_ms,
            action: RecoveryAction::Log,
            auto_reset: true,
            enabled: true,
            name: make_name(name)?,
            callback: None,
        })
    }

    pub fn with_action(mut self, action: RecoveryAction) -> Self {
        self.action = action;
        self
    }

    pub fn with_auto_reset(mut self, auto_reset: bool) -> Self {
        self.auto_reset = auto_reset;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_callback(mut self, callback: WatchdogCallback) -> Self {
        self.callback = Some(callback);
        self
    }
}

/// Convert a `&str` into a bounded watchdog name.
pub fn make_name(name: &str) -> Result<WatchdogName> {
    if name.is_empty() {
        return Err(WatchdogError::InvalidConfig("name must not be empty"));
    }
    let mut out = WatchdogName::new();
    out.push_str(name)
        .map_err(|()| WatchdogError::InvalidConfig("name too long"))?;
    Ok(out)
}
