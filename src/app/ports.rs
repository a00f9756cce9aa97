//! Port traits: the boundary between the watchdog core and the platform.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ WatchdogManager (domain)
//! ```
//!
//! Driven adapters (clock, restart hooks, event sinks, storage) implement
//! these traits. The [`WatchdogManager`](crate::watchdog::WatchdogManager)
//! consumes them via generics, so the supervisor never touches the SoC
//! directly and every path can be exercised on the host.
//!
//! ## Notes
//!
//! - **SystemPort::restart** is the only terminal operation in the crate.
//! - **ConfigPort** implementations MUST validate before persisting.
//! - All port errors are typed; callers handle every variant explicitly.

use serde::{Deserialize, Serialize};

use crate::config::SupervisorConfig;

// ───────────────────────────────────────────────────────────────
// Clock port (driven adapter: platform timer → domain)
// ───────────────────────────────────────────────────────────────

/// Monotonic millisecond time source.
pub trait Clock {
    /// Milliseconds since an arbitrary fixed origin. Never decreases.
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// System port (driven adapter: domain → SoC reset controller)
// ───────────────────────────────────────────────────────────────

/// Platform-reported cause of the most recent restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResetReason {
    PowerOn,
    External,
    Software,
    Panic,
    InterruptWatchdog,
    TaskWatchdog,
    OtherWatchdog,
    DeepSleep,
    Brownout,
    Unknown,
}

impl ResetReason {
    /// Any of the three watchdog causes.
    pub const fn is_watchdog(self) -> bool {
        matches!(
            self,
            Self::InterruptWatchdog | Self::TaskWatchdog | Self::OtherWatchdog
        )
    }
}

impl core::fmt::Display for ResetReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            Self::PowerOn => "Power-on reset",
            Self::External => "External reset",
            Self::Software => "Software reset",
            Self::Panic => "Exception/panic reset",
            Self::InterruptWatchdog => "Interrupt watchdog reset",
            Self::TaskWatchdog => "Task watchdog reset",
            Self::OtherWatchdog => "Other watchdog reset",
            Self::DeepSleep => "Deep sleep reset",
            Self::Brownout => "Brownout reset",
            Self::Unknown => "Unknown reset reason",
        };
        f.write_str(s)
    }
}

/// Boot-time reset cause and the full system restart.
pub trait SystemPort {
    /// Read the last reset cause. The supervisor calls this exactly once,
    /// during `init`.
    fn reset_reason(&self) -> ResetReason;

    /// Perform an unconditional full restart. Never returns.
    fn restart(&mut self, reason: &str) -> !;
}

// ───────────────────────────────────────────────────────────────
// Task port (driven adapter: domain → subsystem restart hooks)
// ───────────────────────────────────────────────────────────────

/// Restart hook for the subsystem a `RESET_TASK` watchdog supervises.
pub trait TaskPort {
    /// Restart the subsystem registered under `name`.
    fn restart_task(&mut self, name: &str) -> Result<(), TaskRestartError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The supervisor emits structured [`WatchdogEvent`](super::events::WatchdogEvent)s
/// through this port. Adapters decide where they go (serial log, alert
/// indicator, telemetry uplink).
pub trait EventSink {
    fn emit(&mut self, event: &super::events::WatchdogEvent);
}

/// Fan an event out to two sinks, first `A` then `B`.
impl<A: EventSink, B: EventSink> EventSink for (A, B) {
    fn emit(&mut self, event: &super::events::WatchdogEvent) {
        self.0.emit(event);
        self.1.emit(event);
    }
}

impl<S: EventSink + ?Sized> EventSink for &mut S {
    fn emit(&mut self, event: &super::events::WatchdogEvent) {
        (**self).emit(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists the supervisor configuration.
///
/// Implementations MUST validate before persisting. Invalid values are
/// rejected with [`ConfigError::ValidationFailed`], never clamped, so a
/// remote channel cannot shrink the main-loop timeout below the floor.
pub trait ConfigPort {
    /// Returns [`SupervisorConfig::default()`] if nothing is stored.
    fn load(&self) -> Result<SupervisorConfig, ConfigError>;

    fn save(&self, config: &SupervisorConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Storage port (driven adapter: domain ↔ NVS / flash)
// ───────────────────────────────────────────────────────────────

/// Persistent key-value storage for the timeout log and similar blobs.
///
/// Write operations MUST be atomic. The ESP-IDF NVS API guarantees this
/// natively; the in-memory simulation achieves it trivially.
pub trait StoragePort {
    /// Read a value. Returns the number of bytes written to `buf`.
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError>;

    /// Write a value atomically.
    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Delete a key. Returns `Ok(())` even if the key didn't exist.
    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`TaskPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRestartError {
    /// No restart hook registered under that name.
    UnknownTask,
    /// The hook ran but the subsystem did not come back.
    RestartFailed,
}

/// Errors from [`ConfigPort`] operations.
#[derive(Debug)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    StorageFull,
    IoError,
}

/// Errors from [`StoragePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    NotFound,
    Full,
    IoError,
    /// Blob could not be encoded or decoded.
    Encoding,
}

impl core::fmt::Display for TaskRestartError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::UnknownTask => write!(f, "no restart hook for task"),
            Self::RestartFailed => write!(f, "task restart failed"),
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::StorageFull => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl core::fmt::Display for StorageError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::NotFound => write!(f, "key not found"),
            Self::Full => write!(f, "storage full"),
            Self::IoError => write!(f, "I/O error"),
            Self::Encoding => write!(f, "blob encoding error"),
        }
    }
}

impl core::error::Error for TaskRestartError {}
impl core::error::Error for ConfigError {}
impl core::error::Error for StorageError {}
