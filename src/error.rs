//! Error types for the watchdog supervisor.
//!
//! A single `WatchdogError` enum covers every fallible registry, detector and
//! executor operation. All variants are `Copy` so results can be passed
//! through the supervisory loop without allocation.
//!
//! A forced restart has no variant: `RESET_SYSTEM` transfers control through
//! `SystemPort::restart`, which returns `!`.

use core::fmt;

// ---------------------------------------------------------------------------
// Supervisor error
// ---------------------------------------------------------------------------

/// Every fallible supervisor operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogError {
    /// Registration attempted with no free slot.
    RegistryFull,
    /// Id outside the slot range, or the slot is not registered.
    InvalidId,
    /// Lookup for a name with no registered match.
    InvalidName,
    /// Another registered watchdog already uses this name.
    DuplicateName,
    /// The watchdog configuration failed validation.
    InvalidConfig(&'static str),
    /// The supervisor has not been initialised (or was shut down).
    NotInitialized,
    /// The operation is not valid from the record's current state.
    InvalidState,
}

impl fmt::Display for WatchdogError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RegistryFull => write!(f, "registry full"),
            Self::InvalidId => write!(f, "invalid watchdog id"),
            Self::InvalidName => write!(f, "no watchdog with that name"),
            Self::DuplicateName => write!(f, "watchdog name already registered"),
            Self::InvalidConfig(msg) => write!(f, "invalid config: {msg}"),
            Self::NotInitialized => write!(f, "supervisor not initialised"),
            Self::InvalidState => write!(f, "operation not valid in current state"),
        }
    }
}

impl core::error::Error for WatchdogError {}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Supervisor-wide `Result` alias.
pub type Result<T> = core::result::Result<T, WatchdogError>;
