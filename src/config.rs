//! Supervisor configuration parameters
//!
//! All tunable parameters of the watchdog supervisor.
//! Values can be overridden via NVS (see [`crate::adapters::nvs`]).
//!
//! `hw_watchdog_timeout_ms` only configures the platform task watchdog
//! driver. The supervisor never reads or services that timer; keeping the
//! two budgets consistent is the integrator's job, and [`SupervisorConfig::budget_warnings`]
//! only reports suspicious combinations.

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;
use crate::watchdog::{RecoveryAction, TIMEOUT_FLOOR_MS};

/// Core supervisor configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupervisorConfig {
    // --- Mandatory watchdogs ---
    /// Main control loop timeout (milliseconds)
    pub main_loop_timeout_ms: u32,
    /// Communication link timeout (milliseconds)
    pub comm_timeout_ms: u32,

    // --- Task watchdogs ---
    /// Timeout applied by `register_task` (the "global timeout")
    pub task_timeout_ms: u32,
    /// Action applied by `register_task` (the "default action")
    pub task_action: RecoveryAction,

    // --- Limits ---
    /// Registrations with a shorter timeout are rejected
    pub min_timeout_ms: u32,

    // --- Platform ---
    /// Hardware task watchdog (TWDT) timeout (milliseconds)
    pub hw_watchdog_timeout_ms: u32,

    // --- Runtime ---
    /// Raise routine traces to info level
    pub debug_mode: bool,
    /// Period of the supervisory tick (milliseconds)
    pub tick_interval_ms: u32,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            main_loop_timeout_ms: 30_000,
            comm_timeout_ms: 60_000,

            task_timeout_ms: 10_000,
            task_action: RecoveryAction::ResetTask,

            min_timeout_ms: 100,

            hw_watchdog_timeout_ms: 10_000,

            debug_mode: false,
            tick_interval_ms: 1_000, // 1 Hz
        }
    }
}

impl SupervisorConfig {
    /// Range-check every field. Never clamps.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_timeout_ms < TIMEOUT_FLOOR_MS {
            return Err(ConfigError::ValidationFailed(
                "min_timeout_ms below the 5 ms floor",
            ));
        }
        for (value, msg) in [
            (
                self.main_loop_timeout_ms,
                "main_loop_timeout_ms below min_timeout_ms",
            ),
            (self.comm_timeout_ms, "comm_timeout_ms below min_timeout_ms"),
            (self.task_timeout_ms, "task_timeout_ms below min_timeout_ms"),
        ] {
            if value < self.min_timeout_ms {
                return Err(ConfigError::ValidationFailed(msg));
            }
        }
        if self.hw_watchdog_timeout_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "hw_watchdog_timeout_ms must be > 0",
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed("tick_interval_ms must be > 0"));
        }
        if self.tick_interval_ms >= self.min_timeout_ms.max(self.task_timeout_ms) {
            return Err(ConfigError::ValidationFailed(
                "tick_interval_ms must be shorter than task_timeout_ms",
            ));
        }
        Ok(())
    }

    /// Advisory checks on combinations that validate but are probably wrong.
    pub fn budget_warnings(&self) -> heapless::Vec<&'static str, 4> {
        let mut out = heapless::Vec::new();
        if self.hw_watchdog_timeout_ms <= self.tick_interval_ms {
            let _ = out.push("hardware watchdog expires before the next supervisor tick");
        }
        if self.tick_interval_ms > self.main_loop_timeout_ms / 5 {
            let _ = out.push("tick interval is too coarse to observe the main-loop warning");
        }
        if self.main_loop_timeout_ms < self.tick_interval_ms.saturating_mul(2) {
            let _ = out.push("main-loop timeout shorter than two ticks");
        }
        out
    }
}
