//! Supervisor-wide counters.
//!
//! [`StatsCollector`] outlives every individual record: unregistering a
//! watchdog never rolls its timeouts back out of the totals. All counters
//! saturate instead of wrapping.

use serde::{Deserialize, Serialize};

use super::WatchdogRegistry;
use crate::app::ports::ResetReason;

/// Point-in-time view of the global counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStats {
    /// Registrations since boot (or the last `reset_stats`).
    pub total_watchdogs: u32,
    /// Registered and armed right now. Derived on every snapshot.
    pub active_watchdogs: u32,
    pub total_timeouts: u32,
    pub total_resets: u32,
    /// Milliseconds since init (or the last `reset_stats`).
    pub uptime_ms: u64,
    /// Monotonic ms of the last system reset request or stats reset.
    pub last_reset_ms: u64,
    /// Captured once at init. `None` until then.
    pub reset_reason: Option<ResetReason>,
}

/// Owner of the monotonic counters.
#[derive(Debug, Clone, Default)]
pub struct StatsCollector {
    total_watchdogs: u32,
    total_timeouts: u32,
    total_resets: u32,
    start_ms: u64,
    last_reset_ms: u64,
    reset_reason: Option<ResetReason>,
}

impl StatsCollector {
    pub fn new(start_ms: u64) -> Self {
        Self {
            start_ms,
            ..Self::default()
        }
    }

    /// Record the boot reset cause. Later calls are ignored.
    pub fn capture_reset_reason(&mut self, reason: ResetReason) {
        if self.reset_reason.is_none() {
            self.reset_reason = Some(reason);
        }
    }

    pub fn reset_reason(&self) -> Option<ResetReason> {
        self.reset_reason
    }

    pub fn record_registration(&mut self) {
        self.total_watchdogs = self.total_watchdogs.saturating_add(1);
    }

    pub fn record_timeout(&mut self) {
        self.total_timeouts = self.total_timeouts.saturating_add(1);
    }

    pub fn record_reset(&mut self, now_ms: u64) {
        self.total_resets = self.total_resets.saturating_add(1);
        self.last_reset_ms = now_ms;
    }

    pub fn total_timeouts(&self) -> u32 {
        self.total_timeouts
    }

    pub fn total_resets(&self) -> u32 {
        self.total_resets
    }

    pub fn uptime_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.start_ms)
    }

    /// Zero the counters and restart the uptime baseline.
    ///
    /// `total_watchdogs` restarts from the currently registered count and the
    /// boot reset reason is kept.
    pub fn reset(&mut self, registered: usize, now_ms: u64) {
        self.total_watchdogs = registered as u32;
        self.total_timeouts = 0;
        self.total_resets = 0;
        self.start_ms = now_ms;
        self.last_reset_ms = now_ms;
    }

    pub fn snapshot<const N: usize>(&self, registry: &WatchdogRegistry<N>, now_ms: u64) -> GlobalStats {
        GlobalStats {
            total_watchdogs: self.total_watchdogs,
            active_watchdogs: registry.active_count() as u32,
            total_timeouts: self.total_timeouts,
            total_resets: self.total_resets,
            uptime_ms: self.uptime_ms(now_ms),
            last_reset_ms: self.last_reset_ms,
            reset_reason: self.reset_reason,
        }
    }
}
