//! Per-watchdog record: configuration, state and counters.

use super::{WatchdogConfig, WatchdogState};

/// WARNING fires once `elapsed >= 0.8 * timeout`, i.e. `5 * elapsed >= 4 * timeout`.
const WARNING_NUM: u64 = 4;
const WARNING_DEN: u64 = 5;

/// One occupied registry slot.
///
/// `get_info` hands out clones of this struct, so every field is readable;
/// mutation only happens through the registry and the detector.
#[derive(Debug, Clone)]
pub struct WatchdogRecord {
    pub config: WatchdogConfig,
    pub state: WatchdogState,
    /// Monotonic ms of the last accepted feed (or arm).
    pub last_feed_ms: u64,
    /// Monotonic ms of the last entry into TIMEOUT, 0 if never.
    pub last_timeout_ms: u64,
    pub timeout_count: u32,
    pub feed_count: u32,
    pub registered: bool,
}

impl WatchdogRecord {
    pub(crate) fn new(config: WatchdogConfig, now_ms: u64) -> Self {
        let (state, last_feed_ms) = if config.enabled {
            (WatchdogState::Enabled, now_ms)
        } else {
            (WatchdogState::Disabled, 0)
        };
        Self {
            config,
            state,
            last_feed_ms,
            last_timeout_ms: 0,
            timeout_count: 0,
            feed_count: 0,
            registered: true,
        }
    }

    /// Milliseconds since the last feed. Never underflows when a concurrent
    /// feed stamped a time slightly ahead of `now_ms`.
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.last_feed_ms)
    }

    /// First whole millisecond at or past 80 % of the timeout.
    ///
    /// Rounded up, so a feed period strictly below `0.8 * timeout` never
    /// reaches it.
    pub fn warning_threshold_ms(&self) -> u64 {
        (u64::from(self.config.timeout_ms) * WARNING_NUM).div_ceil(WARNING_DEN)
    }

    pub fn timeout_ms(&self) -> u64 {
        u64::from(self.config.timeout_ms)
    }

    /// Armed and currently TIMEOUT or FAILED.
    pub fn is_faulted(&self) -> bool {
        self.config.enabled && self.state.is_fault()
    }

    /// Armed, regardless of state.
    pub fn is_active(&self) -> bool {
        self.config.enabled
    }

    // ── Mutation (registry / detector only) ──────────────────────

    /// Accept a liveness signal. Returns `false` when not monitoring.
    pub(crate) fn feed(&mut self, at_ms: u64) -> bool {
        if !self.state.is_monitoring() {
            return false;
        }
        // A reordered pulse must not pull the baseline backwards.
        self.last_feed_ms = self.last_feed_ms.max(at_ms);
        self.feed_count = self.feed_count.saturating_add(1);
        self.state = WatchdogState::Enabled;
        true
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool, now_ms: u64) {
        self.config.enabled = enabled;
        if enabled {
            self.state = WatchdogState::Enabled;
            self.last_feed_ms = now_ms;
        } else {
            self.state = WatchdogState::Disabled;
        }
    }

    /// Enter TIMEOUT: stamp and count. Called once per entry.
    pub(crate) fn enter_timeout(&mut self, now_ms: u64) {
        self.state = WatchdogState::Timeout;
        self.last_timeout_ms = now_ms;
        self.timeout_count = self.timeout_count.saturating_add(1);
    }

    /// Back to ENABLED with a fresh baseline.
    pub(crate) fn rearm(&mut self, now_ms: u64) {
        self.state = WatchdogState::Enabled;
        self.last_feed_ms = now_ms;
    }

    pub(crate) fn reset_counters(&mut self) {
        self.timeout_count = 0;
        self.feed_count = 0;
    }
}
