//! Serialisable supervisor reports.
//!
//! Plain data built from a registry snapshot. Each report can be rendered
//! to the log (`log()`) or to JSON for a diagnostics endpoint.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use super::{
    GlobalStats, WatchdogCategory, WatchdogId, WatchdogName, WatchdogRegistry, WatchdogState,
};

/// Overall verdict of a [`HealthReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    Healthy,
    /// Healthy, but in safe mode or with watchdogs in WARNING.
    Degraded,
    /// At least one armed watchdog is TIMEOUT or FAILED.
    Faulted,
}

impl core::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Healthy => write!(f, "HEALTHY"),
            Self::Degraded => write!(f, "DEGRADED"),
            Self::Faulted => write!(f, "FAULTED"),
        }
    }
}

/// Operator guidance attached to a [`HealthReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recommendation {
    None,
    /// Inspect the tasks listed as problems.
    CheckTimedOutTasks,
    /// Safe mode is active; a restart is needed to re-arm supervision.
    LeaveSafeMode,
}

impl core::fmt::Display for Recommendation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::None => write!(f, "none"),
            Self::CheckTimedOutTasks => write!(f, "check the tasks in timeout"),
            Self::LeaveSafeMode => write!(f, "restart to leave safe mode"),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Status
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchdogStatus {
    pub id: WatchdogId,
    pub name: WatchdogName,
    pub category: WatchdogCategory,
    pub state: WatchdogState,
    pub enabled: bool,
    pub timeout_ms: u32,
    pub since_feed_ms: u64,
}

/// Per-watchdog state with registry totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusReport {
    pub registered: u32,
    pub active: u32,
    pub healthy: bool,
    pub safe_mode: bool,
    pub watchdogs: Vec<WatchdogStatus>,
}

impl StatusReport {
    pub fn build<const N: usize>(registry: &WatchdogRegistry<N>, safe_mode: bool, now_ms: u64) -> Self {
        Self {
            registered: registry.count() as u32,
            active: registry.active_count() as u32,
            healthy: registry.is_healthy(),
            safe_mode,
            watchdogs: registry
                .iter()
                .map(|(id, r)| WatchdogStatus {
                    id,
                    name: r.config.name.clone(),
                    category: r.config.category,
                    state: r.state,
                    enabled: r.config.enabled,
                    timeout_ms: r.config.timeout_ms,
                    since_feed_ms: r.elapsed_ms(now_ms),
                })
                .collect(),
        }
    }

    pub fn log(&self) {
        info!("===== WATCHDOG STATUS =====");
        info!(
            "  registered: {}  active: {}  healthy: {}  safe mode: {}",
            self.registered, self.active, self.healthy, self.safe_mode
        );
        for w in &self.watchdogs {
            info!(
                "  [{}] {}: {} timeout={} ms since_feed={} ms",
                w.id, w.name, w.state, w.timeout_ms, w.since_feed_ms
            );
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Detailed statistics
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchdogCounters {
    pub id: WatchdogId,
    pub name: WatchdogName,
    pub feed_count: u32,
    pub timeout_count: u32,
    pub last_timeout_ms: u64,
}

/// Global counters plus per-watchdog feed and timeout counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedStats {
    pub global: GlobalStats,
    pub watchdogs: Vec<WatchdogCounters>,
}

impl DetailedStats {
    pub fn build<const N: usize>(registry: &WatchdogRegistry<N>, global: GlobalStats) -> Self {
        Self {
            global,
            watchdogs: registry
                .iter()
                .map(|(id, r)| WatchdogCounters {
                    id,
                    name: r.config.name.clone(),
                    feed_count: r.feed_count,
                    timeout_count: r.timeout_count,
                    last_timeout_ms: r.last_timeout_ms,
                })
                .collect(),
        }
    }

    pub fn log(&self) {
        let g = &self.global;
        info!("===== WATCHDOG STATISTICS =====");
        info!("  uptime: {} ms", g.uptime_ms);
        info!(
            "  timeouts: {}  resets: {}  last reset: {} ms",
            g.total_timeouts, g.total_resets, g.last_reset_ms
        );
        match g.reset_reason {
            Some(r) => info!("  reset reason: {}", r),
            None => info!("  reset reason: not captured"),
        }
        for w in &self.watchdogs {
            info!(
                "  [{}] {}: feeds={} timeouts={}",
                w.id, w.name, w.feed_count, w.timeout_count
            );
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Health
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthProblem {
    pub id: WatchdogId,
    pub name: WatchdogName,
    pub state: WatchdogState,
}

/// Healthy flag, problem list and a recommendation.
///
/// `healthy` is exactly `is_system_healthy()`: false iff an armed watchdog
/// is TIMEOUT or FAILED.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub status: HealthStatus,
    pub problems: Vec<HealthProblem>,
    pub warnings: u32,
    pub recommendation: Recommendation,
}

impl HealthReport {
    pub fn build<const N: usize>(registry: &WatchdogRegistry<N>, safe_mode: bool) -> Self {
        let problems: Vec<HealthProblem> = registry
            .iter()
            .filter(|(_, r)| r.is_faulted())
            .map(|(id, r)| HealthProblem {
                id,
                name: r.config.name.clone(),
                state: r.state,
            })
            .collect();
        let warnings = registry
            .iter()
            .filter(|(_, r)| r.config.enabled && r.state == WatchdogState::Warning)
            .count() as u32;

        let healthy = problems.is_empty();
        let status = if !healthy {
            HealthStatus::Faulted
        } else if safe_mode || warnings > 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        let recommendation = if !healthy {
            Recommendation::CheckTimedOutTasks
        } else if safe_mode {
            Recommendation::LeaveSafeMode
        } else {
            Recommendation::None
        };

        Self {
            healthy,
            status,
            problems,
            warnings,
            recommendation,
        }
    }

    pub fn log(&self) {
        info!("===== SYSTEM HEALTH =====");
        info!("  status: {}", self.status);
        for p in &self.problems {
            warn!("  problem: {} {} is {}", p.id, p.name, p.state);
        }
        info!("  recommendation: {}", self.recommendation);
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
