//! Fixed-capacity watchdog slot table.
//!
//! Slots are a plain array indexed by [`WatchdogId`]; free-slot search and
//! name lookup are linear scans, which is cheaper than any map at N = 16.
//! Every accessor validates range and occupancy before touching a record.

use log::debug;

use super::{WatchdogConfig, WatchdogId, WatchdogRecord, WatchdogState};
use crate::error::{Result, WatchdogError};

/// Default registry capacity.
pub const MAX_WATCHDOGS: usize = 16;

/// Smallest timeout any registry accepts, whatever the configured minimum.
///
/// From 5 ms up the rounded-up 80 % warning threshold is at least 1 ms
/// below the timeout, so WARNING and TIMEOUT never coincide.
pub const TIMEOUT_FLOOR_MS: u32 = 5;

/// Owns every registered [`WatchdogRecord`].
#[derive(Debug)]
pub struct WatchdogRegistry<const N: usize = MAX_WATCHDOGS> {
    slots: [Option<WatchdogRecord>; N],
    count: usize,
    /// Registrations with a shorter timeout are rejected.
    min_timeout_ms: u32,
}

impl<const N: usize> WatchdogRegistry<N> {
    pub fn new(min_timeout_ms: u32) -> Self {
        const { assert!(N > 0 && N <= u8::MAX as usize, "capacity must fit a u8 id") };
        Self {
            slots: core::array::from_fn(|_| None),
            count: 0,
            min_timeout_ms: min_timeout_ms.max(TIMEOUT_FLOOR_MS),
        }
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Number of occupied slots.
    pub fn count(&self) -> usize {
        self.count
    }

    pub fn min_timeout_ms(&self) -> u32 {
        self.min_timeout_ms
    }

    // ── Lifecycle ─────────────────────────────────────────────────

    /// Store `config` in the lowest free slot.
    ///
    /// On `RegistryFull` (or any validation error) nothing is modified.
    pub fn register(&mut self, config: WatchdogConfig, now_ms: u64) -> Result<WatchdogId> {
        self.validate(&config)?;

        let index = self
            .slots
            .iter()
            .position(Option::is_none)
            .ok_or(WatchdogError::RegistryFull)?;

        debug!(
            "WDT registry: '{}' -> slot {} ({} ms, {:?})",
            config.name, index, config.timeout_ms, config.action
        );
        self.slots[index] = Some(WatchdogRecord::new(config, now_ms));
        self.count += 1;
        Ok(WatchdogId::new(index as u8))
    }

    /// Free the slot. The id may be reused by a later registration.
    pub fn unregister(&mut self, id: WatchdogId) -> Result<WatchdogRecord> {
        let slot = self
            .slots
            .get_mut(id.index())
            .ok_or(WatchdogError::InvalidId)?;
        let mut record = slot.take().ok_or(WatchdogError::InvalidId)?;
        record.registered = false;
        record.state = WatchdogState::Disabled;
        self.count -= 1;
        debug!("WDT registry: slot {} freed ('{}')", id.index(), record.config.name);
        Ok(record)
    }

    /// Arm or disarm. Arming resets the baseline and clears any state.
    pub fn enable(&mut self, id: WatchdogId, enabled: bool, now_ms: u64) -> Result<()> {
        self.get_mut(id)?.set_enabled(enabled, now_ms);
        Ok(())
    }

    /// Record a liveness signal.
    ///
    /// `InvalidState` when the record is not ENABLED or WARNING; the record
    /// is left untouched in that case.
    pub fn feed(&mut self, id: WatchdogId, now_ms: u64) -> Result<()> {
        if self.get_mut(id)?.feed(now_ms) {
            Ok(())
        } else {
            Err(WatchdogError::InvalidState)
        }
    }

    /// Feed every registered, armed record. Returns how many accepted it.
    pub fn feed_all(&mut self, now_ms: u64) -> usize {
        self.slots
            .iter_mut()
            .flatten()
            .filter(|r| r.config.enabled)
            .map(|r| r.feed(now_ms))
            .filter(|fed| *fed)
            .count()
    }

    // ── Queries ───────────────────────────────────────────────────

    pub fn lookup_by_name(&self, name: &str) -> Result<WatchdogId> {
        self.iter()
            .find(|(_, r)| r.config.name.as_str() == name)
            .map(|(id, _)| id)
            .ok_or(WatchdogError::InvalidName)
    }

    pub fn get(&self, id: WatchdogId) -> Result<&WatchdogRecord> {
        self.slots
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or(WatchdogError::InvalidId)
    }

    pub(crate) fn get_mut(&mut self, id: WatchdogId) -> Result<&mut WatchdogRecord> {
        self.slots
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(WatchdogError::InvalidId)
    }

    /// Snapshot of one record.
    pub fn info(&self, id: WatchdogId) -> Result<WatchdogRecord> {
        self.get(id).cloned()
    }

    pub fn state(&self, id: WatchdogId) -> Result<WatchdogState> {
        self.get(id).map(|r| r.state)
    }

    pub fn is_registered(&self, id: WatchdogId) -> bool {
        self.get(id).is_ok()
    }

    /// Occupied slots in id order.
    pub fn iter(&self) -> impl Iterator<Item = (WatchdogId, &WatchdogRecord)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|r| (WatchdogId::new(i as u8), r)))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = (WatchdogId, &mut WatchdogRecord)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(i, s)| s.as_mut().map(|r| (WatchdogId::new(i as u8), r)))
    }

    /// Registered and armed.
    pub fn active_count(&self) -> usize {
        self.iter().filter(|(_, r)| r.is_active()).count()
    }

    /// `false` iff any armed record is TIMEOUT or FAILED.
    pub fn is_healthy(&self) -> bool {
        !self.iter().any(|(_, r)| r.is_faulted())
    }

    // ── Internal ──────────────────────────────────────────────────

    fn validate(&self, config: &WatchdogConfig) -> Result<()> {
        if config.name.is_empty() {
            return Err(WatchdogError::InvalidConfig("name must not be empty"));
        }
        if config.timeout_ms == 0 {
            return Err(WatchdogError::InvalidConfig("timeout must be > 0"));
        }
        if config.timeout_ms < self.min_timeout_ms {
            return Err(WatchdogError::InvalidConfig("timeout below minimum"));
        }
        if self.lookup_by_name(&config.name).is_ok() {
            return Err(WatchdogError::DuplicateName);
        }
        Ok(())
    }
}
