//! Timeout event log.
//!
//! Keeps the last 8 TIMEOUT transitions in RAM and persists them on demand
//! as a single postcard blob under the "wdt" NVS namespace, so the history
//! survives the restart a `RESET_SYSTEM` action triggers.

use serde::{Deserialize, Serialize};

use crate::app::ports::{StorageError, StoragePort};
use crate::watchdog::{RecoveryAction, WatchdogCategory, WatchdogId, WatchdogName};

pub const TIMEOUT_LOG_SLOTS: usize = 8;
const LOG_NAMESPACE: &str = "wdt";
const LOG_KEY: &str = "timeouts";
/// Upper bound on the encoded ring; a full ring of max-length names fits.
const LOG_BLOB_MAX: usize = 768;

/// One recorded TIMEOUT transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutEntry {
    pub at_ms: u64,
    pub id: WatchdogId,
    pub name: WatchdogName,
    pub category: WatchdogCategory,
    pub action: RecoveryAction,
    pub elapsed_ms: u64,
    /// The record's `timeout_count` after this entry.
    pub timeout_count: u32,
}

/// In-RAM ring of recent timeouts. Oldest entries are overwritten.
#[derive(Debug, Default)]
pub struct TimeoutLog {
    entries: heapless::Deque<TimeoutEntry, TIMEOUT_LOG_SLOTS>,
    /// Entries dropped because the ring was full.
    overwritten: u32,
}

impl TimeoutLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entry: TimeoutEntry) {
        if self.entries.is_full() {
            self.entries.pop_front();
            self.overwritten = self.overwritten.saturating_add(1);
        }
        // Cannot fail: a slot was freed above.
        let _ = self.entries.push_back(entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn overwritten(&self) -> u32 {
        self.overwritten
    }

    /// Oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &TimeoutEntry> {
        self.entries.iter()
    }

    pub fn clear_ram(&mut self) {
        self.entries.clear();
        self.overwritten = 0;
    }

    /// Persist the ring. Returns the number of entries written.
    pub fn save(&self, nvs: &mut dyn StoragePort) -> Result<usize, StorageError> {
        let mut snapshot: heapless::Vec<TimeoutEntry, TIMEOUT_LOG_SLOTS> = heapless::Vec::new();
        for e in &self.entries {
            let _ = snapshot.push(e.clone());
        }
        let mut buf = [0u8; LOG_BLOB_MAX];
        let bytes = postcard::to_slice(&snapshot, &mut buf).map_err(|_| StorageError::Encoding)?;
        nvs.write(LOG_NAMESPACE, LOG_KEY, bytes)?;
        Ok(snapshot.len())
    }

    /// Read the persisted ring. Missing or corrupt blobs yield an empty list.
    pub fn read_all(nvs: &dyn StoragePort) -> heapless::Vec<TimeoutEntry, TIMEOUT_LOG_SLOTS> {
        let mut buf = [0u8; LOG_BLOB_MAX];
        match nvs.read(LOG_NAMESPACE, LOG_KEY, &mut buf) {
            Ok(len) => Self::decode(&buf[..len]).unwrap_or_default(),
            Err(_) => heapless::Vec::new(),
        }
    }

    /// Erase the persisted ring.
    pub fn clear(nvs: &mut dyn StoragePort) -> Result<(), StorageError> {
        nvs.delete(LOG_NAMESPACE, LOG_KEY)
    }

    /// Decode a persisted blob.
    pub fn decode(
        bytes: &[u8],
    ) -> Result<heapless::Vec<TimeoutEntry, TIMEOUT_LOG_SLOTS>, StorageError> {
        postcard::from_bytes(bytes).map_err(|_| StorageError::Encoding)
    }
}
