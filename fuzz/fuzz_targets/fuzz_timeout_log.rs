//! Fuzz target: persisted timeout log
//!
//! Feeds arbitrary bytes to the NVS blob decoder and through `read_all`,
//! verifying:
//! - No panics under arbitrary byte inputs
//! - A decoded log never holds more than `TIMEOUT_LOG_SLOTS` (8) entries
//! - Whatever decodes re-encodes and decodes to the same entries
//!
//! cargo fuzz run fuzz_timeout_log

#![no_main]

use libfuzzer_sys::fuzz_target;
use chargegw::diagnostics::{TIMEOUT_LOG_SLOTS, TimeoutLog};

// ── In-memory StoragePort for fuzz testing ────────────────────

use chargegw::app::ports::{StorageError, StoragePort};
use std::collections::HashMap;

struct MemStore {
    data: HashMap<String, Vec<u8>>,
}

impl MemStore {
    fn new() -> Self {
        Self { data: HashMap::new() }
    }
}

impl StoragePort for MemStore {
    fn read(&self, ns: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        match self.data.get(&format!("{ns}::{key}")) {
            Some(v) => {
                let n = v.len().min(buf.len());
                buf[..n].copy_from_slice(&v[..n]);
                Ok(n)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, ns: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.data.insert(format!("{ns}::{key}"), data.to_vec());
        Ok(())
    }

    fn delete(&mut self, ns: &str, key: &str) -> Result<(), StorageError> {
        self.data.remove(&format!("{ns}::{key}"));
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    // Direct decode.
    if let Ok(entries) = TimeoutLog::decode(data) {
        assert!(entries.len() <= TIMEOUT_LOG_SLOTS);

        // Re-record and persist what decoded; it must read back unchanged.
        let mut log = TimeoutLog::new();
        for e in &entries {
            log.record(e.clone());
        }
        let mut store = MemStore::new();
        if log.save(&mut store).is_ok() {
            let back = TimeoutLog::read_all(&store);
            assert_eq!(back, entries, "persisted log did not round-trip");
        }
    }

    // Through the storage path, as a corrupted NVS blob would arrive.
    let mut store = MemStore::new();
    store.write("wdt", "timeouts", data).unwrap();
    let entries = TimeoutLog::read_all(&store);
    assert!(entries.len() <= TIMEOUT_LOG_SLOTS);

    TimeoutLog::clear(&mut store).unwrap();
    assert!(TimeoutLog::read_all(&store).is_empty());
});
