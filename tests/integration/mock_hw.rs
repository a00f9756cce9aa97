//! Mock platform adapters for integration tests.
//!
//! Records every port call so tests can assert on the full history
//! without touching the reset controller, NVS or a real timer.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::rc::Rc;

use chargegw::app::events::WatchdogEvent;
use chargegw::app::ports::{
    Clock, EventSink, ResetReason, StorageError, StoragePort, SystemPort, TaskPort,
    TaskRestartError,
};
use chargegw::config::SupervisorConfig;
use chargegw::watchdog::WatchdogManager;

// ── MockClock ─────────────────────────────────────────────────

/// Manually advanced clock. Clones share the same time.
#[derive(Clone, Default)]
pub struct MockClock(Rc<Cell<u64>>);

#[allow(dead_code)]
impl MockClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, ms: u64) {
        self.0.set(self.0.get() + ms);
    }

    pub fn set(&self, ms: u64) {
        self.0.set(ms);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

// ── MockPlatform ──────────────────────────────────────────────

/// System + task hooks. `restart` panics so the terminal path can be
/// observed with `catch_unwind`.
pub struct MockPlatform {
    pub reset_reason: ResetReason,
    pub restarts: Vec<String>,
    pub task_restarts: Vec<String>,
    /// Tasks whose restart hook reports failure.
    pub broken_tasks: Vec<&'static str>,
}

#[allow(dead_code)]
impl MockPlatform {
    pub fn new() -> Self {
        Self {
            reset_reason: ResetReason::PowerOn,
            restarts: Vec::new(),
            task_restarts: Vec::new(),
            broken_tasks: Vec::new(),
        }
    }

    pub fn with_reset_reason(reason: ResetReason) -> Self {
        Self {
            reset_reason: reason,
            ..Self::new()
        }
    }
}

impl Default for MockPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemPort for MockPlatform {
    fn reset_reason(&self) -> ResetReason {
        self.reset_reason
    }

    fn restart(&mut self, reason: &str) -> ! {
        self.restarts.push(reason.to_string());
        panic!("system restart: {reason}");
    }
}

impl TaskPort for MockPlatform {
    fn restart_task(&mut self, name: &str) -> Result<(), TaskRestartError> {
        self.task_restarts.push(name.to_string());
        if self.broken_tasks.iter().any(|t| *t == name) {
            Err(TaskRestartError::RestartFailed)
        } else {
            Ok(())
        }
    }
}

/// Run `f`, expecting it to end in `SystemPort::restart`.
#[allow(dead_code)]
pub fn expect_restart<F: FnOnce()>(f: F) {
    let result = catch_unwind(AssertUnwindSafe(f));
    assert!(result.is_err(), "expected a system restart");
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<WatchdogEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&WatchdogEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &WatchdogEvent) {
        self.events.push(event.clone());
    }
}

// ── MockNvs ───────────────────────────────────────────────────

#[derive(Default)]
pub struct MockNvs {
    store: RefCell<HashMap<String, Vec<u8>>>,
}

#[allow(dead_code)]
impl MockNvs {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoragePort for MockNvs {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        let k = format!("{}::{}", namespace, key);
        match self.store.borrow().get(&k) {
            Some(v) => {
                let n = v.len().min(buf.len());
                buf[..n].copy_from_slice(&v[..n]);
                Ok(n)
            }
            None => Err(StorageError::NotFound),
        }
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        let k = format!("{}::{}", namespace, key);
        self.store.borrow_mut().insert(k, data.to_vec());
        Ok(())
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.store
            .borrow_mut()
            .remove(&format!("{}::{}", namespace, key));
        Ok(())
    }
}

// ── Fixtures ──────────────────────────────────────────────────

pub type TestManager = WatchdogManager<MockClock>;

/// Uninitialised supervisor on a clock at t = 0.
#[allow(dead_code)]
pub fn manager() -> (TestManager, MockClock) {
    let clock = MockClock::new();
    let mgr = WatchdogManager::new(clock.clone(), SupervisorConfig::default());
    (mgr, clock)
}

/// Initialised supervisor with the two system watchdogs registered.
#[allow(dead_code)]
pub fn booted() -> (TestManager, MockClock, MockPlatform, RecordingSink) {
    let (mut mgr, clock) = manager();
    let platform = MockPlatform::new();
    let mut sink = RecordingSink::new();
    mgr.init(&platform, &mut sink).unwrap();
    (mgr, clock, platform, sink)
}

/// Advance in `step_ms` increments up to `total_ms`, ticking after each.
#[allow(dead_code)]
pub fn run_for(
    mgr: &mut TestManager,
    clock: &MockClock,
    platform: &mut MockPlatform,
    sink: &mut RecordingSink,
    total_ms: u64,
    step_ms: u64,
) {
    let mut elapsed = 0;
    while elapsed < total_ms {
        clock.advance(step_ms);
        elapsed += step_ms;
        mgr.tick(platform, sink);
    }
}

/// Initialised supervisor with the system watchdogs removed, so a scenario
/// only sees the watchdogs it registers itself.
#[allow(dead_code)]
pub fn bare() -> (TestManager, MockClock, MockPlatform, RecordingSink) {
    let (mut mgr, clock, platform, mut sink) = booted();
    for id in [mgr.main_loop_id(), mgr.communication_id()].into_iter().flatten() {
        mgr.unregister(id).unwrap();
    }
    sink.clear();
    (mgr, clock, platform, sink)
}
