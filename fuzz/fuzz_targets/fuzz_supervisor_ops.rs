//! Fuzz target: supervisor operation sequences
//!
//! Interprets the input as a stream of register / unregister / enable /
//! feed / advance / tick / recover operations against a small registry,
//! verifying:
//! - No panics (RESET_SYSTEM is never configured, so restart is unreachable)
//! - `count()` never exceeds the capacity
//! - `is_system_healthy()` always matches the records' states
//! - `timeout_count` never decreases between ticks
//!
//! cargo fuzz run fuzz_supervisor_ops

#![no_main]

use std::cell::Cell;
use std::rc::Rc;

use chargegw::app::events::WatchdogEvent;
use chargegw::app::ports::{
    Clock, EventSink, ResetReason, SystemPort, TaskPort, TaskRestartError,
};
use chargegw::config::SupervisorConfig;
use chargegw::watchdog::{
    RecoveryAction, WatchdogCategory, WatchdogConfig, WatchdogId, WatchdogManager, WatchdogState,
};
use libfuzzer_sys::fuzz_target;

const SLOTS: usize = 4;

#[derive(Clone, Default)]
struct FuzzClock(Rc<Cell<u64>>);

impl Clock for FuzzClock {
    fn now_ms(&self) -> u64 {
        self.0.get()
    }
}

struct Hooks {
    fail_tasks: bool,
}

impl SystemPort for Hooks {
    fn reset_reason(&self) -> ResetReason {
        ResetReason::PowerOn
    }
    fn restart(&mut self, reason: &str) -> ! {
        panic!("restart reached: {reason}");
    }
}

impl TaskPort for Hooks {
    fn restart_task(&mut self, _name: &str) -> Result<(), TaskRestartError> {
        if self.fail_tasks {
            Err(TaskRestartError::RestartFailed)
        } else {
            Ok(())
        }
    }
}

struct NullSink;

impl EventSink for NullSink {
    fn emit(&mut self, _event: &WatchdogEvent) {}
}

const ACTIONS: [RecoveryAction; 5] = [
    RecoveryAction::None,
    RecoveryAction::Log,
    RecoveryAction::ResetTask,
    RecoveryAction::SafeMode,
    RecoveryAction::Custom,
];

fuzz_target!(|data: &[u8]| {
    let clock = FuzzClock::default();
    let mut mgr: WatchdogManager<FuzzClock, SLOTS> =
        WatchdogManager::new(clock.clone(), SupervisorConfig::default());
    let mut hooks = Hooks { fail_tasks: false };
    let mut sink = NullSink;

    // Bootstrap needs two slots; the main loop's RESET_SYSTEM action is
    // replaced by unregistering it straight away.
    if mgr.init(&hooks, &mut sink).is_err() {
        return;
    }
    if let Some(id) = mgr.main_loop_id() {
        let _ = mgr.unregister(id);
    }

    let mut counts = [0u32; SLOTS];
    for chunk in data.chunks(3) {
        let [op, a, b] = match chunk {
            [op, a, b] => [*op, *a, *b],
            _ => break,
        };
        let id = WatchdogId::new(a % (SLOTS as u8 + 1));
        match op % 8 {
            0 => {
                let timeout = 100 + u32::from(b) * 20;
                let name = format!("w{}", a % 8);
                if let Ok(cfg) = WatchdogConfig::new(&name, WatchdogCategory::Task, timeout) {
                    let cfg = cfg
                        .with_action(ACTIONS[usize::from(b) % ACTIONS.len()])
                        .with_auto_reset(b & 1 == 0);
                    let _ = mgr.register(cfg);
                }
            }
            1 => {
                if mgr.unregister(id).is_ok() {
                    counts[id.index()] = 0;
                }
            }
            2 => {
                let _ = mgr.enable(id, b & 1 == 1);
            }
            3 => {
                let _ = mgr.feed(id);
            }
            4 => clock.0.set(clock.0.get() + u64::from(b) * 10),
            5 => mgr.tick(&mut hooks, &mut sink),
            6 => {
                hooks.fail_tasks = b & 1 == 1;
                let _ = mgr.attempt_recovery(id, &mut hooks, &mut sink);
            }
            _ => {
                let _ = mgr.feed_all();
            }
        }

        assert!(mgr.registry().count() <= SLOTS);
        let faulted = mgr.registry().iter().any(|(_, r)| {
            r.config.enabled && matches!(r.state, WatchdogState::Timeout | WatchdogState::Failed)
        });
        assert_eq!(mgr.is_system_healthy(), !faulted);

        for (wid, r) in mgr.registry().iter() {
            let slot = &mut counts[wid.index()];
            assert!(r.timeout_count >= *slot, "timeout_count went backwards");
            *slot = r.timeout_count;
        }
    }
});
