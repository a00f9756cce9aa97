//! Recovery actions, the terminal restart path and `attempt_recovery`.

use chargegw::app::events::WatchdogEvent;
use chargegw::error::WatchdogError;
use chargegw::watchdog::{
    CallbackOutcome, RecoveryAction, WatchdogCallback, WatchdogCategory, WatchdogConfig,
    WatchdogState,
};

use crate::mock_hw::{bare, booted, expect_restart};

fn task(name: &str, action: RecoveryAction) -> WatchdogConfig {
    WatchdogConfig::new(name, WatchdogCategory::Task, 1_000)
        .unwrap()
        .with_action(action)
}

#[test]
fn unfed_main_loop_restarts_the_system() {
    let (mut mgr, clock, mut platform, mut sink) = booted();
    clock.advance(30_000);

    expect_restart(|| mgr.tick(&mut platform, &mut sink));

    assert_eq!(platform.restarts, vec!["Watchdog timeout: MainLoop".to_string()]);
    assert_eq!(mgr.stats().total_resets, 1);
    assert_eq!(mgr.stats().last_reset_ms, 30_000);
    assert!(sink.events.iter().any(|e| matches!(
        e,
        WatchdogEvent::SystemResetRequested { reason } if reason.as_str() == "Watchdog timeout: MainLoop"
    )));
}

#[test]
fn fed_main_loop_never_restarts() {
    let (mut mgr, clock, mut platform, mut sink) = booted();
    for _ in 0..120 {
        clock.advance(1_000);
        mgr.feed_main_loop().unwrap();
        mgr.feed_communication().unwrap();
        mgr.tick(&mut platform, &mut sink);
    }
    assert!(platform.restarts.is_empty());
    assert_eq!(mgr.stats().total_timeouts, 0);
}

#[test]
fn force_system_reset_counts_and_restarts() {
    let (mut mgr, clock, mut platform, mut sink) = booted();
    clock.advance(7_000);

    expect_restart(|| mgr.force_system_reset(&mut platform, &mut sink, "operator request"));

    assert_eq!(platform.restarts, vec!["operator request".to_string()]);
    assert_eq!(mgr.stats().total_resets, 1);
    assert_eq!(mgr.stats().last_reset_ms, 7_000);
}

#[test]
fn reset_task_invokes_the_named_hook() {
    let (mut mgr, clock, mut platform, mut sink) = bare();
    let id = mgr.register(task("ocpp", RecoveryAction::ResetTask)).unwrap();

    clock.advance(1_000);
    mgr.tick(&mut platform, &mut sink);

    assert_eq!(platform.task_restarts, vec!["ocpp".to_string()]);
    assert!(sink.events.iter().any(|e| matches!(e, WatchdogEvent::TaskRestarted { .. })));
    assert_eq!(mgr.state(id).unwrap(), WatchdogState::Enabled);
}

#[test]
fn failed_task_restart_marks_failed_until_recovered() {
    let (mut mgr, clock, mut platform, mut sink) = bare();
    platform.broken_tasks.push("ocpp");
    let id = mgr.register(task("ocpp", RecoveryAction::ResetTask)).unwrap();

    clock.advance(1_000);
    mgr.tick(&mut platform, &mut sink);
    assert_eq!(mgr.state(id).unwrap(), WatchdogState::Failed);
    assert!(!mgr.is_system_healthy());

    // FAILED is not re-evaluated by the scan.
    clock.advance(5_000);
    mgr.tick(&mut platform, &mut sink);
    assert_eq!(mgr.info(id).unwrap().timeout_count, 1);

    assert_eq!(mgr.attempt_recovery(id, &mut platform, &mut sink), Ok(false));
    assert_eq!(mgr.state(id).unwrap(), WatchdogState::Failed);
    assert!(sink.events.contains(&WatchdogEvent::RecoveryFailed { id }));

    platform.broken_tasks.clear();
    assert_eq!(mgr.attempt_recovery(id, &mut platform, &mut sink), Ok(true));
    let info = mgr.info(id).unwrap();
    assert_eq!(info.state, WatchdogState::Enabled);
    assert_eq!(info.last_feed_ms, 6_000);
    assert!(mgr.is_system_healthy());
    assert_eq!(platform.task_restarts.len(), 3);
}

#[test]
fn recovery_from_timeout_rearms() {
    let (mut mgr, clock, mut platform, mut sink) = bare();
    let id = mgr
        .register(task("meter", RecoveryAction::Log).with_auto_reset(false))
        .unwrap();

    clock.advance(1_000);
    mgr.tick(&mut platform, &mut sink);
    assert_eq!(mgr.state(id).unwrap(), WatchdogState::Timeout);

    assert_eq!(mgr.attempt_recovery(id, &mut platform, &mut sink), Ok(true));
    assert_eq!(mgr.state(id).unwrap(), WatchdogState::Enabled);
    assert!(sink.events.contains(&WatchdogEvent::RecoveryStarted { id }));
    assert!(sink.events.contains(&WatchdogEvent::Recovered { id }));
}

#[test]
fn recovery_requires_a_fault_state() {
    let (mut mgr, _clock, mut platform, mut sink) = bare();
    let id = mgr.register(task("meter", RecoveryAction::Log)).unwrap();
    assert_eq!(
        mgr.attempt_recovery(id, &mut platform, &mut sink),
        Err(WatchdogError::InvalidState)
    );
    assert_eq!(
        mgr.attempt_recovery(chargegw::watchdog::WatchdogId::new(9), &mut platform, &mut sink),
        Err(WatchdogError::InvalidId)
    );
}

#[test]
fn failing_custom_callback_moves_to_failed() {
    let (mut mgr, clock, mut platform, mut sink) = bare();
    let id = mgr
        .register(
            task("relay", RecoveryAction::Custom)
                .with_callback(WatchdogCallback::new(|| CallbackOutcome::Failed)),
        )
        .unwrap();

    clock.advance(1_000);
    mgr.tick(&mut platform, &mut sink);

    assert_eq!(mgr.state(id).unwrap(), WatchdogState::Failed);
    assert!(sink.events.contains(&WatchdogEvent::CallbackFailed {
        id,
        name: chargegw::watchdog::make_name("relay").unwrap(),
    }));
    // Auto-reset does not apply to a failed action.
    assert_eq!(sink.count(|e| matches!(e, WatchdogEvent::AutoReset { .. })), 0);
}

#[test]
fn failed_callback_on_log_action_is_only_reported() {
    let (mut mgr, clock, mut platform, mut sink) = bare();
    let id = mgr
        .register(
            task("uplink", RecoveryAction::Log)
                .with_callback(WatchdogCallback::new(|| CallbackOutcome::Failed)),
        )
        .unwrap();

    clock.advance(1_000);
    mgr.tick(&mut platform, &mut sink);

    // LOG still runs and auto-reset re-arms the record.
    assert_eq!(mgr.state(id).unwrap(), WatchdogState::Enabled);
    assert_eq!(sink.count(|e| matches!(e, WatchdogEvent::ActionLogged { .. })), 1);
    assert_eq!(sink.count(|e| matches!(e, WatchdogEvent::CallbackFailed { .. })), 0);
    assert!(mgr.is_system_healthy());
}

#[test]
fn action_none_only_counts() {
    let (mut mgr, clock, mut platform, mut sink) = bare();
    let id = mgr.register(task("meter", RecoveryAction::None)).unwrap();

    clock.advance(1_000);
    mgr.tick(&mut platform, &mut sink);

    assert_eq!(mgr.info(id).unwrap().timeout_count, 1);
    assert_eq!(sink.count(|e| matches!(e, WatchdogEvent::ActionLogged { .. })), 0);
    assert!(platform.task_restarts.is_empty());
}

#[test]
fn timeout_log_keeps_the_most_recent_entries() {
    let (mut mgr, clock, mut platform, mut sink) = bare();
    mgr.register(task("meter", RecoveryAction::None)).unwrap();

    for _ in 0..10 {
        clock.advance(1_000);
        mgr.tick(&mut platform, &mut sink);
    }

    let log = mgr.timeout_log();
    assert_eq!(log.len(), 8);
    assert_eq!(log.overwritten(), 2);
    let counts: Vec<u32> = log.iter().map(|e| e.timeout_count).collect();
    assert_eq!(counts, (3..=10).collect::<Vec<u32>>());
}
