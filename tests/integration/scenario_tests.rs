//! End-to-end supervision scenarios on a simulated clock.

use chargegw::app::events::WatchdogEvent;
use chargegw::app::ports::Clock;
use chargegw::error::WatchdogError;
use chargegw::watchdog::{
    MAX_WATCHDOGS, RecoveryAction, WatchdogCategory, WatchdogConfig, WatchdogState,
};

use crate::mock_hw::{bare, booted, run_for};

fn log_watchdog(name: &str, timeout_ms: u32) -> WatchdogConfig {
    WatchdogConfig::new(name, WatchdogCategory::Task, timeout_ms)
        .unwrap()
        .with_action(RecoveryAction::Log)
}

#[test]
fn regular_feeding_never_times_out() {
    let (mut mgr, clock, mut platform, mut sink) = bare();
    let id = mgr.register(log_watchdog("ocpp", 30_000)).unwrap();

    for _ in 0..100 {
        clock.advance(1_000);
        if clock.now_ms() % 10_000 == 0 {
            mgr.feed(id).unwrap();
        }
        mgr.tick(&mut platform, &mut sink);
        assert!(mgr.state(id).unwrap().is_monitoring());
    }

    let info = mgr.info(id).unwrap();
    assert_eq!(info.timeout_count, 0);
    assert_eq!(info.feed_count, 10);
    assert_eq!(sink.count(|e| matches!(e, WatchdogEvent::Warning { .. })), 0);
}

#[test]
fn feeding_below_fractional_warning_mark_stays_quiet() {
    let (mut mgr, clock, mut platform, mut sink) = bare();
    // 80 % of 1001 ms is 800.8 ms, so an 800 ms feed period is fast enough.
    let id = mgr.register(log_watchdog("display", 1_001)).unwrap();

    for _ in 0..3 {
        clock.advance(800);
        mgr.tick(&mut platform, &mut sink);
        assert_eq!(mgr.state(id).unwrap(), WatchdogState::Enabled);
        mgr.feed(id).unwrap();
    }
    assert_eq!(sink.count(|e| matches!(e, WatchdogEvent::Warning { .. })), 0);

    clock.advance(801);
    mgr.tick(&mut platform, &mut sink);
    assert_eq!(mgr.state(id).unwrap(), WatchdogState::Warning);
}

#[test]
fn unfed_watchdog_times_out_once_and_logs_once() {
    let (mut mgr, clock, mut platform, mut sink) = bare();
    let id = mgr
        .register(log_watchdog("meter", 1_000).with_auto_reset(false))
        .unwrap();

    clock.advance(1_500);
    mgr.tick(&mut platform, &mut sink);

    assert_eq!(mgr.state(id).unwrap(), WatchdogState::Timeout);
    assert_eq!(mgr.info(id).unwrap().timeout_count, 1);
    assert_eq!(sink.count(|e| matches!(e, WatchdogEvent::ActionLogged { .. })), 1);

    // Remaining in TIMEOUT does not fire again.
    run_for(&mut mgr, &clock, &mut platform, &mut sink, 5_000, 1_000);
    assert_eq!(mgr.info(id).unwrap().timeout_count, 1);
    assert_eq!(sink.count(|e| matches!(e, WatchdogEvent::Timeout { .. })), 1);
    assert_eq!(sink.count(|e| matches!(e, WatchdogEvent::ActionLogged { .. })), 1);
    assert_eq!(mgr.stats().total_timeouts, 1);
}

#[test]
fn auto_reset_counts_each_missed_interval() {
    let (mut mgr, clock, mut platform, mut sink) = bare();
    let id = mgr.register(log_watchdog("display", 500)).unwrap();

    clock.advance(500);
    mgr.tick(&mut platform, &mut sink);
    assert_eq!(mgr.info(id).unwrap().timeout_count, 1);
    assert_eq!(mgr.state(id).unwrap(), WatchdogState::Enabled);

    clock.advance(500);
    mgr.tick(&mut platform, &mut sink);
    assert_eq!(mgr.info(id).unwrap().timeout_count, 2);
    assert_eq!(sink.count(|e| matches!(e, WatchdogEvent::AutoReset { .. })), 2);
}

#[test]
fn safe_mode_spares_only_the_main_loop() {
    let (mut mgr, clock, mut platform, mut sink) = booted();
    let ocpp = mgr
        .register(
            WatchdogConfig::new("ocpp", WatchdogCategory::Communication, 1_000)
                .unwrap()
                .with_action(RecoveryAction::SafeMode),
        )
        .unwrap();
    let meter = mgr.register(log_watchdog("meter", 5_000)).unwrap();
    let main = mgr.main_loop_id().unwrap();
    let comm = mgr.communication_id().unwrap();

    clock.advance(1_000);
    mgr.tick(&mut platform, &mut sink);

    assert!(mgr.is_safe_mode());
    assert_eq!(mgr.state(main).unwrap(), WatchdogState::Enabled);
    for id in [ocpp, meter, comm] {
        assert_eq!(mgr.state(id).unwrap(), WatchdogState::Disabled);
        assert!(!mgr.info(id).unwrap().config.enabled);
    }
    assert_eq!(mgr.active_count(), 1);
    assert!(sink.events.contains(&WatchdogEvent::SafeModeEntered { disabled: 3 }));
    // The triggering watchdog stays disarmed rather than auto-resetting.
    assert_eq!(sink.count(|e| matches!(e, WatchdogEvent::AutoReset { .. })), 0);
}

#[test]
fn full_registry_rejects_and_keeps_counters() {
    let (mut mgr, clock, _platform, _sink) = bare();
    let mut ids = Vec::new();
    for i in 0..MAX_WATCHDOGS {
        ids.push(mgr.register(log_watchdog(&format!("task{i}"), 5_000)).unwrap());
    }
    clock.advance(100);
    mgr.feed(ids[3]).unwrap();

    assert_eq!(
        mgr.register(log_watchdog("overflow", 5_000)),
        Err(WatchdogError::RegistryFull)
    );
    assert_eq!(mgr.registry().count(), MAX_WATCHDOGS);
    assert_eq!(mgr.info(ids[3]).unwrap().feed_count, 1);
    assert_eq!(mgr.info(ids[3]).unwrap().last_feed_ms, 100);
}

#[test]
fn unregistered_id_is_reused_with_fresh_counters() {
    let (mut mgr, clock, mut platform, mut sink) = bare();
    let first = mgr.register(log_watchdog("ocpp", 1_000)).unwrap();
    clock.advance(1_000);
    mgr.tick(&mut platform, &mut sink);
    mgr.feed(first).unwrap();
    assert_eq!(mgr.info(first).unwrap().timeout_count, 1);

    mgr.unregister(first).unwrap();
    assert_eq!(mgr.info(first).unwrap_err(), WatchdogError::InvalidId);

    let second = mgr.register(log_watchdog("meter", 1_000)).unwrap();
    assert_eq!(second, first);
    let info = mgr.info(second).unwrap();
    assert_eq!(info.timeout_count, 0);
    assert_eq!(info.feed_count, 0);
    // Global totals survive the unregistration.
    assert_eq!(mgr.stats().total_timeouts, 1);
}

#[test]
fn warning_precedes_timeout_on_a_fine_tick() {
    let (mut mgr, clock, mut platform, mut sink) = bare();
    let id = mgr
        .register(log_watchdog("meter", 1_000).with_auto_reset(false))
        .unwrap();

    run_for(&mut mgr, &clock, &mut platform, &mut sink, 800, 100);
    assert_eq!(mgr.state(id).unwrap(), WatchdogState::Warning);
    assert_eq!(sink.count(|e| matches!(e, WatchdogEvent::Warning { .. })), 1);

    mgr.feed(id).unwrap();
    assert_eq!(mgr.state(id).unwrap(), WatchdogState::Enabled);

    run_for(&mut mgr, &clock, &mut platform, &mut sink, 1_000, 100);
    assert_eq!(mgr.state(id).unwrap(), WatchdogState::Timeout);
    assert_eq!(sink.count(|e| matches!(e, WatchdogEvent::Warning { .. })), 2);
}

#[test]
fn health_tracks_faulted_watchdogs_only() {
    let (mut mgr, clock, mut platform, mut sink) = bare();
    let id = mgr
        .register(log_watchdog("meter", 1_000).with_auto_reset(false))
        .unwrap();
    assert!(mgr.is_system_healthy());

    clock.advance(1_000);
    mgr.tick(&mut platform, &mut sink);
    assert!(!mgr.is_system_healthy());
    let report = mgr.health_report();
    assert!(!report.healthy);
    assert_eq!(report.problems.len(), 1);
    assert_eq!(report.problems[0].id, id);

    // A disarmed record no longer counts against health.
    mgr.enable(id, false).unwrap();
    assert!(mgr.is_system_healthy());
}

#[test]
fn disabled_watchdog_is_ignored_by_the_scan() {
    let (mut mgr, clock, mut platform, mut sink) = bare();
    let id = mgr
        .register(log_watchdog("meter", 1_000).with_enabled(false))
        .unwrap();
    assert_eq!(mgr.feed(id), Err(WatchdogError::InvalidState));

    run_for(&mut mgr, &clock, &mut platform, &mut sink, 10_000, 1_000);
    assert_eq!(mgr.state(id).unwrap(), WatchdogState::Disabled);
    assert!(sink.events.is_empty());

    mgr.enable(id, true).unwrap();
    assert_eq!(mgr.info(id).unwrap().last_feed_ms, 10_000);
}
