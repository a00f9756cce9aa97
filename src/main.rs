//! ChargeGW firmware: main entry point.
//!
//! Composition root for the watchdog supervisor.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  PlatformAdapter   LogEventSink   NvsAdapter   Esp32Time       │
//! │  (System+Task)     AlertOutput    (Config+NVS) (Clock)         │
//! │                    (EventSink)                                 │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │              WatchdogManager (pure logic)              │    │
//! │  │  Registry · Detector · Actions · Stats                 │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! │                                                                │
//! │  FeedQueue (lock-free pulses) · HardwareWatchdog (TWDT)        │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::time::Duration;

use anyhow::Result;
use esp_idf_hal::gpio::PinDriver;
use esp_idf_hal::peripherals::Peripherals;
use log::{info, warn};

use chargegw::adapters::log_sink::LogEventSink;
use chargegw::adapters::nvs::NvsAdapter;
use chargegw::adapters::platform::PlatformAdapter;
use chargegw::adapters::system::Esp32System;
use chargegw::adapters::tasks::TaskRestartRegistry;
use chargegw::adapters::time::Esp32TimeAdapter;
use chargegw::app::ports::{Clock, ConfigPort};
use chargegw::config::SupervisorConfig;
use chargegw::diagnostics::TimeoutLog;
use chargegw::drivers::alert_patterns::AlertOutput;
use chargegw::drivers::watchdog::HardwareWatchdog;
use chargegw::pulse::FeedQueue;
use chargegw::watchdog::{GlobalTimeoutCallback, WatchdogManager};

/// Feed pulses from the uplink thread.
static FEED_QUEUE: FeedQueue = FeedQueue::new();

/// Persist the timeout log every this many ticks when it has grown.
const LOG_SAVE_EVERY_TICKS: u32 = 30;

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ChargeGW v{}                        ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Load config from NVS (or defaults) ─────────────────
    let mut nvs = match NvsAdapter::new() {
        Ok(n) => Some(n),
        Err(e) => {
            warn!("NVS init failed ({}), running with defaults and no persistence", e);
            None
        }
    };
    let config = match nvs.as_ref().map(|n| n.load()) {
        Some(Ok(cfg)) => {
            info!("Config loaded from NVS");
            cfg
        }
        Some(Err(e)) => {
            warn!("NVS config load failed ({}), using defaults", e);
            SupervisorConfig::default()
        }
        None => SupervisorConfig::default(),
    };
    for w in config.budget_warnings() {
        warn!("Config: {}", w);
    }

    // ── 3. Hardware task watchdog + alert indicator ───────────
    let twdt = HardwareWatchdog::new(config.hw_watchdog_timeout_ms);
    let peripherals = Peripherals::take()?;
    let alert = AlertOutput::new(PinDriver::output(peripherals.pins.gpio2)?)?;

    // ── 4. Platform adapters ──────────────────────────────────
    let mut platform = PlatformAdapter::new(Esp32System::new(), TaskRestartRegistry::new());
    let mut sink = (LogEventSink::new(), alert);
    let clock = Esp32TimeAdapter::new();

    // ── 5. Supervisor ─────────────────────────────────────────
    let mut supervisor: WatchdogManager<Esp32TimeAdapter> =
        WatchdogManager::new(Esp32TimeAdapter::new(), config.clone()).with_feed_queue(&FEED_QUEUE);
    supervisor.init(&platform, &mut sink)?;
    supervisor.set_global_timeout_callback(GlobalTimeoutCallback::new(|id| {
        warn!("Supervisor: watchdog {} timed out", id);
    }));

    if supervisor.last_reset_reason().is_some_and(|r| r.is_watchdog()) {
        if let Some(store) = nvs.as_ref() {
            for entry in TimeoutLog::read_all(store) {
                warn!(
                    "Previous boot: '{}' timed out at {} ms ({}, count {})",
                    entry.name, entry.at_ms, entry.action, entry.timeout_count
                );
            }
        }
    }

    if config.debug_mode {
        let report = supervisor.run_self_test(&mut platform, &mut sink);
        info!("Self test: {}", if report.passed() { "PASS" } else { "FAIL" });
    }

    // ── 6. Uplink thread: feeds the COMMUNICATION watchdog ────
    if let Some(comm_id) = supervisor.communication_id() {
        let uplink_period = Duration::from_millis(u64::from(config.comm_timeout_ms / 4));
        std::thread::Builder::new()
            .name("uplink".into())
            .stack_size(4096)
            .spawn(move || {
                let clock = Esp32TimeAdapter::new();
                loop {
                    if !FEED_QUEUE.push(comm_id, clock.now_ms()) {
                        warn!("Uplink: feed queue full");
                    }
                    std::thread::sleep(uplink_period);
                }
            })?;
    }

    info!("System ready. Entering supervisory loop.");

    // ── 7. Supervisory loop ───────────────────────────────────
    let mut last_ms = clock.now_ms();
    let mut ticks: u32 = 0;
    let mut saved_len = 0usize;

    loop {
        if let Err(e) = supervisor.feed_main_loop() {
            warn!("Main loop feed rejected: {}", e);
        }
        supervisor.tick(&mut platform, &mut sink);

        let now = clock.now_ms();
        let delta = now.saturating_sub(last_ms) as u32;
        last_ms = now;
        if let Err(e) = sink.1.tick(delta) {
            warn!("Alert output: {:?}", e);
        }

        ticks = ticks.wrapping_add(1);
        if ticks % LOG_SAVE_EVERY_TICKS == 0 {
            let len = supervisor.timeout_log().len();
            if len != saved_len {
                if let Some(store) = nvs.as_mut() {
                    match supervisor.save_logs(store) {
                        Ok(_) => saved_len = len,
                        Err(e) => warn!("Timeout log save failed: {}", e),
                    }
                }
            }
            supervisor.print_health_report();
        }

        twdt.feed();
        std::thread::sleep(Duration::from_millis(u64::from(config.tick_interval_ms)));
    }
}
