//! Watchdog manager: the supervisor's public face.
//!
//! [`WatchdogManager`] owns the registry, the global counters and the
//! timeout log. It is constructed explicitly by the composition root; there
//! is no process-wide instance, so tests can run as many as they like.
//!
//! ```text
//!  Clock ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!            │     WatchdogManager       │
//!  FeedQueue▶│ registry · stats · log    │ ──▶ SystemPort / TaskPort
//!            └──────────────────────────┘
//! ```
//!
//! All platform effects flow through ports passed at the call site, the
//! same way for `tick`, `attempt_recovery` and the self test.

use log::{Level, debug, error, info, log, warn};

use super::actions::{self, ActionExecutor, ActionOutcome};
use super::detector::{self, Transition};
use super::report::{DetailedStats, HealthReport, StatusReport};
use super::{
    CallbackOutcome, GlobalStats, GlobalTimeoutCallback, MAX_WATCHDOGS, RecoveryAction,
    StatsCollector, WatchdogCategory, WatchdogConfig, WatchdogId, WatchdogRecord,
    WatchdogRegistry, WatchdogState,
};
use crate::app::commands::{CommandReply, SupervisorCommand};
use crate::app::events::WatchdogEvent;
use crate::app::ports::{
    Clock, ConfigError, EventSink, ResetReason, StorageError, StoragePort, SystemPort,
    TaskPort, TaskRestartError,
};
use crate::config::SupervisorConfig;
use crate::diagnostics::{TimeoutEntry, TimeoutLog};
use crate::error::{Result, WatchdogError};
use crate::pulse::FeedQueue;

pub const MAIN_LOOP_NAME: &str = "MainLoop";
pub const COMMUNICATION_NAME: &str = "Communication";
const SELF_TEST_NAME: &str = "TestWatchdog";
const SELF_TEST_TIMEOUT_MS: u32 = 1_000;

/// Outcome of [`WatchdogManager::run_self_test`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelfTestReport {
    pub initialized: bool,
    pub system_watchdogs: bool,
    /// A temporary watchdog could be registered, timed out and removed.
    pub temporary_watchdog: bool,
}

impl SelfTestReport {
    pub fn passed(&self) -> bool {
        self.initialized && self.system_watchdogs && self.temporary_watchdog
    }
}

/// Watchdog supervisor for `N` slots.
pub struct WatchdogManager<C: Clock, const N: usize = MAX_WATCHDOGS> {
    clock: C,
    config: SupervisorConfig,
    registry: WatchdogRegistry<N>,
    stats: StatsCollector,
    timeout_log: TimeoutLog,
    feed_queue: Option<&'static FeedQueue>,
    global_callback: Option<GlobalTimeoutCallback>,
    initialized: bool,
    debug_mode: bool,
    safe_mode: bool,
    main_loop_id: Option<WatchdogId>,
    comm_id: Option<WatchdogId>,
}

impl<C: Clock, const N: usize> WatchdogManager<C, N> {
    /// Build an idle supervisor. Call [`init`](Self::init) before ticking.
    pub fn new(clock: C, config: SupervisorConfig) -> Self {
        let now = clock.now_ms();
        Self {
            registry: WatchdogRegistry::new(config.min_timeout_ms),
            stats: StatsCollector::new(now),
            timeout_log: TimeoutLog::new(),
            feed_queue: None,
            global_callback: None,
            initialized: false,
            debug_mode: config.debug_mode,
            safe_mode: false,
            main_loop_id: None,
            comm_id: None,
            clock,
            config,
        }
    }

    /// Drain `queue` at the start of every tick.
    pub fn with_feed_queue(mut self, queue: &'static FeedQueue) -> Self {
        self.feed_queue = Some(queue);
        self
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Validate the configuration, capture the reset reason and register the
    /// two mandatory watchdogs.
    ///
    /// Failure is a fatal configuration error: the supervisor stays
    /// uninitialised and `tick` remains a no-op.
    pub fn init(&mut self, system: &impl SystemPort, sink: &mut impl EventSink) -> Result<()> {
        if self.initialized {
            return Ok(());
        }
        info!("WDT: initialising supervisor ({} slots)", N);

        if let Err(ConfigError::ValidationFailed(msg)) = self.config.validate() {
            error!("WDT: rejected configuration: {}", msg);
            return Err(WatchdogError::InvalidConfig(msg));
        }

        let reset_reason = system.reset_reason();
        self.stats.capture_reset_reason(reset_reason);
        if reset_reason.is_watchdog() {
            warn!("WDT: last reset caused by a watchdog: {}", reset_reason);
        } else {
            info!("WDT: last reset: {}", reset_reason);
        }

        let main = self.register_main_loop(self.config.main_loop_timeout_ms);
        let comm = self.register_communication(self.config.comm_timeout_ms);
        if let Err(e) = main.and(comm) {
            error!("WDT: failed to register system watchdogs: {}", e);
            return Err(e);
        }

        self.initialized = true;
        sink.emit(&WatchdogEvent::Initialized { reset_reason });
        info!(
            "WDT: supervisor ready ({} watchdogs)",
            self.registry.count()
        );
        Ok(())
    }

    /// Disarm every watchdog and stop ticking.
    pub fn shutdown(&mut self, sink: &mut impl EventSink) {
        if !self.initialized {
            return;
        }
        self.enable_all(false);
        self.initialized = false;
        sink.emit(&WatchdogEvent::Shutdown);
        info!("WDT: supervisor stopped");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    // ── Periodic scan ─────────────────────────────────────────

    /// One supervisory cycle: apply queued pulses, then a single pass over
    /// every slot.
    ///
    /// Actions run inline, so a SAFE_MODE action disarms records later in
    /// the same pass before they are evaluated.
    pub fn tick(&mut self, hooks: &mut (impl SystemPort + TaskPort), sink: &mut impl EventSink) {
        if !self.initialized {
            return;
        }
        self.apply_pulses();

        let now = self.clock.now_ms();
        let level = self.trace_level();
        for index in 0..N {
            let id = WatchdogId::new(index as u8);
            let Ok(record) = self.registry.get_mut(id) else {
                continue;
            };
            match detector::evaluate(record, now) {
                None => {}
                Some(Transition::Warning { elapsed_ms }) => {
                    let name = record.config.name.clone();
                    let timeout_ms = record.config.timeout_ms;
                    log!(
                        level,
                        "WDT: '{}' warning ({} / {} ms)",
                        name,
                        elapsed_ms,
                        timeout_ms
                    );
                    sink.emit(&WatchdogEvent::Warning {
                        id,
                        name,
                        elapsed_ms,
                        timeout_ms,
                    });
                }
                Some(Transition::Timeout { elapsed_ms }) => {
                    self.handle_timeout(id, elapsed_ms, now, hooks, sink);
                }
            }
        }
    }

    /// Apply pending feed pulses. Returns how many were accepted.
    pub fn apply_pulses(&mut self) -> usize {
        let Some(queue) = self.feed_queue else {
            return 0;
        };
        let registry = &mut self.registry;
        let mut accepted = 0;
        queue.drain(|pulse| {
            if registry.feed(pulse.id, pulse.at_ms).is_ok() {
                accepted += 1;
            } else {
                debug!("WDT: pulse for {} ignored", pulse.id);
            }
        });
        accepted
    }

    // ── Registration ──────────────────────────────────────────

    pub fn register(&mut self, config: WatchdogConfig) -> Result<WatchdogId> {
        let now = self.clock.now_ms();
        let (name, timeout_ms, action) = (config.name.clone(), config.timeout_ms, config.action);
        match self.registry.register(config, now) {
            Ok(id) => {
                self.stats.record_registration();
                log!(
                    self.trace_level(),
                    "WDT: registered '{}' as {} ({} ms, {})",
                    name,
                    id,
                    timeout_ms,
                    action
                );
                Ok(id)
            }
            Err(e) => {
                warn!("WDT: cannot register '{}': {}", name, e);
                Err(e)
            }
        }
    }

    pub fn unregister(&mut self, id: WatchdogId) -> Result<()> {
        let record = self.registry.unregister(id)?;
        if self.main_loop_id == Some(id) {
            self.main_loop_id = None;
        }
        if self.comm_id == Some(id) {
            self.comm_id = None;
        }
        log!(self.trace_level(), "WDT: unregistered '{}'", record.config.name);
        Ok(())
    }

    /// MAIN_LOOP watchdog: action RESET_SYSTEM, auto-reset on.
    pub fn register_main_loop(&mut self, timeout_ms: u32) -> Result<WatchdogId> {
        let config = WatchdogConfig::new(MAIN_LOOP_NAME, WatchdogCategory::MainLoop, timeout_ms)?
            .with_action(RecoveryAction::ResetSystem);
        let id = self.register(config)?;
        self.main_loop_id = Some(id);
        Ok(id)
    }

    /// COMMUNICATION watchdog: action LOG, auto-reset on.
    pub fn register_communication(&mut self, timeout_ms: u32) -> Result<WatchdogId> {
        let config = WatchdogConfig::new(
            COMMUNICATION_NAME,
            WatchdogCategory::Communication,
            timeout_ms,
        )?
        .with_action(RecoveryAction::Log);
        let id = self.register(config)?;
        self.comm_id = Some(id);
        Ok(id)
    }

    /// TASK watchdog with the default action. `None` uses the global timeout.
    pub fn register_task(&mut self, name: &str, timeout_ms: Option<u32>) -> Result<WatchdogId> {
        let timeout_ms = timeout_ms.unwrap_or(self.config.task_timeout_ms);
        let config = WatchdogConfig::new(name, WatchdogCategory::Task, timeout_ms)?
            .with_action(self.config.task_action);
        self.register(config)
    }

    // ── Feeding / arming ──────────────────────────────────────

    pub fn feed(&mut self, id: WatchdogId) -> Result<()> {
        let now = self.clock.now_ms();
        self.registry.feed(id, now)
    }

    pub fn feed_all(&mut self) -> usize {
        let now = self.clock.now_ms();
        self.registry.feed_all(now)
    }

    pub fn feed_main_loop(&mut self) -> Result<()> {
        let id = self.main_loop_id.ok_or(WatchdogError::NotInitialized)?;
        self.feed(id)
    }

    pub fn feed_communication(&mut self) -> Result<()> {
        let id = self.comm_id.ok_or(WatchdogError::NotInitialized)?;
        self.feed(id)
    }

    pub fn feed_task(&mut self, name: &str) -> Result<()> {
        let id = self.registry.lookup_by_name(name)?;
        self.feed(id)
    }

    pub fn enable(&mut self, id: WatchdogId, enabled: bool) -> Result<()> {
        let now = self.clock.now_ms();
        self.registry.enable(id, enabled, now)?;
        log!(
            self.trace_level(),
            "WDT: {} {}",
            id,
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(())
    }

    /// Arm or disarm every registered watchdog. Returns how many changed.
    pub fn enable_all(&mut self, enabled: bool) -> usize {
        let now = self.clock.now_ms();
        let mut changed = 0;
        for (_, record) in self.registry.iter_mut() {
            if record.config.enabled != enabled {
                changed += 1;
            }
            record.set_enabled(enabled, now);
        }
        info!(
            "WDT: all watchdogs {}",
            if enabled { "enabled" } else { "disabled" }
        );
        changed
    }

    // ── Settings ──────────────────────────────────────────────

    /// Timeout used by later [`register_task`](Self::register_task) calls.
    pub fn set_global_timeout(&mut self, timeout_ms: u32) -> Result<()> {
        if timeout_ms < self.registry.min_timeout_ms() {
            return Err(WatchdogError::InvalidConfig("timeout below minimum"));
        }
        self.config.task_timeout_ms = timeout_ms;
        info!("WDT: global task timeout {} ms", timeout_ms);
        Ok(())
    }

    /// Action used by later [`register_task`](Self::register_task) calls.
    pub fn set_default_action(&mut self, action: RecoveryAction) {
        self.config.task_action = action;
        info!("WDT: default task action {}", action);
    }

    pub fn set_debug_mode(&mut self, enabled: bool) {
        self.debug_mode = enabled;
        info!("WDT: debug mode {}", if enabled { "on" } else { "off" });
    }

    pub fn set_global_timeout_callback(&mut self, callback: GlobalTimeoutCallback) {
        self.global_callback = Some(callback);
    }

    pub fn config(&self) -> &SupervisorConfig {
        &self.config
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn registry(&self) -> &WatchdogRegistry<N> {
        &self.registry
    }

    pub fn info(&self, id: WatchdogId) -> Result<WatchdogRecord> {
        self.registry.info(id)
    }

    pub fn state(&self, id: WatchdogId) -> Result<WatchdogState> {
        self.registry.state(id)
    }

    pub fn lookup_by_name(&self, name: &str) -> Result<WatchdogId> {
        self.registry.lookup_by_name(name)
    }

    pub fn main_loop_id(&self) -> Option<WatchdogId> {
        self.main_loop_id
    }

    pub fn communication_id(&self) -> Option<WatchdogId> {
        self.comm_id
    }

    pub fn stats(&self) -> GlobalStats {
        self.stats.snapshot(&self.registry, self.clock.now_ms())
    }

    pub fn is_system_healthy(&self) -> bool {
        self.registry.is_healthy()
    }

    pub fn active_count(&self) -> usize {
        self.registry.active_count()
    }

    /// Boot reset cause, `None` before `init`.
    pub fn last_reset_reason(&self) -> Option<ResetReason> {
        self.stats.reset_reason()
    }

    pub fn is_safe_mode(&self) -> bool {
        self.safe_mode
    }

    pub fn timeout_log(&self) -> &TimeoutLog {
        &self.timeout_log
    }

    // ── Recovery ──────────────────────────────────────────────

    /// Count the reset and restart the system. Never returns.
    pub fn force_system_reset(
        &mut self,
        system: &mut impl SystemPort,
        sink: &mut impl EventSink,
        reason: &str,
    ) -> ! {
        let now = self.clock.now_ms();
        actions::system_reset(&mut self.stats, now, system, sink, reason)
    }

    /// Disarm every non-MAIN_LOOP watchdog. Returns how many were disarmed.
    pub fn enter_safe_mode(&mut self, sink: &mut impl EventSink) -> usize {
        let now = self.clock.now_ms();
        actions::enter_safe_mode(&mut self.registry, &mut self.safe_mode, now, sink)
    }

    /// Re-run the action of a TIMEOUT or FAILED watchdog and re-arm it.
    ///
    /// `Ok(true)` when the record is ENABLED again, `Ok(false)` when the
    /// action failed and the record is FAILED.
    pub fn attempt_recovery(
        &mut self,
        id: WatchdogId,
        hooks: &mut (impl SystemPort + TaskPort),
        sink: &mut impl EventSink,
    ) -> Result<bool> {
        let now = self.clock.now_ms();
        let record = self.registry.get_mut(id)?;
        if !record.state.is_fault() {
            return Err(WatchdogError::InvalidState);
        }
        record.state = WatchdogState::Recovery;
        info!("WDT: recovering '{}'", record.config.name);
        sink.emit(&WatchdogEvent::RecoveryStarted { id });

        let outcome = self.executor(now).run(id, hooks, sink);

        let record = self.registry.get_mut(id)?;
        match outcome {
            ActionOutcome::Completed => {
                record.set_enabled(true, now);
                sink.emit(&WatchdogEvent::Recovered { id });
                Ok(true)
            }
            ActionOutcome::Failed => {
                record.state = WatchdogState::Failed;
                warn!("WDT: recovery of '{}' failed", record.config.name);
                sink.emit(&WatchdogEvent::RecoveryFailed { id });
                Ok(false)
            }
        }
    }

    /// Restart a subsystem through its registered hook.
    pub fn restart_task(
        &self,
        tasks: &mut impl TaskPort,
        name: &str,
    ) -> core::result::Result<(), TaskRestartError> {
        info!("WDT: restarting task '{}'", name);
        tasks.restart_task(name)
    }

    // ── Reports ───────────────────────────────────────────────

    pub fn status_report(&self) -> StatusReport {
        StatusReport::build(&self.registry, self.safe_mode, self.clock.now_ms())
    }

    pub fn detailed_stats(&self) -> DetailedStats {
        DetailedStats::build(&self.registry, self.stats())
    }

    pub fn health_report(&self) -> HealthReport {
        HealthReport::build(&self.registry, self.safe_mode)
    }

    pub fn print_status(&self) {
        self.status_report().log();
    }

    pub fn print_detailed_stats(&self) {
        self.detailed_stats().log();
    }

    pub fn print_health_report(&self) {
        self.health_report().log();
    }

    /// Zero global and per-record counters. The reset reason is kept.
    pub fn reset_stats(&mut self, sink: &mut impl EventSink) {
        let now = self.clock.now_ms();
        self.stats.reset(self.registry.count(), now);
        for (_, record) in self.registry.iter_mut() {
            record.reset_counters();
        }
        sink.emit(&WatchdogEvent::StatsReset);
        info!("WDT: statistics reset");
    }

    /// Persist the timeout log. Returns the number of entries written.
    pub fn save_logs(&self, storage: &mut dyn StoragePort) -> core::result::Result<usize, StorageError> {
        let written = self.timeout_log.save(storage)?;
        info!("WDT: saved {} timeout log entries", written);
        Ok(written)
    }

    // ── Self test ─────────────────────────────────────────────

    /// Force a timeout on `id` with action LOG, then restore its action and
    /// armed state.
    pub fn test_watchdog(
        &mut self,
        id: WatchdogId,
        hooks: &mut (impl SystemPort + TaskPort),
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let now = self.clock.now_ms();
        let record = self.registry.get_mut(id)?;
        let was_enabled = record.config.enabled;
        let original_action = record.config.action;
        info!("WDT: testing '{}'", record.config.name);

        record.config.action = RecoveryAction::Log;
        record.set_enabled(true, now);

        let result = self.simulate_timeout(id, hooks, sink);

        let record = self.registry.get_mut(id)?;
        record.config.action = original_action;
        record.set_enabled(was_enabled, self.clock.now_ms());
        result
    }

    /// Force the watchdog into TIMEOUT and run the normal timeout path.
    /// Only valid while the watchdog is ENABLED or WARNING.
    pub fn simulate_timeout(
        &mut self,
        id: WatchdogId,
        hooks: &mut (impl SystemPort + TaskPort),
        sink: &mut impl EventSink,
    ) -> Result<()> {
        let now = self.clock.now_ms();
        let record = self.registry.get_mut(id)?;
        if !record.config.enabled || !record.state.is_monitoring() {
            return Err(WatchdogError::InvalidState);
        }
        debug!("WDT: simulating timeout of '{}'", record.config.name);
        let elapsed_ms = record.elapsed_ms(now).max(record.timeout_ms());
        record.enter_timeout(now);

        self.handle_timeout(id, elapsed_ms, now, hooks, sink);
        Ok(())
    }

    /// Check initialisation, the system watchdogs and a temporary watchdog.
    pub fn run_self_test(
        &mut self,
        hooks: &mut (impl SystemPort + TaskPort),
        sink: &mut impl EventSink,
    ) -> SelfTestReport {
        info!("WDT: running self test");
        let initialized = self.initialized;
        let system_watchdogs = self.main_loop_id.is_some() && self.comm_id.is_some();

        let temporary_watchdog = match WatchdogConfig::new(
            SELF_TEST_NAME,
            WatchdogCategory::Custom,
            SELF_TEST_TIMEOUT_MS.max(self.registry.min_timeout_ms()),
        )
        .map(|c| c.with_auto_reset(false))
        .and_then(|c| self.register(c))
        {
            Ok(id) => {
                let tested = self.test_watchdog(id, hooks, sink);
                let removed = self.unregister(id);
                tested.and(removed).is_ok()
            }
            Err(_) => false,
        };

        let report = SelfTestReport {
            initialized,
            system_watchdogs,
            temporary_watchdog,
        };
        if report.passed() {
            info!("WDT: self test passed");
        } else {
            warn!("WDT: self test failed: {:?}", report);
        }
        report
    }

    // ── Commands ──────────────────────────────────────────────

    pub fn handle_command(
        &mut self,
        cmd: SupervisorCommand,
        hooks: &mut (impl SystemPort + TaskPort),
        sink: &mut impl EventSink,
    ) -> Result<CommandReply> {
        match cmd {
            SupervisorCommand::EnableAll(flag) => {
                self.enable_all(flag);
            }
            SupervisorCommand::SetDebugMode(flag) => self.set_debug_mode(flag),
            SupervisorCommand::SetGlobalTimeout(ms) => self.set_global_timeout(ms)?,
            SupervisorCommand::SetDefaultAction(action) => self.set_default_action(action),
            SupervisorCommand::ResetStats => self.reset_stats(sink),
            SupervisorCommand::EnterSafeMode => {
                self.enter_safe_mode(sink);
            }
            SupervisorCommand::Recover(id) => {
                return self
                    .attempt_recovery(id, hooks, sink)
                    .map(CommandReply::Recovered);
            }
            SupervisorCommand::SelfTest => {
                return Ok(CommandReply::SelfTest(self.run_self_test(hooks, sink)));
            }
        }
        Ok(CommandReply::Done)
    }

    // ── Internal ──────────────────────────────────────────────

    fn trace_level(&self) -> Level {
        if self.debug_mode { Level::Info } else { Level::Debug }
    }

    fn executor(&mut self, now_ms: u64) -> ActionExecutor<'_, N> {
        ActionExecutor {
            registry: &mut self.registry,
            stats: &mut self.stats,
            safe_mode: &mut self.safe_mode,
            now_ms,
        }
    }

    /// Everything that follows an entry into TIMEOUT, in order: counters
    /// and log, global callback, per-watchdog callback, action, auto-reset.
    ///
    /// For CUSTOM watchdogs the action is the callback, so it runs once.
    fn handle_timeout(
        &mut self,
        id: WatchdogId,
        elapsed_ms: u64,
        now: u64,
        hooks: &mut (impl SystemPort + TaskPort),
        sink: &mut impl EventSink,
    ) {
        let level = self.trace_level();
        let Ok(record) = self.registry.get(id) else {
            return;
        };
        let name = record.config.name.clone();
        let action = record.config.action;
        let callback = record.config.callback.clone();
        let timeout_count = record.timeout_count;

        self.stats.record_timeout();
        self.timeout_log.record(TimeoutEntry {
            at_ms: now,
            id,
            name: name.clone(),
            category: record.config.category,
            action,
            elapsed_ms,
            timeout_count,
        });
        warn!(
            "WDT: '{}' timed out after {} ms (count {}), action {}",
            name, elapsed_ms, timeout_count, action
        );
        sink.emit(&WatchdogEvent::Timeout {
            id,
            name,
            elapsed_ms,
            timeout_count,
            action,
        });

        if let Some(global) = &self.global_callback {
            global.invoke(id);
        }
        // Only a CUSTOM action turns a failed callback into FAILED.
        if action != RecoveryAction::Custom {
            if let Some(cb) = callback {
                if cb.invoke() == CallbackOutcome::Failed {
                    warn!("WDT: timeout callback of {} reported failure", id);
                }
            }
        }

        let outcome = self.executor(now).run(id, hooks, sink);

        let Ok(record) = self.registry.get_mut(id) else {
            return;
        };
        if outcome == ActionOutcome::Failed {
            record.state = WatchdogState::Failed;
            warn!("WDT: action {} failed for '{}'", action, record.config.name);
            return;
        }
        // SAFE_MODE may have disarmed the record; it stays DISABLED.
        if record.state == WatchdogState::Timeout && record.config.auto_reset {
            record.rearm(now);
            log!(level, "WDT: {} auto-reset", id);
            sink.emit(&WatchdogEvent::AutoReset { id });
        }
    }
}

impl<C: Clock, const N: usize> core::fmt::Debug for WatchdogManager<C, N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("WatchdogManager")
            .field("initialized", &self.initialized)
            .field("safe_mode", &self.safe_mode)
            .field("registered", &self.registry.count())
            .finish_non_exhaustive()
    }
}
