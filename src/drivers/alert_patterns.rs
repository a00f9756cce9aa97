//! Alert pattern engine for the fault indicator (LED or buzzer).
//!
//! Turns supervisor events into timed on/off patterns. Nothing here ever
//! sleeps: the host loop calls `tick(delta_ms)` and the engine derives the
//! output level from its phase, so the watchdog scan is never stalled by
//! a beep sequence.
//!
//! ## Priority hierarchy (highest first)
//!
//! 1. **Reset**: steady on until the restart happens
//! 2. **Fault**: rapid flash for 10 s after a timeout or failed action
//! 3. **Safe mode**: double blink, persistent
//! 4. **Warning**: slow blink for 5 s after a watchdog reaches 80 %
//!
//! ## Pattern types
//!
//! | Pattern      | Description                      | Rate   |
//! |--------------|----------------------------------|--------|
//! | Steady       | Constant on                      | n/a    |
//! | SlowBlink    | On/off square wave               | 1 Hz   |
//! | DoubleBlink  | Two quick pulses, then pause     | 1 Hz   |
//! | RapidFlash   | Very fast on/off                 | 8 Hz   |

use embedded_hal::digital::OutputPin;

use crate::app::events::WatchdogEvent;
use crate::app::ports::EventSink;

const FAULT_HOLD_MS: u32 = 10_000;
const WARNING_HOLD_MS: u32 = 5_000;

/// Pattern identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertPattern {
    Steady,
    SlowBlink,
    DoubleBlink,
    RapidFlash,
}

/// A pattern held for `remaining_ms`, or until cleared when `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct AlertRequest {
    pattern: AlertPattern,
    remaining_ms: Option<u32>,
}

impl AlertRequest {
    fn timed(pattern: AlertPattern, hold_ms: u32) -> Self {
        Self {
            pattern,
            remaining_ms: Some(hold_ms),
        }
    }

    fn persistent(pattern: AlertPattern) -> Self {
        Self {
            pattern,
            remaining_ms: None,
        }
    }

    /// Count down; returns `false` once expired.
    fn age(&mut self, delta_ms: u32) -> bool {
        match &mut self.remaining_ms {
            None => true,
            Some(ms) => {
                *ms = ms.saturating_sub(delta_ms);
                *ms > 0
            }
        }
    }
}

/// Alert pattern engine. Stack-allocated, no heap.
#[derive(Debug, Default)]
pub struct AlertPatternEngine {
    phase_ms: u32,
    active: Option<AlertPattern>,
    reset: Option<AlertRequest>,
    fault: Option<AlertRequest>,
    safe_mode: Option<AlertRequest>,
    warning: Option<AlertRequest>,
}

impl AlertPatternEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map one supervisor event onto the pattern layers.
    pub fn on_event(&mut self, event: &WatchdogEvent) {
        match event {
            WatchdogEvent::Warning { .. } => {
                self.warning = Some(AlertRequest::timed(AlertPattern::SlowBlink, WARNING_HOLD_MS));
            }
            WatchdogEvent::Timeout { .. }
            | WatchdogEvent::TaskRestartFailed { .. }
            | WatchdogEvent::CallbackFailed { .. }
            | WatchdogEvent::RecoveryFailed { .. } => {
                self.fault = Some(AlertRequest::timed(AlertPattern::RapidFlash, FAULT_HOLD_MS));
            }
            WatchdogEvent::SafeModeEntered { .. } => {
                self.safe_mode = Some(AlertRequest::persistent(AlertPattern::DoubleBlink));
            }
            WatchdogEvent::SystemResetRequested { .. } => {
                self.reset = Some(AlertRequest::persistent(AlertPattern::Steady));
            }
            WatchdogEvent::Recovered { .. } | WatchdogEvent::StatsReset => {
                self.fault = None;
            }
            WatchdogEvent::Shutdown => self.clear_all(),
            _ => {}
        }
    }

    /// Silence every layer.
    pub fn clear_all(&mut self) {
        self.reset = None;
        self.fault = None;
        self.safe_mode = None;
        self.warning = None;
        self.active = None;
        self.phase_ms = 0;
    }

    pub fn active_pattern(&self) -> Option<AlertPattern> {
        self.active
    }

    /// Advance the phase by `delta_ms` and return the output level.
    pub fn tick(&mut self, delta_ms: u32) -> bool {
        self.phase_ms = self.phase_ms.wrapping_add(delta_ms);

        for layer in [
            &mut self.reset,
            &mut self.fault,
            &mut self.safe_mode,
            &mut self.warning,
        ] {
            if let Some(req) = layer {
                if !req.age(delta_ms) {
                    *layer = None;
                }
            }
        }

        let selected = self
            .reset
            .or(self.fault)
            .or(self.safe_mode)
            .or(self.warning)
            .map(|r| r.pattern);
        if selected != self.active {
            self.phase_ms = 0;
        }
        self.active = selected;

        self.active.is_some_and(|p| self.level(p))
    }

    fn level(&self, pattern: AlertPattern) -> bool {
        match pattern {
            AlertPattern::Steady => true,
            AlertPattern::SlowBlink => (self.phase_ms % 1_000) < 500,
            AlertPattern::DoubleBlink => {
                let cycle = self.phase_ms % 1_000;
                cycle < 100 || (200..300).contains(&cycle)
            }
            AlertPattern::RapidFlash => (self.phase_ms % 125) < 63,
        }
    }
}

impl EventSink for AlertPatternEngine {
    fn emit(&mut self, event: &WatchdogEvent) {
        self.on_event(event);
    }
}

// ───────────────────────────────────────────────────────────────
// Pin output
// ───────────────────────────────────────────────────────────────

/// Drives an `embedded-hal` output pin from an [`AlertPatternEngine`].
pub struct AlertOutput<P: OutputPin> {
    engine: AlertPatternEngine,
    pin: P,
    level: bool,
}

impl<P: OutputPin> AlertOutput<P> {
    /// Takes the pin and drives it low.
    pub fn new(mut pin: P) -> Result<Self, P::Error> {
        pin.set_low()?;
        Ok(Self {
            engine: AlertPatternEngine::new(),
            pin,
            level: false,
        })
    }

    /// Advance the engine and write the pin only when the level changes.
    pub fn tick(&mut self, delta_ms: u32) -> Result<bool, P::Error> {
        let level = self.engine.tick(delta_ms);
        if level != self.level {
            if level {
                self.pin.set_high()?;
            } else {
                self.pin.set_low()?;
            }
            self.level = level;
        }
        Ok(level)
    }

    pub fn engine(&self) -> &AlertPatternEngine {
        &self.engine
    }
}

impl<P: OutputPin> EventSink for AlertOutput<P> {
    fn emit(&mut self, event: &WatchdogEvent) {
        self.engine.on_event(event);
    }
}
