//! Peripheral drivers: alert indicator and hardware task watchdog.

pub mod alert_patterns;
pub mod watchdog;
