//! Charging-station gateway firmware library: watchdog supervision.
//!
//! Exposes the pure-logic modules for integration testing and external
//! inspection. All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod app;
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod pulse;
pub mod watchdog;

pub mod adapters;
pub mod drivers;
