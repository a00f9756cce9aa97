//! Application boundary, zero I/O.
//!
//! The vocabulary the supervisor core shares with the outside world:
//! inbound [`commands`], outbound [`events`], and the [`ports`] every
//! platform effect goes through. Keeping these here lets the core be
//! exercised without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
