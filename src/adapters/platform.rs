//! Platform adapter bundle.
//!
//! The supervisor takes its restart hooks as a single
//! `impl SystemPort + TaskPort`; this adapter pairs the reset controller
//! with the task hook table to satisfy both.

use crate::app::ports::{ResetReason, SystemPort, TaskPort, TaskRestartError};

use super::system::Esp32System;
use super::tasks::TaskRestartRegistry;

#[derive(Debug, Default)]
pub struct PlatformAdapter {
    pub system: Esp32System,
    pub tasks: TaskRestartRegistry,
}

impl PlatformAdapter {
    pub fn new(system: Esp32System, tasks: TaskRestartRegistry) -> Self {
        Self { system, tasks }
    }
}

impl SystemPort for PlatformAdapter {
    fn reset_reason(&self) -> ResetReason {
        self.system.reset_reason()
    }

    fn restart(&mut self, reason: &str) -> ! {
        self.system.restart(reason)
    }
}

impl TaskPort for PlatformAdapter {
    fn restart_task(&mut self, name: &str) -> Result<(), TaskRestartError> {
        self.tasks.restart_task(name)
    }
}
