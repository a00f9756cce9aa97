//! Named subsystem restart hooks.
//!
//! Implements [`TaskPort`] with a fixed table of `fn() -> bool` hooks keyed
//! by watchdog name. A `RESET_TASK` watchdog called "ocpp" restarts the
//! subsystem whose hook was registered as "ocpp".

use heapless::Vec;
use log::{info, warn};

use crate::app::ports::{TaskPort, TaskRestartError};
use crate::error::{Result, WatchdogError};
use crate::watchdog::{WatchdogName, make_name};

pub const MAX_TASK_HOOKS: usize = 8;

/// Restart hook: returns `true` if the subsystem came back.
pub type RestartHook = fn() -> bool;

#[derive(Debug, Default)]
pub struct TaskRestartRegistry {
    hooks: Vec<(WatchdogName, RestartHook), MAX_TASK_HOOKS>,
}

impl TaskRestartRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the hook for `name`.
    pub fn register(&mut self, name: &str, hook: RestartHook) -> Result<()> {
        if let Some(entry) = self.hooks.iter_mut().find(|(n, _)| n.as_str() == name) {
            entry.1 = hook;
            return Ok(());
        }
        let name = make_name(name)?;
        self.hooks
            .push((name, hook))
            .map_err(|_| WatchdogError::RegistryFull)
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl TaskPort for TaskRestartRegistry {
    fn restart_task(&mut self, name: &str) -> core::result::Result<(), TaskRestartError> {
        let Some((_, hook)) = self.hooks.iter().find(|(n, _)| n.as_str() == name) else {
            warn!("Tasks: no restart hook for '{}'", name);
            return Err(TaskRestartError::UnknownTask);
        };
        if hook() {
            info!("Tasks: '{}' restarted", name);
            Ok(())
        } else {
            warn!("Tasks: '{}' did not come back", name);
            Err(TaskRestartError::RestartFailed)
        }
    }
}
