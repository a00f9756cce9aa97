//! System adapter: reset cause and full restart.
//!
//! Implements [`SystemPort`] on top of the ESP-IDF reset controller.
//!
//! - **`target_os = "espidf"`**: `esp_reset_reason()` / `esp_restart()`.
//! - **`not(target_os = "espidf")`**: the reset cause is injected at
//!   construction and a restart terminates the host process.

use log::error;

use crate::app::ports::{ResetReason, SystemPort};

#[derive(Debug)]
pub struct Esp32System {
    #[cfg(not(target_os = "espidf"))]
    simulated_reason: ResetReason,
}

impl Default for Esp32System {
    fn default() -> Self {
        Self::new()
    }
}

impl Esp32System {
    pub fn new() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            simulated_reason: ResetReason::PowerOn,
        }
    }

    /// Pretend the last boot was caused by `reason` (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn with_reset_reason(reason: ResetReason) -> Self {
        Self {
            simulated_reason: reason,
        }
    }
}

#[cfg(target_os = "espidf")]
fn map_reset_reason(raw: esp_idf_svc::sys::esp_reset_reason_t) -> ResetReason {
    use esp_idf_svc::sys::*;

    #[allow(non_upper_case_globals)]
    match raw {
        esp_reset_reason_t_ESP_RST_POWERON => ResetReason::PowerOn,
        esp_reset_reason_t_ESP_RST_EXT => ResetReason::External,
        esp_reset_reason_t_ESP_RST_SW => ResetReason::Software,
        esp_reset_reason_t_ESP_RST_PANIC => ResetReason::Panic,
        esp_reset_reason_t_ESP_RST_INT_WDT => ResetReason::InterruptWatchdog,
        esp_reset_reason_t_ESP_RST_TASK_WDT => ResetReason::TaskWatchdog,
        esp_reset_reason_t_ESP_RST_WDT => ResetReason::OtherWatchdog,
        esp_reset_reason_t_ESP_RST_DEEPSLEEP => ResetReason::DeepSleep,
        esp_reset_reason_t_ESP_RST_BROWNOUT => ResetReason::Brownout,
        // SDIO and anything newer than this table.
        _ => ResetReason::Unknown,
    }
}

impl SystemPort for Esp32System {
    fn reset_reason(&self) -> ResetReason {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: read-only query of a value latched at boot.
            map_reset_reason(unsafe { esp_idf_svc::sys::esp_reset_reason() })
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.simulated_reason
        }
    }

    fn restart(&mut self, reason: &str) -> ! {
        error!("SYSTEM RESTART: {}", reason);

        #[cfg(target_os = "espidf")]
        {
            // Give the UART a moment to flush the line above.
            esp_idf_hal::delay::FreeRtos::delay_ms(100);
            // SAFETY: esp_restart never returns.
            unsafe { esp_idf_svc::sys::esp_restart() }
        }

        #[cfg(not(target_os = "espidf"))]
        std::process::exit(1)
    }
}
