//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to               |
//! |----------------|--------------------|---------------------------|
//! | `log_sink`     | EventSink          | Serial log output         |
//! | `nvs`          | ConfigPort         | NVS / in-memory store     |
//! |                | StoragePort        |                           |
//! | `platform`     | SystemPort         | `system` + `tasks` bundle |
//! |                | TaskPort           |                           |
//! | `system`       | SystemPort         | ESP32 reset controller    |
//! | `tasks`        | TaskPort           | Named restart hooks       |
//! | `time`         | Clock              | ESP32 system timer        |

pub mod log_sink;
pub mod nvs;
pub mod platform;
pub mod system;
pub mod tasks;
pub mod time;
