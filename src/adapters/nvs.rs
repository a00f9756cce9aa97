//! NVS (Non-Volatile Storage) adapter.
//!
//! [`NvsAdapter`] is both the [`ConfigPort`] and the [`StoragePort`] of the
//! supervisor. The config is a single postcard blob under
//! `chargegw/wdtcfg`; the timeout log brings its own namespace and key.
//!
//! - **`target_os = "espidf"`**: every call opens its namespace through
//!   `EspNvs` on the default partition. A blob write is committed atomically.
//! - **`not(target_os = "espidf")`**: a `RefCell<HashMap>` stands in for
//!   flash, so the adapter works in host tests.

use log::{info, warn};

use crate::app::ports::{ConfigError, ConfigPort, StorageError, StoragePort};
use crate::config::SupervisorConfig;

#[cfg(target_os = "espidf")]
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::{ESP_ERR_NVS_NOT_ENOUGH_SPACE, EspError, esp_err_t};

#[cfg(not(target_os = "espidf"))]
use std::cell::RefCell;
#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

const CONFIG_NAMESPACE: &str = "chargegw";
const CONFIG_KEY: &str = "wdtcfg";
/// Encoded `SupervisorConfig` is at most 32 bytes of varints.
const CONFIG_BLOB_MAX: usize = 64;

pub struct NvsAdapter {
    #[cfg(target_os = "espidf")]
    partition: EspDefaultNvsPartition,
    #[cfg(not(target_os = "espidf"))]
    store: RefCell<HashMap<(String, String), Vec<u8>>>,
}

impl NvsAdapter {
    /// Take the default NVS partition.
    ///
    /// ESP-IDF erases and re-initialises the partition on first boot or
    /// after a layout version change. Call once per boot.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            let partition = EspDefaultNvsPartition::take().map_err(|e| {
                warn!("NvsAdapter: default partition unavailable: {}", e);
                ConfigError::IoError
            })?;
            info!("NvsAdapter: ESP-IDF NVS ready");
            Ok(Self { partition })
        }

        #[cfg(not(target_os = "espidf"))]
        {
            info!("NvsAdapter: simulation backend");
            Ok(Self {
                store: RefCell::new(HashMap::new()),
            })
        }
    }

    #[cfg(target_os = "espidf")]
    fn open(&self, namespace: &str) -> Result<EspNvs<NvsDefault>, StorageError> {
        EspNvs::new(self.partition.clone(), namespace, true).map_err(|e| {
            warn!("NvsAdapter: cannot open '{}': {}", namespace, e);
            StorageError::IoError
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn slot(namespace: &str, key: &str) -> (String, String) {
        (namespace.to_owned(), key.to_owned())
    }

    fn read_blob(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        #[cfg(target_os = "espidf")]
        {
            match self.open(namespace)?.get_blob(key, buf) {
                Ok(Some(data)) => Ok(data.len()),
                Ok(None) => Err(StorageError::NotFound),
                Err(e) => {
                    warn!("NvsAdapter: read {}/{} failed: {}", namespace, key, e);
                    Err(StorageError::IoError)
                }
            }
        }

        #[cfg(not(target_os = "espidf"))]
        {
            let store = self.store.borrow();
            let data = store
                .get(&Self::slot(namespace, key))
                .ok_or(StorageError::NotFound)?;
            let len = data.len().min(buf.len());
            buf[..len].copy_from_slice(&data[..len]);
            Ok(len)
        }
    }

    fn write_blob(&self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        #[cfg(target_os = "espidf")]
        {
            self.open(namespace)?
                .set_blob(key, data)
                .map_err(|e: EspError| {
                    if e.code() == ESP_ERR_NVS_NOT_ENOUGH_SPACE as esp_err_t {
                        StorageError::Full
                    } else {
                        warn!("NvsAdapter: write {}/{} failed: {}", namespace, key, e);
                        StorageError::IoError
                    }
                })
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.store
                .borrow_mut()
                .insert(Self::slot(namespace, key), data.to_vec());
            Ok(())
        }
    }

    fn erase_blob(&self, namespace: &str, key: &str) -> Result<(), StorageError> {
        #[cfg(target_os = "espidf")]
        {
            self.open(namespace)?
                .remove(key)
                .map(|_| ())
                .map_err(|_| StorageError::IoError)
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.store.borrow_mut().remove(&Self::slot(namespace, key));
            Ok(())
        }
    }
}

impl ConfigPort for NvsAdapter {
    /// Stored config, or the defaults when nothing is stored or flash is
    /// unreadable. A stored blob that decodes but fails validation is an
    /// error, never silently clamped.
    fn load(&self) -> Result<SupervisorConfig, ConfigError> {
        let mut buf = [0u8; CONFIG_BLOB_MAX];
        let len = match self.read_blob(CONFIG_NAMESPACE, CONFIG_KEY, &mut buf) {
            Ok(len) => len,
            Err(StorageError::NotFound) => {
                info!("NvsAdapter: no stored supervisor config, using defaults");
                return Ok(SupervisorConfig::default());
            }
            Err(e) => {
                warn!("NvsAdapter: config read failed ({}), using defaults", e);
                return Ok(SupervisorConfig::default());
            }
        };

        let cfg: SupervisorConfig =
            postcard::from_bytes(&buf[..len]).map_err(|_| ConfigError::Corrupted)?;
        cfg.validate()?;
        info!("NvsAdapter: loaded supervisor config ({} bytes)", len);
        Ok(cfg)
    }

    fn save(&self, config: &SupervisorConfig) -> Result<(), ConfigError> {
        config.validate()?;
        let mut buf = [0u8; CONFIG_BLOB_MAX];
        let bytes = postcard::to_slice(config, &mut buf).map_err(|_| ConfigError::IoError)?;
        let len = bytes.len();

        self.write_blob(CONFIG_NAMESPACE, CONFIG_KEY, bytes)
            .map_err(|e| match e {
                StorageError::Full => ConfigError::StorageFull,
                _ => ConfigError::IoError,
            })?;
        info!("NvsAdapter: supervisor config saved ({} bytes)", len);
        Ok(())
    }
}

impl StoragePort for NvsAdapter {
    fn read(&self, namespace: &str, key: &str, buf: &mut [u8]) -> Result<usize, StorageError> {
        self.read_blob(namespace, key, buf)
    }

    fn write(&mut self, namespace: &str, key: &str, data: &[u8]) -> Result<(), StorageError> {
        self.write_blob(namespace, key, data)
    }

    fn delete(&mut self, namespace: &str, key: &str) -> Result<(), StorageError> {
        self.erase_blob(namespace, key)
    }
}
