//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`Storage`] for the sync client: device credential, client
//! config and the cache snapshot, all as short strings in one namespace.
//!
//! - **`target_os = "espidf"`** — ESP-IDF NVS string API
//!   (`nvs_get_str` / `nvs_set_str`), committed per write.
//! - **all other targets** — in-memory map for host-side tests.
//!
//! NVS limits keys to 15 bytes; longer keys are refused on both backends
//! so behaviour does not drift between host and device.

use log::{info, warn};

use crate::app::ports::{Storage, StorageError};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
use std::ffi::CString;

/// Namespace holding every key written by this crate.
pub const NAMESPACE: &str = "varsync";

/// Longest key NVS accepts.
pub const MAX_KEY_LEN: usize = 15;

#[allow(dead_code)]
const MAX_VALUE_SIZE: usize = 4000;

pub struct NvsAdapter {
    initialized: bool,
    #[cfg(not(target_os = "espidf"))]
    store: HashMap<String, String>,
}

impl NvsAdapter {
    pub fn new() -> Self {
        Self {
            initialized: false,
            #[cfg(not(target_os = "espidf"))]
            store: HashMap::new(),
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Keys must be 1..=15 bytes.
    pub fn check_key(key: &str) -> Result<(), StorageError> {
        if key.is_empty() || key.len() > MAX_KEY_LEN {
            return Err(StorageError::InvalidKey);
        }
        Ok(())
    }

    /// Open the namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let ns = CString::new(NAMESPACE).map_err(|_| ESP_ERR_INVALID_ARG)?;
        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        // SAFETY: `ns` is a valid NUL-terminated string for the call.
        let ret = unsafe { nvs_open(ns.as_ptr(), mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

impl Default for NvsAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Storage for NvsAdapter {
    fn initialize(&mut self) -> bool {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NvsAdapter: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK || unsafe { nvs_flash_init() } != ESP_OK {
                    return false;
                }
            } else if ret != ESP_OK {
                warn!("NvsAdapter: nvs_flash_init failed ({})", ret);
                return false;
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        self.initialized = true;
        true
    }

    fn save(&mut self, key: &str, value: &str) -> bool {
        if let Err(e) = Self::check_key(key) {
            warn!("NvsAdapter: refusing '{}': {} (1-{} bytes)", key, e, MAX_KEY_LEN);
            return false;
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.store.insert(key.to_string(), value.to_string());
            true
        }

        #[cfg(target_os = "espidf")]
        {
            if value.len() > MAX_VALUE_SIZE {
                warn!("NvsAdapter: value for '{}' too large ({} bytes)", key, value.len());
                return false;
            }
            let (Ok(k), Ok(v)) = (CString::new(key), CString::new(value)) else {
                return false;
            };
            let result = Self::with_nvs_handle(true, |handle| {
                let ret = unsafe { nvs_set_str(handle, k.as_ptr(), v.as_ptr()) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => true,
                Err(e) => {
                    warn!("NvsAdapter: write '{}' failed ({})", key, e);
                    false
                }
            }
        }
    }

    fn load(&self, key: &str) -> Option<String> {
        Self::check_key(key).ok()?;

        #[cfg(not(target_os = "espidf"))]
        {
            self.store.get(key).cloned()
        }

        #[cfg(target_os = "espidf")]
        {
            let k = CString::new(key).ok()?;
            let result = Self::with_nvs_handle(false, |handle| {
                // First call: get size (includes the NUL terminator).
                let mut size: usize = 0;
                let ret =
                    unsafe { nvs_get_str(handle, k.as_ptr(), core::ptr::null_mut(), &mut size) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                if size == 0 || size > MAX_VALUE_SIZE {
                    return Err(ESP_ERR_INVALID_SIZE);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_str(handle, k.as_ptr(), buf.as_mut_ptr().cast(), &mut size)
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                buf.truncate(size.saturating_sub(1));
                Ok(buf)
            });
            match result {
                Ok(bytes) => String::from_utf8(bytes).ok(),
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => None,
                Err(e) => {
                    warn!("NvsAdapter: read '{}' failed ({})", key, e);
                    None
                }
            }
        }
    }

    fn exists(&self, key: &str) -> bool {
        if Self::check_key(key).is_err() {
            return false;
        }

        #[cfg(not(target_os = "espidf"))]
        {
            self.store.contains_key(key)
        }

        #[cfg(target_os = "espidf")]
        {
            let Ok(k) = CString::new(key) else {
                return false;
            };
            Self::with_nvs_handle(false, |handle| {
                let ret = unsafe { nvs_find_key(handle, k.as_ptr(), core::ptr::null_mut()) };
                Ok(ret == ESP_OK)
            })
            .unwrap_or(false)
        }
    }
}
