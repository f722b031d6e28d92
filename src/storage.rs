//! # Parameter Storage Module
//!
//! Persistent key-value store for calibration parameters.
//!
//! Values survive power cycles. A key that cannot be restored is created with
//! its default value, and restored values are always clamped to the caller's
//! bounds, so an out-of-range parameter never reaches the control pipeline.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

use crate::error::{Result, YokeError};

/// Key of the lower end of the throttle calibration range
pub const KEY_THROTTLE_MIN: &str = "throttleMin";
/// Key of the upper end of the throttle calibration range
pub const KEY_THROTTLE_MAX: &str = "throttleMax";
/// Key of the pitch zero reference
pub const KEY_PITCH_REFERENCE: &str = "pitchReference";
/// Key of the roll zero reference
pub const KEY_ROLL_REFERENCE: &str = "rollReference";
/// Key of the yaw zero reference
pub const KEY_YAW_REFERENCE: &str = "yawReference";

/// Storage collaborator interface
#[cfg_attr(test, mockall::automock)]
pub trait Storage: Send {
    /// Store a key-value pair
    fn store(&mut self, key: &str, value: f32) -> Result<()>;

    /// Look up a raw value without creating or clamping it
    fn get(&self, key: &str) -> Option<f32>;

    /// Restore the value of `key`, clamped to `min..=max`
    ///
    /// A missing key is created with `default`.
    fn restore(&mut self, key: &str, default: f32, min: f32, max: f32) -> f32 {
        let value = match self.get(key) {
            Some(value) => value,
            None => {
                error!("Parameter {} not found, using default {}", key, default);
                if let Err(e) = self.store(key, default) {
                    error!("Parameter {} store error: {}", key, e);
                }
                default
            }
        };

        if value > max {
            max
        } else if value < min {
            min
        } else {
            value
        }
    }
}

/// Volatile store, used when no parameter file is configured and in tests
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    values: BTreeMap<String, f32>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStore {
    fn store(&mut self, key: &str, value: f32) -> Result<()> {
        self.values.insert(key.to_string(), value);
        Ok(())
    }

    fn get(&self, key: &str) -> Option<f32> {
        self.values.get(key).copied()
    }
}

/// Store backed by a JSON file holding the whole parameter map
///
/// The file is rewritten on every [`Storage::store`]; parameters are only
/// written when a calibration session ends, never from the periodic handler.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    values: BTreeMap<String, f32>,
}

impl JsonFileStore {
    /// Open the parameter file, starting empty if it does not exist yet
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let contents = fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            warn!("Parameter file {} not found, starting empty", path.display());
            BTreeMap::new()
        };

        debug!("Opened parameter store {} ({} keys)", path.display(), values.len());
        Ok(Self { path, values })
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let contents = serde_json::to_string_pretty(&self.values)?;
        fs::write(&self.path, contents)
            .map_err(|e| YokeError::Storage(format!("Failed to write {}: {}", self.path.display(), e)))
    }
}

impl Storage for JsonFileStore {
    fn store(&mut self, key: &str, value: f32) -> Result<()> {
        self.values.insert(key.to_string(), value);
        self.flush()
    }

    fn get(&self, key: &str) -> Option<f32> {
        self.values.get(key).copied()
    }
}
