//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{Result, YokeError};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub imu: ImuConfig,
    #[serde(default)]
    pub fusion: FusionConfig,
    #[serde(default)]
    pub controls: ControlsConfig,
    #[serde(default)]
    pub usb: UsbConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

/// Inertial sensor sampling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ImuConfig {
    /// Expected period of the data-ready interrupt
    #[serde(default = "default_sample_period_ms")]
    pub sample_period_ms: u64,

    /// Loss-of-interrupt watchdog period
    #[serde(default = "default_watchdog_period_ms")]
    pub watchdog_period_ms: u64,

    /// Depth of the control event queue
    #[serde(default = "default_queue_depth")]
    pub queue_depth: usize,
}

/// Complementary filter configuration
#[derive(Debug, Deserialize, Clone)]
pub struct FusionConfig {
    #[serde(default = "default_blend_factor")]
    pub blend_factor: f32,

    #[serde(default = "default_variability_smoothing")]
    pub variability_smoothing: f32,

    #[serde(default = "default_stationary_threshold")]
    pub stationary_threshold: f32,

    #[serde(default = "default_magnetic_yaw_gain")]
    pub magnetic_yaw_gain: f32,
}

/// Control mapping configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ControlsConfig {
    /// Deflection in radians mapped to full axis output
    #[serde(default = "default_full_scale_rad")]
    pub full_scale_rad: f32,

    #[serde(default = "default_gain_min")]
    pub gain_min: f32,

    #[serde(default = "default_gain_max")]
    pub gain_max: f32,

    #[serde(default = "default_gain_smoothing")]
    pub gain_smoothing: f32,

    /// Dead zone at each end of the throttle range, as a fraction of the span
    #[serde(default = "default_throttle_deadzone")]
    pub throttle_deadzone: f32,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

/// USB report link configuration
#[derive(Debug, Deserialize, Clone)]
pub struct UsbConfig {
    #[serde(default = "default_vendor_id")]
    pub vendor_id: u16,

    #[serde(default = "default_product_id")]
    pub product_id: u16,

    #[serde(default = "default_release")]
    pub release: u16,

    /// Serial device of the report link; empty selects the logging transport
    #[serde(default)]
    pub port: String,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,
}

/// Parameter storage configuration
#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: String,
}

/// Telemetry configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetryConfig {
    #[serde(default = "default_telemetry_enabled")]
    pub enabled: bool,

    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    #[serde(default = "default_max_records_per_file")]
    pub max_records_per_file: usize,

    #[serde(default = "default_max_files_to_keep")]
    pub max_files_to_keep: usize,

    #[serde(default = "default_log_interval_ms")]
    pub log_interval_ms: u64,
}

// Default value functions
fn default_sample_period_ms() -> u64 { 10 }
fn default_watchdog_period_ms() -> u64 { 15 }
fn default_queue_depth() -> usize { 8 }

fn default_blend_factor() -> f32 { 0.02 }
fn default_variability_smoothing() -> f32 { 0.02 }
fn default_stationary_threshold() -> f32 { 0.005 }
fn default_magnetic_yaw_gain() -> f32 { 1.0 }

fn default_full_scale_rad() -> f32 { 0.9 }
fn default_gain_min() -> f32 { 0.5 }
fn default_gain_max() -> f32 { 1.5 }
fn default_gain_smoothing() -> f32 { 0.1 }
fn default_throttle_deadzone() -> f32 { 0.02 }
fn default_debounce_ms() -> u64 { 10 }

fn default_vendor_id() -> u16 { 0x0483 }
fn default_product_id() -> u16 { 0x5711 }
fn default_release() -> u16 { 0x0001 }
fn default_baud_rate() -> u32 { 115_200 }

fn default_storage_path() -> String { "./yoke-params.json".to_string() }

fn default_telemetry_enabled() -> bool { false }
fn default_log_dir() -> String { "./logs".to_string() }
fn default_max_records_per_file() -> usize { 10000 }
fn default_max_files_to_keep() -> usize { 10 }
fn default_log_interval_ms() -> u64 { 100 }

impl Default for ImuConfig {
    fn default() -> Self {
        Self {
            sample_period_ms: default_sample_period_ms(),
            watchdog_period_ms: default_watchdog_period_ms(),
            queue_depth: default_queue_depth(),
        }
    }
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            blend_factor: default_blend_factor(),
            variability_smoothing: default_variability_smoothing(),
            stationary_threshold: default_stationary_threshold(),
            magnetic_yaw_gain: default_magnetic_yaw_gain(),
        }
    }
}

impl Default for ControlsConfig {
    fn default() -> Self {
        Self {
            full_scale_rad: default_full_scale_rad(),
            gain_min: default_gain_min(),
            gain_max: default_gain_max(),
            gain_smoothing: default_gain_smoothing(),
            throttle_deadzone: default_throttle_deadzone(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for UsbConfig {
    fn default() -> Self {
        Self {
            vendor_id: default_vendor_id(),
            product_id: default_product_id(),
            release: default_release(),
            port: String::new(),
            baud_rate: default_baud_rate(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            enabled: default_telemetry_enabled(),
            log_dir: default_log_dir(),
            max_records_per_file: default_max_records_per_file(),
            max_files_to_keep: default_max_files_to_keep(),
            log_interval_ms: default_log_interval_ms(),
        }
    }
}

impl ImuConfig {
    /// Sample period as a [`Duration`]
    pub fn sample_period(&self) -> Duration {
        Duration::from_millis(self.sample_period_ms)
    }

    /// Watchdog period as a [`Duration`]
    pub fn watchdog_period(&self) -> Duration {
        Duration::from_millis(self.watchdog_period_ms)
    }
}

fn invalid(message: impl std::fmt::Display) -> YokeError {
    YokeError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use yoke_imu::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        // Sampling and watchdog timing
        if self.imu.sample_period_ms == 0 || self.imu.sample_period_ms > 1000 {
            return Err(invalid("sample_period_ms must be between 1 and 1000"));
        }

        if self.imu.watchdog_period_ms <= self.imu.sample_period_ms
            || self.imu.watchdog_period_ms > 4 * self.imu.sample_period_ms
        {
            return Err(invalid(
                "watchdog_period_ms must be longer than sample_period_ms and at most 4x it",
            ));
        }

        if self.imu.queue_depth == 0 || self.imu.queue_depth > 1024 {
            return Err(invalid("queue_depth must be between 1 and 1024"));
        }

        // Complementary filter coefficients
        for (name, value) in [
            ("blend_factor", self.fusion.blend_factor),
            ("variability_smoothing", self.fusion.variability_smoothing),
        ] {
            if value <= 0.0 || value >= 1.0 {
                return Err(invalid(format!("{} must be between 0.0 and 1.0 (exclusive)", name)));
            }
        }

        if self.fusion.stationary_threshold <= 0.0 {
            return Err(invalid("stationary_threshold must be greater than 0"));
        }

        if self.fusion.magnetic_yaw_gain <= 0.0 || self.fusion.magnetic_yaw_gain > 10.0 {
            return Err(invalid("magnetic_yaw_gain must be between 0.0 (exclusive) and 10.0"));
        }

        // Control mapping
        if self.controls.full_scale_rad <= 0.0 || self.controls.full_scale_rad > std::f32::consts::PI {
            return Err(invalid("full_scale_rad must be between 0.0 (exclusive) and pi"));
        }

        if self.controls.gain_min < 0.0 || self.controls.gain_min > self.controls.gain_max {
            return Err(invalid("gain_min must be non-negative and not above gain_max"));
        }

        if self.controls.gain_max > 10.0 {
            return Err(invalid("gain_max must be at most 10.0"));
        }

        if self.controls.gain_smoothing <= 0.0 || self.controls.gain_smoothing > 1.0 {
            return Err(invalid("gain_smoothing must be between 0.0 (exclusive) and 1.0"));
        }

        if self.controls.throttle_deadzone < 0.0 || self.controls.throttle_deadzone > 0.25 {
            return Err(invalid("throttle_deadzone must be between 0.0 and 0.25"));
        }

        if self.controls.debounce_ms == 0 || self.controls.debounce_ms > 1000 {
            return Err(invalid("debounce_ms must be between 1 and 1000"));
        }

        // Report link
        if !self.usb.port.is_empty()
            && ![9600, 115_200, 230_400, 460_800, 921_600].contains(&self.usb.baud_rate)
        {
            return Err(invalid(
                "baud_rate must be one of: 9600, 115200, 230400, 460800, 921600",
            ));
        }

        if self.storage.path.is_empty() {
            return Err(invalid("storage path cannot be empty"));
        }

        // Telemetry
        if self.telemetry.enabled && self.telemetry.log_dir.is_empty() {
            return Err(invalid("telemetry log_dir cannot be empty when enabled"));
        }

        if self.telemetry.max_records_per_file == 0 {
            return Err(invalid("max_records_per_file must be greater than 0"));
        }

        if self.telemetry.max_files_to_keep == 0 {
            return Err(invalid("max_files_to_keep must be greater than 0"));
        }

        if self.telemetry.log_interval_ms == 0 || self.telemetry.log_interval_ms > 60000 {
            return Err(invalid("log_interval_ms must be between 1 and 60000"));
        }

        Ok(())
    }
}
