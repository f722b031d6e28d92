//! # Orientation Estimator Module
//!
//! Fuses gyroscope, accelerometer and magnetometer readings into pitch, roll
//! and yaw of the yoke.
//!
//! ## Algorithm
//!
//! Each cycle:
//!
//! 1. Absolute references are derived from the field vectors:
//!    `pitch = atan2(a.y, sqrt(a.x² + a.z²))`,
//!    `roll = atan2(a.x, sqrt(a.y² + a.z²))` and
//!    `yaw = gain * atan2(f.z, f.x)`, the latter unwrapped to the turn
//!    nearest the current yaw so the fused angle never jumps by a full turn.
//! 2. Every axis is fused as `angle = (1 - k) * (angle + rate * dt) + k * reference`.
//!    Gyro integration dominates short-term, the references remove drift.
//! 3. The rate of change of each fused angle is smoothed into a variability.
//!    While all three variabilities are below the stationary threshold the
//!    current angles are latched as the zero references (auto-zero) and the
//!    estimator reports itself calibrated.
//! 4. The output angles are the fused angles minus the references.
//!
//! Fused angles are unbounded accumulators; only the `atan2` references are
//! range-bounded.

use serde::Serialize;
use std::f32::consts::TAU;
use tracing::{debug, trace};

use crate::config::FusionConfig;
use crate::sensor::{ImuReading, Vector3};

/// Zero references subtracted from the fused angles
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct References {
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
}

/// Full estimator state
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OrientationState {
    /// Fused angles in radians
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
    /// Smoothed rate of change of the fused angles in rad/s
    pub pitch_variability: f32,
    pub roll_variability: f32,
    pub yaw_variability: f32,
    pub references: References,
}

/// Read-only result of one estimator update
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct OrientationSnapshot {
    /// Calibrated angles (fused minus reference) in radians
    pub pitch: f32,
    pub roll: f32,
    pub yaw: f32,
    /// Smoothed rates of change in rad/s (pitch, roll, yaw)
    pub variability: Vector3,
    pub references: References,
    /// Device judged stationary; references were latched this cycle
    pub calibrated: bool,
}

/// Complementary filter with drift auto-zero
#[derive(Debug, Clone)]
pub struct OrientationEstimator {
    blend_factor: f32,
    variability_smoothing: f32,
    stationary_threshold: f32,
    magnetic_yaw_gain: f32,
    state: OrientationState,
    calibrated: bool,
}

impl OrientationEstimator {
    #[must_use]
    pub fn new(config: &FusionConfig) -> Self {
        Self {
            blend_factor: config.blend_factor,
            variability_smoothing: config.variability_smoothing,
            stationary_threshold: config.stationary_threshold,
            magnetic_yaw_gain: config.magnetic_yaw_gain,
            state: OrientationState::default(),
            calibrated: false,
        }
    }

    #[must_use]
    pub fn state(&self) -> &OrientationState {
        &self.state
    }

    /// Whether the last update judged the device stationary
    #[must_use]
    pub fn is_calibrated(&self) -> bool {
        self.calibrated
    }

    #[must_use]
    pub fn references(&self) -> References {
        self.state.references
    }

    /// Overwrites the zero references, e.g. with values restored from storage
    pub fn set_references(&mut self, references: References) {
        debug!(
            "Orientation references set: pitch={:.4} roll={:.4} yaw={:.4}",
            references.pitch, references.roll, references.yaw
        );
        self.state.references = references;
    }

    /// Accelerometer tilt as (pitch, roll)
    #[must_use]
    pub fn tilt(acceleration: &Vector3) -> (f32, f32) {
        let a = acceleration;
        let pitch = a.y.atan2((a.x * a.x + a.z * a.z).sqrt());
        let roll = a.x.atan2((a.y * a.y + a.z * a.z).sqrt());
        (pitch, roll)
    }

    /// Magnetic heading unwrapped to the turn nearest the current yaw
    fn magnetic_yaw(&self, field: &Vector3) -> f32 {
        let heading = self.magnetic_yaw_gain * field.z.atan2(field.x);
        let period = TAU * self.magnetic_yaw_gain.abs();
        if period == 0.0 {
            return heading;
        }
        heading + period * ((self.state.yaw - heading) / period).round()
    }

    fn fuse(&self, angle: f32, rate: f32, reference: f32, dt: f32) -> f32 {
        (1.0 - self.blend_factor) * (angle + rate * dt) + self.blend_factor * reference
    }

    fn smooth_variability(&self, variability: f32, delta: f32, dt: f32) -> f32 {
        let s = self.variability_smoothing;
        (1.0 - s) * variability + s * delta.abs() / dt
    }

    /// Runs one filter cycle over `reading` taken `dt` seconds after the previous one
    pub fn update(&mut self, reading: &ImuReading, dt: f32) -> OrientationSnapshot {
        let dt = if dt.is_finite() && dt > 0.0 { dt } else { 0.0 };
        let (pitch_ref, roll_ref) = Self::tilt(&reading.acceleration);
        let yaw_ref = self.magnetic_yaw(&reading.magnetic_field);
        let rate = reading.angular_rate;

        let previous = self.state;
        let pitch = self.fuse(previous.pitch, rate.x, pitch_ref, dt);
        let roll = self.fuse(previous.roll, rate.y, roll_ref, dt);
        let yaw = self.fuse(previous.yaw, rate.z, yaw_ref, dt);

        if dt > 0.0 {
            self.state.pitch_variability =
                self.smooth_variability(previous.pitch_variability, pitch - previous.pitch, dt);
            self.state.roll_variability =
                self.smooth_variability(previous.roll_variability, roll - previous.roll, dt);
            self.state.yaw_variability = self.smooth_variability(previous.yaw_variability, yaw - previous.yaw, dt);
        }
        self.state.pitch = pitch;
        self.state.roll = roll;
        self.state.yaw = yaw;

        let stationary = self.state.pitch_variability < self.stationary_threshold
            && self.state.roll_variability < self.stationary_threshold
            && self.state.yaw_variability < self.stationary_threshold;

        if stationary {
            self.state.references = References {
                pitch: self.state.pitch,
                roll: self.state.roll,
                yaw: self.state.yaw,
            };
        }
        if stationary != self.calibrated {
            debug!("Orientation {}", if stationary { "calibrated" } else { "moving" });
        }
        self.calibrated = stationary;

        let snapshot = self.snapshot();
        trace!(
            "Orientation: pitch={:.4} roll={:.4} yaw={:.4}",
            snapshot.pitch,
            snapshot.roll,
            snapshot.yaw
        );
        snapshot
    }

    /// Current calibrated output without running a cycle
    #[must_use]
    pub fn snapshot(&self) -> OrientationSnapshot {
        let s = &self.state;
        OrientationSnapshot {
            pitch: s.pitch - s.references.pitch,
            roll: s.roll - s.references.roll,
            yaw: s.yaw - s.references.yaw,
            variability: Vector3::new(s.pitch_variability, s.roll_variability, s.yaw_variability),
            references: s.references,
            calibrated: self.calibrated,
        }
    }
}
