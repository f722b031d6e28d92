//! # Sensor Module
//!
//! Inertial sensor access for the control pipeline.
//!
//! This module handles:
//! - Register-level access over the two-wire bus, with fault reporting
//! - LSM9DS1 gyroscope/accelerometer/magnetometer initialisation and reads
//! - Conversion from raw counts to physical units
//! - A synthetic bus serving scripted samples when no hardware is present

pub mod bus;
pub mod lsm9ds1;
pub mod synthetic;

use serde::Serialize;

/// 1-bit resolution of angular rate in rad/s (500 deg/s full scale)
pub const ANGULAR_RATE_RESOLUTION: f32 = 500.0 * std::f32::consts::PI / 180.0 / 32768.0;

/// 1-bit resolution of acceleration in g (2 g full scale)
pub const ACCELERATION_RESOLUTION: f32 = 2.0 / 32768.0;

/// 1-bit resolution of magnetic field in gauss (16 gauss full scale)
pub const MAGNETIC_FIELD_RESOLUTION: f32 = 16.0 / 32768.0;

/// Three-component vector: angular rate (rad/s), acceleration (g) or field (gauss)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Raw sensor counts as read from the output registers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawImuSample {
    pub gyroscope: [i16; 3],
    pub accelerometer: [i16; 3],
    pub magnetometer: [i16; 3],
}

/// One sample converted to physical units
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ImuReading {
    /// Angular rate in rad/s
    pub angular_rate: Vector3,
    /// Acceleration in g
    pub acceleration: Vector3,
    /// Magnetic field in gauss
    pub magnetic_field: Vector3,
}

fn scale_counts(counts: [i16; 3], resolution: f32) -> Vector3 {
    Vector3::new(
        f32::from(counts[0]) * resolution,
        f32::from(counts[1]) * resolution,
        f32::from(counts[2]) * resolution,
    )
}

fn to_counts(value: f32, resolution: f32) -> i16 {
    (value / resolution)
        .round()
        .clamp(f32::from(i16::MIN), f32::from(i16::MAX)) as i16
}

impl RawImuSample {
    /// Converts raw counts to physical units using the fixed per-bit resolutions
    #[must_use]
    pub fn to_reading(&self) -> ImuReading {
        ImuReading {
            angular_rate: scale_counts(self.gyroscope, ANGULAR_RATE_RESOLUTION),
            acceleration: scale_counts(self.accelerometer, ACCELERATION_RESOLUTION),
            magnetic_field: scale_counts(self.magnetometer, MAGNETIC_FIELD_RESOLUTION),
        }
    }

    /// Builds the counts a level-mounted sensor would report
    ///
    /// * `rate` - angular rate in rad/s (x = pitch, y = roll, z = yaw axis)
    /// * `pitch`, `roll` - tilt in radians, encoded in the gravity vector
    /// * `heading` - magnetic heading in radians, encoded in the field's X/Z plane
    #[must_use]
    pub fn from_motion(rate: Vector3, pitch: f32, roll: f32, heading: f32) -> Self {
        let ay = pitch.sin();
        let ax = roll.sin();
        let az = (1.0 - ax * ax - ay * ay).max(0.0).sqrt();
        let field = 0.4;

        Self {
            gyroscope: [
                to_counts(rate.x, ANGULAR_RATE_RESOLUTION),
                to_counts(rate.y, ANGULAR_RATE_RESOLUTION),
                to_counts(rate.z, ANGULAR_RATE_RESOLUTION),
            ],
            accelerometer: [
                to_counts(ax, ACCELERATION_RESOLUTION),
                to_counts(ay, ACCELERATION_RESOLUTION),
                to_counts(az, ACCELERATION_RESOLUTION),
            ],
            magnetometer: [
                to_counts(field * heading.cos(), MAGNETIC_FIELD_RESOLUTION),
                0,
                to_counts(field * heading.sin(), MAGNETIC_FIELD_RESOLUTION),
            ],
        }
    }
}

/// Source of inertial samples for the periodic handler
pub trait MotionSensor: Send {
    /// Read the newest sample
    ///
    /// On a bus fault the previous sample is returned unchanged; the fault has
    /// already been reported to the alarm collaborator.
    fn sample(&mut self) -> RawImuSample;
}
