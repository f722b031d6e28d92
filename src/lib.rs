//! # Yoke IMU Library
//!
//! Controller core of a flight-simulator yoke built around a 9-axis IMU.
//!
//! The library turns inertial samples and panel inputs into a fixed-layout
//! joystick report every sample period:
//!
//! - [`sensor`]: LSM9DS1 driver over a two-wire bus, plus a synthetic bus
//! - [`fusion`]: complementary-filter orientation estimate with auto-zero
//! - [`input`]: debounced switches, rotary encoder and hat decoding
//! - [`control`]: axis mapping, throttle calibration and the 21-byte report
//! - [`scheduler`]: queue-driven dispatch with a data-ready watchdog
//! - [`transport`]: delivery of reports to the host
//! - [`yoke`]: the pipeline tying everything together

pub mod alarm;
pub mod config;
pub mod control;
pub mod error;
pub mod filter;
pub mod fusion;
pub mod input;
pub mod scheduler;
pub mod sensor;
pub mod storage;
pub mod telemetry;
pub mod transport;
pub mod yoke;
