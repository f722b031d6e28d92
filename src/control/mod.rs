//! # Control Module
//!
//! Maps the fused orientation and the panel inputs to joystick reports.
//!
//! This module handles:
//! - Lever calibration ranges and calibration sessions ([`calibration`])
//! - Yaw blending, gain, ground mode and HAT modes ([`mapper`])
//! - The report record, its wire encoding and HID descriptor ([`report`])

pub mod calibration;
pub mod mapper;
pub mod report;

pub use calibration::{CalibrationOutcome, CalibrationRange, CalibrationSession};
pub use mapper::{ControlMapper, HatMode};
pub use report::{ControlReport, UsbIdentity, HID_REPORT_DESCRIPTOR, REPORT_LEN};
