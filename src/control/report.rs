//! # Control Report Module
//!
//! The fixed-layout joystick report sent to the host every cycle.
//!
//! ## Wire Format
//!
//! All fields little-endian, 21 bytes in total:
//!
//! | Offset | Field | Type | Content |
//! |--------|-------|------|---------|
//! | 0 | X | i16 | Roll |
//! | 2 | Y | i16 | Pitch (0 in ground mode) |
//! | 4 | Z | i16 | Throttle, 0..=32767 |
//! | 6 | Rz | i16 | Yaw |
//! | 8 | Rx | i16 | Left brake, 0..=32767 |
//! | 10 | Ry | i16 | Right brake, 0..=32767 |
//! | 12 | Slider | i16 | Propeller, 0..=32767 |
//! | 14 | Dial | i16 | Mixture, 0..=32767 |
//! | 16 | Hat | u8 | 0 = neutral, 1..=8 = N clockwise to NW |
//! | 17 | Buttons | u32 | Button bitmask |
//!
//! Switch-sourced buttons (bits 0-10) are active-low: a cleared bit means
//! the switch is pressed. Trim buttons (bits 12-15) and quick-view buttons
//! (bits 16-23) are generated by the mapper and are active-high.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::config::UsbConfig;

/// Encoded report length in bytes
pub const REPORT_LEN: usize = 21;

/// Maximum value of an axis field
pub const AXIS_MAX: i16 = i16::MAX;

/// First trim button bit (north), followed by east, south, west
pub const TRIM_BUTTON_BASE: u8 = 12;

/// First quick-view button bit (north), followed clockwise by the other seven directions
pub const QUICK_VIEW_BUTTON_BASE: u8 = 16;

/// HID report descriptor matching [`ControlReport::encode`]
pub static HID_REPORT_DESCRIPTOR: [u8; 96] = [
    0x05, 0x01, //       USAGE_PAGE (Generic Desktop)
    0x09, 0x04, //       USAGE (Joystick)
    0xA1, 0x01, //       COLLECTION (Application)
    0x05, 0x01, //         USAGE_PAGE (Generic Desktop)
    0x09, 0x01, //         USAGE (Pointer)
    0xA1, 0x00, //         COLLECTION (Physical)
    0x75, 0x10, //           REPORT_SIZE (16)
    0x16, 0x01, 0x80, //     LOGICAL_MINIMUM (-32767)
    0x26, 0xFF, 0x7F, //     LOGICAL_MAXIMUM (32767)
    0x09, 0x30, //           USAGE (X)
    0x09, 0x31, //           USAGE (Y)
    0x09, 0x32, //           USAGE (Z)
    0x09, 0x35, //           USAGE (Rz)
    0x95, 0x04, //           REPORT_COUNT (4)
    0x81, 0x02, //           INPUT (Data,Var,Abs)
    0x15, 0x00, //           LOGICAL_MINIMUM (0)
    0x26, 0xFF, 0x7F, //     LOGICAL_MAXIMUM (32767)
    0x09, 0x33, //           USAGE (Rx)
    0x09, 0x34, //           USAGE (Ry)
    0x09, 0x36, //           USAGE (Slider)
    0x09, 0x37, //           USAGE (Dial)
    0x95, 0x04, //           REPORT_COUNT (4)
    0x81, 0x02, //           INPUT (Data,Var,Abs)
    0xC0, //               END_COLLECTION
    0x09, 0x39, //         USAGE (Hat switch)
    0x15, 0x01, //         LOGICAL_MINIMUM (1)
    0x25, 0x08, //         LOGICAL_MAXIMUM (8)
    0x35, 0x00, //         PHYSICAL_MINIMUM (0)
    0x46, 0x3B, 0x01, //   PHYSICAL_MAXIMUM (315)
    0x65, 0x14, //         UNIT (Eng Rot:Angular Pos)
    0x75, 0x04, //         REPORT_SIZE (4)
    0x95, 0x01, //         REPORT_COUNT (1)
    0x81, 0x42, //         INPUT (Data,Var,Abs,Null)
    0x75, 0x04, //         REPORT_SIZE (4)
    0x95, 0x01, //         REPORT_COUNT (1)
    0x81, 0x41, //         INPUT (Cnst,Ary,Abs,Null)
    0x05, 0x09, //         USAGE_PAGE (Button)
    0x19, 0x01, //         USAGE_MINIMUM (Button 1)
    0x29, 0x20, //         USAGE_MAXIMUM (Button 32)
    0x15, 0x00, //         LOGICAL_MINIMUM (0)
    0x25, 0x01, //         LOGICAL_MAXIMUM (1)
    0x75, 0x01, //         REPORT_SIZE (1)
    0x95, 0x20, //         REPORT_COUNT (32)
    0x55, 0x00, //         UNIT_EXPONENT (0)
    0x65, 0x00, //         UNIT (None)
    0x81, 0x02, //         INPUT (Data,Var,Abs)
    0xC0, //             END_COLLECTION
];

/// Device identity presented to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsbIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
    pub release: u16,
}

impl From<&UsbConfig> for UsbIdentity {
    fn from(config: &UsbConfig) -> Self {
        Self {
            vendor_id: config.vendor_id,
            product_id: config.product_id,
            release: config.release,
        }
    }
}

/// One joystick report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ControlReport {
    pub x: i16,
    pub y: i16,
    pub z: i16,
    pub rz: i16,
    pub rx: i16,
    pub ry: i16,
    pub slider: i16,
    pub dial: i16,
    pub hat: u8,
    pub buttons: u32,
}

impl ControlReport {
    /// Appends the wire encoding to `buf`
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.reserve(REPORT_LEN);
        for axis in [
            self.x,
            self.y,
            self.z,
            self.rz,
            self.rx,
            self.ry,
            self.slider,
            self.dial,
        ] {
            buf.put_i16_le(axis);
        }
        buf.put_u8(self.hat);
        buf.put_u32_le(self.buttons);
    }

    /// Encodes the report into its 21-byte wire form
    ///
    /// # Examples
    ///
    /// ```
    /// use yoke_imu::control::report::{ControlReport, REPORT_LEN};
    ///
    /// let report = ControlReport { x: -2, hat: 3, ..Default::default() };
    /// let bytes = report.encode();
    /// assert_eq!(bytes.len(), REPORT_LEN);
    /// assert_eq!(&bytes[..2], &[0xFE, 0xFF]);
    /// assert_eq!(bytes[16], 3);
    /// ```
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(REPORT_LEN);
        self.write_to(&mut buf);
        buf.freeze()
    }

    /// Parses a wire-form report; `None` if `data` is not exactly [`REPORT_LEN`] bytes
    #[must_use]
    pub fn decode(mut data: &[u8]) -> Option<Self> {
        if data.len() != REPORT_LEN {
            return None;
        }
        Some(Self {
            x: data.get_i16_le(),
            y: data.get_i16_le(),
            z: data.get_i16_le(),
            rz: data.get_i16_le(),
            rx: data.get_i16_le(),
            ry: data.get_i16_le(),
            slider: data.get_i16_le(),
            dial: data.get_i16_le(),
            hat: data.get_u8(),
            buttons: data.get_u32_le(),
        })
    }

    /// Whether a button bit is set
    #[must_use]
    pub fn button(&self, bit: u8) -> bool {
        self.buttons & (1 << bit) != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_length_and_field_order() {
        let report = ControlReport {
            x: 1,
            y: 2,
            z: 3,
            rz: 4,
            rx: 5,
            ry: 6,
            slider: 7,
            dial: 8,
            hat: 9,
            buttons: 0x0403_0201,
        };
        let bytes = report.encode();

        assert_eq!(bytes.len(), REPORT_LEN);
        assert_eq!(
            bytes.as_ref(),
            &[1, 0, 2, 0, 3, 0, 4, 0, 5, 0, 6, 0, 7, 0, 8, 0, 9, 1, 2, 3, 4]
        );
    }

    #[test]
    fn test_encode_negative_and_extreme_values() {
        let report = ControlReport {
            x: -32767,
            y: i16::MIN,
            rz: AXIS_MAX,
            buttons: u32::MAX,
            ..Default::default()
        };
        let bytes = report.encode();

        assert_eq!(&bytes[0..2], &[0x01, 0x80]);
        assert_eq!(&bytes[2..4], &[0x00, 0x80]);
        assert_eq!(&bytes[6..8], &[0xFF, 0x7F]);
        assert_eq!(&bytes[17..21], &[0xFF; 4]);
    }

    #[test]
    fn test_decode_rejects_wrong_length() {
        assert_eq!(ControlReport::decode(&[0u8; 20]), None);
        assert_eq!(ControlReport::decode(&[0u8; 22]), None);
    }

    #[test]
    fn test_decode_encoded_report() {
        let report = ControlReport {
            y: 7281,
            rx: 12,
            hat: 5,
            buttons: 0x07FF,
            ..Default::default()
        };
        assert_eq!(ControlReport::decode(&report.encode()), Some(report));
    }

    #[test]
    fn test_descriptor_declares_report_size() {
        // Sum REPORT_SIZE * REPORT_COUNT over every INPUT item
        let mut size = 0u32;
        let mut count = 0u32;
        let mut bits = 0u32;
        let mut i = 0;
        while i < HID_REPORT_DESCRIPTOR.len() {
            let prefix = HID_REPORT_DESCRIPTOR[i];
            let len = match prefix & 0x03 {
                3 => 4,
                n => usize::from(n),
            };
            let data = &HID_REPORT_DESCRIPTOR[i + 1..i + 1 + len];
            let value = data.iter().rev().fold(0u32, |acc, &b| (acc << 8) | u32::from(b));
            match prefix & 0xFC {
                0x74 => size = value,
                0x94 => count = value,
                0x80 => bits += size * count,
                _ => {}
            }
            i += 1 + len;
        }
        assert_eq!(bits as usize, REPORT_LEN * 8);
    }

    #[test]
    fn test_identity_from_config() {
        let identity = UsbIdentity::from(&UsbConfig::default());
        assert_eq!(identity.vendor_id, 0x0483);
        assert_eq!(identity.product_id, 0x5711);
        assert_eq!(identity.release, 1);
    }
}
