//! # Report Frame
//!
//! Serial framing of [`ControlReport`]s for the report link.
//!
//! ```text
//! +------+--------+----------------------+-----+
//! | 0xA5 | length | record (length = 21) | crc |
//! +------+--------+----------------------+-----+
//! ```
//!
//! The CRC-8/DVB-S2 covers the length byte and the record.

use bytes::{BufMut, Bytes, BytesMut};

use super::crc::crc8_dvb_s2;
use crate::control::report::{ControlReport, REPORT_LEN};

/// First byte of every frame
pub const FRAME_SYNC_BYTE: u8 = 0xA5;

/// Total frame length: sync + length + record + crc
pub const FRAME_LEN: usize = REPORT_LEN + 3;

/// Encodes a report into one frame
#[must_use]
pub fn encode_frame(report: &ControlReport) -> Bytes {
    let mut frame = BytesMut::with_capacity(FRAME_LEN);
    frame.put_u8(FRAME_SYNC_BYTE);
    frame.put_u8(REPORT_LEN as u8);
    report.write_to(&mut frame);
    let crc = crc8_dvb_s2(&frame[1..]);
    frame.put_u8(crc);
    frame.freeze()
}

/// Validates and decodes one frame
///
/// Returns `None` on a wrong sync byte, length or checksum.
#[must_use]
pub fn decode_frame(frame: &[u8]) -> Option<ControlReport> {
    if frame.len() != FRAME_LEN || frame[0] != FRAME_SYNC_BYTE || usize::from(frame[1]) != REPORT_LEN {
        return None;
    }
    let (body, crc) = frame[1..].split_at(REPORT_LEN + 1);
    if crc8_dvb_s2(body) != crc[0] {
        return None;
    }
    ControlReport::decode(&body[1..])
}
