//! # CRC-8/DVB-S2
//!
//! Checksum closing every report frame.
//!
//! **Polynomial**: 0xD5 (x^8 + x^7 + x^6 + x^4 + x^2 + 1)
//! **Initial Value**: 0x00

const POLYNOMIAL: u8 = 0xD5;

const TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;

    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ POLYNOMIAL } else { crc << 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }

    table
}

/// Checksum of `data`
///
/// # Examples
///
/// ```
/// use yoke_imu::transport::crc::crc8_dvb_s2;
///
/// assert_eq!(crc8_dvb_s2(b"123456789"), 0xBC);
/// ```
#[must_use]
pub fn crc8_dvb_s2(data: &[u8]) -> u8 {
    data.iter().fold(0, |crc, &byte| TABLE[usize::from(crc ^ byte)])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitwise(data: &[u8]) -> u8 {
        let mut crc = 0u8;
        for &byte in data {
            crc ^= byte;
            for _ in 0..8 {
                crc = if crc & 0x80 != 0 { (crc << 1) ^ POLYNOMIAL } else { crc << 1 };
            }
        }
        crc
    }

    #[test]
    fn test_check_value() {
        assert_eq!(crc8_dvb_s2(b"123456789"), 0xBC);
    }

    #[test]
    fn test_empty_is_zero() {
        assert_eq!(crc8_dvb_s2(&[]), 0);
    }

    #[test]
    fn test_table_matches_bitwise() {
        let data: Vec<u8> = (0..=255u8).rev().chain(0..64).collect();
        assert_eq!(crc8_dvb_s2(&data), bitwise(&data));
        for byte in 0..=255u8 {
            assert_eq!(crc8_dvb_s2(&[byte]), bitwise(&[byte]));
        }
    }

    #[test]
    fn test_detects_single_bit_flip() {
        let mut data = [0x15u8, 0x00, 0x7F, 0x80, 0x01];
        let crc = crc8_dvb_s2(&data);
        data[2] ^= 0x04;
        assert_ne!(crc8_dvb_s2(&data), crc);
    }
}
