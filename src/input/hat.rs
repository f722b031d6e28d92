//! # HAT Decoder Module
//!
//! Decodes the four pulled-up lines of the HAT switch.
//!
//! Bus bit 0 is the north line, bit 1 east, bit 2 south, bit 3 west; a
//! pressed direction pulls its line low. The lookup table below is a wiring
//! contract of the yoke and is reproduced as-is.

/// Position of the HAT switch, numbered as in the control report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum HatPosition {
    #[default]
    Neutral = 0,
    North = 1,
    NorthEast = 2,
    East = 3,
    SouthEast = 4,
    South = 5,
    SouthWest = 6,
    West = 7,
    NorthWest = 8,
}

use HatPosition::{East, Neutral, North, NorthEast, NorthWest, South, SouthEast, SouthWest, West};

/// Raw 4-bit bus value to position
const HAT_TABLE: [HatPosition; 16] = [
    Neutral,   // 0000 all low (illegal)
    Neutral,   // 0001
    Neutral,   // 0010
    SouthWest, // 0011 S+W low
    Neutral,   // 0100
    Neutral,   // 0101 E+W low (illegal)
    NorthWest, // 0110 N+W low
    West,      // 0111
    Neutral,   // 1000
    SouthEast, // 1001 E+S low
    Neutral,   // 1010 N+S low (illegal)
    South,     // 1011
    NorthEast, // 1100 N+E low
    East,      // 1101
    North,     // 1110
    Neutral,   // 1111 released
];

/// Decodes one read of the HAT bus; only the low four bits are used
#[must_use]
pub fn decode_hat(bus: u8) -> HatPosition {
    HAT_TABLE[usize::from(bus & 0x0F)]
}

impl HatPosition {
    /// Report value 0..=8
    #[must_use]
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line_low_maps_to_cardinal() {
        assert_eq!(decode_hat(0b1110), North);
        assert_eq!(decode_hat(0b1101), East);
        assert_eq!(decode_hat(0b1011), South);
        assert_eq!(decode_hat(0b0111), West);
    }

    #[test]
    fn test_adjacent_lines_low_map_to_diagonal() {
        assert_eq!(decode_hat(0b1100), NorthEast);
        assert_eq!(decode_hat(0b1001), SouthEast);
        assert_eq!(decode_hat(0b0011), SouthWest);
        assert_eq!(decode_hat(0b0110), NorthWest);
    }

    #[test]
    fn test_released_and_illegal_patterns_are_neutral() {
        assert_eq!(decode_hat(0b1111), Neutral);
        assert_eq!(decode_hat(0b1010), Neutral);
        assert_eq!(decode_hat(0b0101), Neutral);
        assert_eq!(decode_hat(0b0000), Neutral);
        assert_eq!(decode_hat(0b0001), Neutral);
    }

    #[test]
    fn test_table_reproduced_exactly() {
        let values: Vec<u8> = (0..16u8).map(|bus| decode_hat(bus).as_u8()).collect();
        assert_eq!(values, vec![0, 0, 0, 6, 0, 0, 8, 7, 0, 4, 0, 5, 2, 3, 1, 0]);
    }

    #[test]
    fn test_upper_bits_ignored() {
        assert_eq!(decode_hat(0xFE), North);
        assert_eq!(decode_hat(0xF0), Neutral);
    }
}
