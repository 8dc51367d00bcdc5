//! CRC-8 checksum used by the gate frame format.
//!
//! Polynomial `0x07`, initial value `0x00`, no reflection and no final XOR
//! (the plain "CRC-8/SMBUS" parameters). The check value over the ASCII
//! string `"123456789"` is `0xF4`.

use parkgate_core::constants::CRC8_POLYNOMIAL;

const TABLE: [u8; 256] = build_table();

const fn build_table() -> [u8; 256] {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC8_POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Compute the checksum of `data`.
///
/// # Example
///
/// ```
/// use parkgate_protocol::crc8;
///
/// assert_eq!(crc8(b"123456789"), 0xF4);
/// assert_eq!(crc8(&[]), 0x00);
/// ```
#[inline]
pub fn crc8(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |crc, &byte| TABLE[(crc ^ byte) as usize])
}

/// Incremental form of [`crc8`] for data that arrives in pieces.
#[derive(Debug, Clone, Copy, Default)]
pub struct Crc8 {
    value: u8,
}

impl Crc8 {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            self.value = TABLE[(self.value ^ byte) as usize];
        }
    }

    pub fn finish(&self) -> u8 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    /// Bitwise reference used to validate the lookup table.
    fn crc8_bitwise(data: &[u8]) -> u8 {
        let mut crc = 0u8;
        for &byte in data {
            crc ^= byte;
            for _ in 0..8 {
                crc = if crc & 0x80 != 0 {
                    (crc << 1) ^ 0x07
                } else {
                    crc << 1
                };
            }
        }
        crc
    }

    #[test]
    fn test_check_value() {
        assert_eq!(crc8(b"123456789"), 0xF4);
    }

    #[rstest]
    #[case(&[0x03, 0x01], 0x38)]
    #[case(&[0x03, 0x00], 0x3F)]
    #[case(&[0x04, 0x01], 0x53)]
    #[case(&[0x04, 0x00], 0x54)]
    #[case(&[0x02, 90], 0xAB)]
    #[case(&[0x05, 0x01], 0x46)]
    #[case(&[0x05, 0x00], 0x41)]
    fn test_known_frames(#[case] data: &[u8], #[case] expected: u8) {
        assert_eq!(crc8(data), expected);
    }

    #[test]
    fn test_display_payloads() {
        let mut welcome = vec![0x01];
        welcome.extend_from_slice(b"Welcome");
        assert_eq!(crc8(&welcome), 0xA1);

        let mut full = vec![0x01];
        full.extend_from_slice(b"Lot Full");
        assert_eq!(crc8(&full), 0x3D);
    }

    #[test]
    fn test_table_matches_bitwise() {
        for i in 0..=255u8 {
            assert_eq!(crc8(&[i]), crc8_bitwise(&[i]), "byte 0x{i:02X}");
        }
        assert_eq!(crc8(b"Spaces Available"), crc8_bitwise(b"Spaces Available"));
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut crc = Crc8::new();
        crc.update(b"1234");
        crc.update(b"");
        crc.update(b"56789");
        assert_eq!(crc.finish(), 0xF4);
    }
}
