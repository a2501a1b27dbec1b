//! Raw result word layouts.
//!
//! Converters in this family emit one of two little-endian word layouts. The
//! layout is picked once from configuration and both the drivers (encode) and
//! the frame assembler (decode) go through the same [`SampleFormat`].

use serde::Deserialize;

const DATA_MASK: u32 = 0x0fff;

/// One decoded converter result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    pub channel: u8,
    pub code: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SampleFormat {
    /// 16-bit word: data in bits 0..12, channel in bits 12..16.
    Type1,
    /// 32-bit word: data in bits 0..12, channel in bits 13..17, unit in bit 17.
    #[default]
    Type2,
}

impl SampleFormat {
    /// Bytes per result word.
    pub const fn width(self) -> usize {
        match self {
            SampleFormat::Type1 => 2,
            SampleFormat::Type2 => 4,
        }
    }

    /// Decodes the first [`width`](Self::width) bytes of `word`.
    pub fn decode(self, word: &[u8]) -> Sample {
        match self {
            SampleFormat::Type1 => {
                let raw = u16::from_le_bytes([word[0], word[1]]);
                Sample {
                    channel: (raw >> 12) as u8,
                    code: raw & DATA_MASK as u16,
                }
            }
            SampleFormat::Type2 => {
                let raw = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
                Sample {
                    channel: ((raw >> 13) & 0xf) as u8,
                    code: (raw & DATA_MASK) as u16,
                }
            }
        }
    }

    /// Encodes `sample` into the first [`width`](Self::width) bytes of `out`.
    /// Codes wider than 12 bits and channels wider than 4 bits are truncated.
    pub fn encode(self, sample: Sample, out: &mut [u8]) {
        let code = u32::from(sample.code) & DATA_MASK;
        let channel = u32::from(sample.channel) & 0xf;
        match self {
            SampleFormat::Type1 => {
                let raw = (code | channel << 12) as u16;
                out[..2].copy_from_slice(&raw.to_le_bytes());
            }
            SampleFormat::Type2 => {
                let raw = code | channel << 13;
                out[..4].copy_from_slice(&raw.to_le_bytes());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type1_bit_layout() {
        // channel 3, code 0xabc
        let word = [0xbc, 0x3a];
        let sample = SampleFormat::Type1.decode(&word);
        assert_eq!(sample, Sample { channel: 3, code: 0xabc });

        let mut out = [0u8; 2];
        SampleFormat::Type1.encode(sample, &mut out);
        assert_eq!(out, word);
    }

    #[test]
    fn type2_bit_layout() {
        // channel 2 lives at bit 13, bit 12 stays reserved
        let raw: u32 = 0x0123 | 2 << 13;
        let sample = SampleFormat::Type2.decode(&raw.to_le_bytes());
        assert_eq!(sample, Sample { channel: 2, code: 0x123 });

        let mut out = [0u8; 4];
        SampleFormat::Type2.encode(sample, &mut out);
        assert_eq!(u32::from_le_bytes(out), raw);
    }

    #[test]
    fn type2_ignores_reserved_and_unit_bits() {
        let raw: u32 = 0x0fff | 1 << 12 | 5 << 13 | 1 << 17 | 0xff00_0000;
        let sample = SampleFormat::Type2.decode(&raw.to_le_bytes());
        assert_eq!(sample, Sample { channel: 5, code: 0xfff });
    }
}
