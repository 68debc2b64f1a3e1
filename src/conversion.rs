use serde::{Deserialize, Serialize};

use crate::format::BitDepth;

/// How a sample's bytes are folded into a magnitude proxy for the meter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accumulator {
    /// Shift every byte into a 16-bit wrapping accumulator.
    ///
    /// Byte `j` lands at bit `8 * j`, so bytes 2 and up are shifted out of a
    /// 16-bit word entirely and the proxy for 24/32-bit samples is just the
    /// two least significant bytes read as `i16`. Only meaningful for relative
    /// comparison at those depths.
    #[default]
    Narrow,
    /// Decode the whole sign-extended sample.
    Wide,
}

/// Magnitude proxy of one sample, given as its raw little-endian bytes.
pub fn sample_magnitude(sample: &[u8], accumulator: Accumulator) -> u32 {
    match accumulator {
        Accumulator::Narrow => {
            let mut acc: i16 = 0;
            for (j, &byte) in sample.iter().enumerate() {
                let shifted = u32::from(byte).wrapping_shl(8 * j as u32) as i16;
                acc = acc.wrapping_add(shifted);
            }
            u32::from(acc.unsigned_abs())
        }
        Accumulator::Wide => decode_sample(sample).unsigned_abs(),
    }
}

/// Decodes a little-endian signed sample of 1 to 4 bytes.
pub fn decode_sample(sample: &[u8]) -> i32 {
    let mut raw = [0u8; 4];
    let len = sample.len().min(4);
    raw[4 - len..].copy_from_slice(&sample[..len]);
    // Bytes sit in the high end so the arithmetic shift sign-extends.
    i32::from_le_bytes(raw) >> (8 * (4 - len as u32)).min(31)
}

/// Appends `value` as a little-endian sample of the given depth. Values outside
/// the depth's range are clamped.
pub fn encode_sample(value: i32, depth: BitDepth, out: &mut Vec<u8>) {
    let full_scale = depth.full_scale() as i32;
    let clamped = value.clamp(-full_scale - 1, full_scale);
    out.extend_from_slice(&clamped.to_le_bytes()[..depth.bytes_per_sample()]);
}

pub fn f32_to_sample(sample: f32, depth: BitDepth) -> i32 {
    let full_scale = depth.full_scale() as f64;
    let scaled = (f64::from(sample) * full_scale).round();
    scaled.clamp(-full_scale - 1.0, full_scale) as i32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_narrow_matches_i16_for_16_bit() {
        for value in [0i16, 1, -1, 1234, -1234, i16::MAX, i16::MIN] {
            let bytes = value.to_le_bytes();
            assert_eq!(
                sample_magnitude(&bytes, Accumulator::Narrow),
                u32::from(value.unsigned_abs())
            );
            assert_eq!(
                sample_magnitude(&bytes, Accumulator::Narrow),
                sample_magnitude(&bytes, Accumulator::Wide)
            );
        }
    }

    #[test]
    fn test_narrow_drops_high_bytes() {
        // 0x7F_0001 at 24-bit: only the low word 0x0001 survives.
        assert_eq!(sample_magnitude(&[0x01, 0x00, 0x7F], Accumulator::Narrow), 1);
        assert_eq!(
            sample_magnitude(&[0x01, 0x00, 0x7F], Accumulator::Wide),
            0x7F_0001
        );
        // Low word 0xFFFF reads as -1.
        assert_eq!(
            sample_magnitude(&[0xFF, 0xFF, 0x00, 0x40], Accumulator::Narrow),
            1
        );
    }

    #[test]
    fn test_narrow_min_value() {
        assert_eq!(sample_magnitude(&[0x00, 0x80], Accumulator::Narrow), 32768);
    }

    #[test]
    fn test_decode_sample_sign_extends() {
        assert_eq!(decode_sample(&[0xFF, 0xFF, 0xFF]), -1);
        assert_eq!(decode_sample(&[0x00, 0x00, 0x80]), -8_388_608);
        assert_eq!(decode_sample(&[0xFF, 0xFF, 0x7F]), 8_388_607);
        assert_eq!(decode_sample(&i32::MIN.to_le_bytes()), i32::MIN);
        assert_eq!(decode_sample(&(-300i16).to_le_bytes()), -300);
        assert_eq!(sample_magnitude(&i32::MIN.to_le_bytes(), Accumulator::Wide), 1 << 31);
    }

    #[test]
    fn test_encode_sample() {
        let mut out = Vec::new();
        encode_sample(-2, BitDepth::Bits24, &mut out);
        encode_sample(40_000, BitDepth::Bits16, &mut out);
        assert_eq!(out, vec![0xFE, 0xFF, 0xFF, 0xFF, 0x7F]);
    }

    #[test]
    fn test_f32_to_sample() {
        assert_eq!(f32_to_sample(1.0, BitDepth::Bits16), 32767);
        assert_eq!(f32_to_sample(-2.0, BitDepth::Bits16), -32768);
        assert_eq!(f32_to_sample(0.5, BitDepth::Bits24), 4_194_304);
        assert_eq!(f32_to_sample(1.0, BitDepth::Bits32), i32::MAX);
    }
}
