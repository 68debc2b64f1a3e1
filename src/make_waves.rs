use std::f64::consts::TAU;
use log::debug;

use crate::conversion::{encode_sample, f32_to_sample};
use crate::error::{ConvertError, Result};
use crate::format::BitDepth;

/// Builds a mono sine wave as little-endian PCM.
///
/// # Arguments
///
/// * `depth` - Sample width of the output
/// * `frequency` - Tone frequency in Hz
/// * `sample_rate` - Audio sample rate in Hz
/// * `frames` - Number of samples to generate
/// * `amplitude` - Peak level relative to full scale (0.0 to 1.0)
///
/// # Returns
///
/// `frames * depth.bytes_per_sample()` bytes of PCM
pub fn sine_pcm(
    depth: BitDepth,
    frequency: f32,
    sample_rate: u32,
    frames: usize,
    amplitude: f32,
) -> Vec<u8> {
    let amplitude = f64::from(amplitude.clamp(0.0, 1.0));
    let phase_delta = TAU * f64::from(frequency) / f64::from(sample_rate.max(1));
    let mut pcm = Vec::with_capacity(frames * depth.bytes_per_sample());

    // Phase is accumulated in f64 and kept in [0, TAU).
    let mut phase = 0.0f64;
    for _ in 0..frames {
        let value = (amplitude * phase.sin()) as f32;
        encode_sample(f32_to_sample(value, depth), depth, &mut pcm);
        phase = (phase + phase_delta) % TAU;
    }

    debug!(
        "Built sine - {} Hz, {} frames, {}, amplitude {:.3}",
        frequency, frames, depth, amplitude
    );

    pcm
}

/// Interleaves two mono buffers of equal length into one stereo buffer.
pub fn interleave(left: &[u8], right: &[u8], depth: BitDepth) -> Result<Vec<u8>> {
    if left.len() != right.len() {
        return Err(ConvertError::LengthMismatch {
            left: left.len(),
            right: right.len(),
        });
    }
    let bps = depth.bytes_per_sample();
    Ok(left
        .chunks_exact(bps)
        .zip(right.chunks_exact(bps))
        .flat_map(|(l, r)| l.iter().chain(r.iter()).copied())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversion::decode_sample;

    #[test]
    fn test_sine_length_and_peak() {
        for depth in BitDepth::ALL {
            let pcm = sine_pcm(depth, 1000.0, 48_000, 480, 1.0);
            assert_eq!(pcm.len(), 480 * depth.bytes_per_sample());

            let peak = pcm
                .chunks_exact(depth.bytes_per_sample())
                .map(|s| i64::from(decode_sample(s)).abs())
                .max()
                .unwrap();
            assert!(peak as f64 >= depth.full_scale() as f64 * 0.99);
            assert!(peak <= depth.full_scale());
        }
    }

    #[test]
    fn test_long_tone_stays_in_phase() {
        let sample_rate = 48_000;
        let frames = 120 * sample_rate as usize;
        let depth = BitDepth::Bits16;
        let pcm = sine_pcm(depth, 440.0, sample_rate, frames, 1.0);

        let full_scale = depth.full_scale() as f64;
        let worst = pcm
            .chunks_exact(depth.bytes_per_sample())
            .enumerate()
            .skip(frames - sample_rate as usize)
            .map(|(i, s)| {
                let expected = (full_scale * (TAU * 440.0 * i as f64 / sample_rate as f64).sin()).round();
                (f64::from(decode_sample(s)) - expected).abs()
            })
            .fold(0.0, f64::max);
        assert!(worst <= 1.0, "worst error {}", worst);
    }

    #[test]
    fn test_silence() {
        let pcm = sine_pcm(BitDepth::Bits16, 440.0, 16_000, 16, 0.0);
        assert!(pcm.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_interleave() {
        let stereo = interleave(&[1, 2, 3, 4], &[5, 6, 7, 8], BitDepth::Bits16).unwrap();
        assert_eq!(stereo, vec![1, 2, 5, 6, 3, 4, 7, 8]);
        assert_eq!(
            interleave(&[1, 2, 3, 4], &[5, 6], BitDepth::Bits16),
            Err(ConvertError::LengthMismatch { left: 4, right: 2 })
        );
    }
}
