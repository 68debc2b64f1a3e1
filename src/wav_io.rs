//! Loading and saving PCM as WAV (via `hound`) or headerless raw bytes.

use std::fs;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use log::info;

use crate::conversion::{decode_sample, encode_sample};
use crate::format::{frame_count, BitDepth};

/// Layout of a PCM byte buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PcmSpec {
    pub channels: u16,
    pub sample_rate: u32,
    pub bit_depth: BitDepth,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PcmData {
    pub spec: PcmSpec,
    pub bytes: Vec<u8>,
}

pub fn is_wav(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("wav"))
        .unwrap_or(false)
}

/// Reads `path` as WAV if it has a `.wav` extension, otherwise as raw PCM
/// described by `raw_spec`.
pub fn read_pcm(path: &Path, raw_spec: PcmSpec) -> Result<PcmData> {
    if is_wav(path) {
        return read_wav(path);
    }
    let bytes = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    info!("Loaded {} bytes of raw PCM from {}", bytes.len(), path.display());
    Ok(PcmData { spec: raw_spec, bytes })
}

pub fn read_wav(path: &Path) -> Result<PcmData> {
    let mut reader = hound::WavReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let wav_spec = reader.spec();
    if wav_spec.sample_format != hound::SampleFormat::Int {
        return Err(anyhow!("{}: only integer PCM is supported", path.display()));
    }
    let bit_depth = BitDepth::try_from(wav_spec.bits_per_sample)?;

    let mut bytes = Vec::with_capacity(reader.len() as usize * bit_depth.bytes_per_sample());
    for sample in reader.samples::<i32>() {
        encode_sample(sample?, bit_depth, &mut bytes);
    }

    let spec = PcmSpec {
        channels: wav_spec.channels,
        sample_rate: wav_spec.sample_rate,
        bit_depth,
    };
    info!(
        "Loaded {} ({} ch, {} Hz, {}, {} bytes)",
        path.display(),
        spec.channels,
        spec.sample_rate,
        spec.bit_depth,
        bytes.len()
    );
    Ok(PcmData { spec, bytes })
}

/// Writes `bytes` as WAV if `path` ends in `.wav`, otherwise as raw PCM.
pub fn write_pcm(path: &Path, spec: PcmSpec, bytes: &[u8]) -> Result<()> {
    if !is_wav(path) {
        fs::write(path, bytes).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {} bytes of raw PCM to {}", bytes.len(), path.display());
        return Ok(());
    }

    frame_count(bytes.len(), spec.bit_depth, spec.channels as usize)?;
    let wav_spec = hound::WavSpec {
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        bits_per_sample: spec.bit_depth.bits(),
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, wav_spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    for sample in bytes.chunks_exact(spec.bit_depth.bytes_per_sample()) {
        writer.write_sample(decode_sample(sample))?;
    }
    writer.finalize()?;
    info!("Wrote {} to {}", spec.bit_depth, path.display());
    Ok(())
}
