use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{Result, Context};
use log::{info, warn};

use crate::conversion::Accumulator;
use crate::format::BitDepth;
use crate::utils::{calculate_chunk_frames, DEFAULT_BAR_WIDTH, DEFAULT_REFRESH_MS, DEFAULT_SAMPLE_RATE};

pub const DEFAULT_PRESET: &str = "default";

// A single preset with every setting the meter pipeline reads
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct MeterPreset {
    pub accumulator: Accumulator,
    // Used for raw PCM input; WAV headers override it
    pub bit_depth: BitDepth,
    pub sample_rate: u32,
    // Unset means derived from the stream's sample rate and refresh_ms
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_frames: Option<usize>,
    pub refresh_ms: u64,
    pub bar_width: usize,
    // Pace conversions at the stream's sample rate
    pub realtime: bool,
}

impl Default for MeterPreset {
    fn default() -> Self {
        Self {
            accumulator: Accumulator::Narrow,
            bit_depth: BitDepth::Bits16,
            sample_rate: DEFAULT_SAMPLE_RATE,
            chunk_frames: None,
            refresh_ms: DEFAULT_REFRESH_MS,
            bar_width: DEFAULT_BAR_WIDTH,
            realtime: false,
        }
    }
}

impl MeterPreset {
    /// Frames per conversion chunk for a stream at `sample_rate`.
    pub fn chunk_frames_for(&self, sample_rate: u32) -> usize {
        self.chunk_frames
            .unwrap_or_else(|| calculate_chunk_frames(sample_rate, self.refresh_ms))
    }
}

// Manages loading, saving, and holding presets
pub struct PresetManager {
    pub presets: BTreeMap<String, MeterPreset>,
    file_path: PathBuf,
}

impl PresetManager {
    pub fn new(file_path: impl AsRef<Path>) -> Result<Self> {
        let file_path = file_path.as_ref().to_path_buf();
        let mut presets = BTreeMap::new();
        if file_path.exists() {
            info!("Loading presets from {}", file_path.display());
            let yaml_str = fs::read_to_string(&file_path)
                .with_context(|| format!("Failed to read {}", file_path.display()))?;
            presets = serde_yaml::from_str(&yaml_str)
                .with_context(|| format!("Failed to parse {}", file_path.display()))?;
        } else {
            info!(
                "No presets file found at {}. Creating with default preset.",
                file_path.display()
            );
        }

        let mut manager = Self { presets, file_path };

        if !manager.presets.contains_key(DEFAULT_PRESET) {
            warn!("'{}' preset not found. Creating and saving it.", DEFAULT_PRESET);
            manager
                .presets
                .insert(DEFAULT_PRESET.to_string(), MeterPreset::default());
        }

        manager.save()?;

        Ok(manager)
    }

    pub fn save(&self) -> Result<()> {
        let yaml_str = serde_yaml::to_string(&self.presets)?;
        fs::write(&self.file_path, yaml_str)
            .with_context(|| format!("Failed to write {}", self.file_path.display()))?;
        info!("Presets saved to {}", self.file_path.display());
        Ok(())
    }

    /// Looks up a preset, falling back to the default one.
    pub fn get(&self, name: &str) -> MeterPreset {
        match self.presets.get(name) {
            Some(preset) => preset.clone(),
            None => {
                warn!("Preset '{}' not found, using '{}'", name, DEFAULT_PRESET);
                self.presets
                    .get(DEFAULT_PRESET)
                    .cloned()
                    .unwrap_or_default()
            }
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, preset: MeterPreset) {
        self.presets.insert(name.into(), preset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_creates_file_with_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.yaml");
        let manager = PresetManager::new(&path).unwrap();
        assert!(path.exists());
        assert_eq!(manager.get(DEFAULT_PRESET), MeterPreset::default());
    }

    #[test]
    fn test_round_trip_and_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.yaml");
        let wide = MeterPreset {
            accumulator: Accumulator::Wide,
            bit_depth: BitDepth::Bits24,
            realtime: true,
            ..MeterPreset::default()
        };
        {
            let mut manager = PresetManager::new(&path).unwrap();
            manager.insert("studio", wide.clone());
            manager.save().unwrap();
        }

        let manager = PresetManager::new(&path).unwrap();
        assert_eq!(manager.get("studio"), wide);
        assert_eq!(manager.get("missing"), MeterPreset::default());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.yaml");
        fs::write(&path, "loud:\n  bit_depth: 32\n  accumulator: wide\n").unwrap();

        let manager = PresetManager::new(&path).unwrap();
        let loud = manager.get("loud");
        assert_eq!(loud.bit_depth, BitDepth::Bits32);
        assert_eq!(loud.accumulator, Accumulator::Wide);
        assert_eq!(loud.refresh_ms, DEFAULT_REFRESH_MS);
        assert!(manager.presets.contains_key(DEFAULT_PRESET));
    }

    #[test]
    fn test_chunk_frames_follow_refresh_unless_set() {
        let preset = MeterPreset::default();
        assert_eq!(preset.chunk_frames_for(48_000), 1200);
        assert_eq!(preset.chunk_frames_for(8_000), 200);

        let fixed = MeterPreset {
            chunk_frames: Some(256),
            ..MeterPreset::default()
        };
        assert_eq!(fixed.chunk_frames_for(48_000), 256);

        let yaml = serde_yaml::to_string(&preset).unwrap();
        assert!(!yaml.contains("chunk_frames"));
        let parsed: MeterPreset = serde_yaml::from_str("chunk_frames: 64\n").unwrap();
        assert_eq!(parsed.chunk_frames, Some(64));
    }

    #[test]
    fn test_rejects_bad_bit_depth() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("presets.yaml");
        fs::write(&path, "broken:\n  bit_depth: 20\n").unwrap();
        assert!(PresetManager::new(&path).is_err());
    }
}
