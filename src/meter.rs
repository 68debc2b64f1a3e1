//! VU-style level meter over an [`AmplitudeTracker`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;

use crate::amplitude::{AmplitudeTracker, Levels};
use crate::conversion::Accumulator;
use crate::format::{BitDepth, Channel};

/// Mean absolute value of a unit sine wave (2/π, rounded).
pub const SINE_AVERAGE_RATIO: f64 = 0.636;

/// Highest average magnitude a full-scale sine produces for the proxy.
///
/// The narrow proxy never exceeds 16 bits, so its reference is the 16-bit
/// one whatever the sample depth.
pub fn full_scale_reference(depth: BitDepth, accumulator: Accumulator) -> f64 {
    let full_scale = match accumulator {
        Accumulator::Narrow => BitDepth::Bits16.full_scale(),
        Accumulator::Wide => depth.full_scale(),
    };
    full_scale as f64 * SINE_AVERAGE_RATIO
}

/// Scales a tracker value to 0..=100.
pub fn level_percent(value: u32, reference: f64) -> u8 {
    if reference <= 0.0 {
        return 0;
    }
    (f64::from(value) / reference * 100.0).round().clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct MeterReading {
    pub raw: Levels,
    pub left_percent: u8,
    pub right_percent: u8,
}

impl MeterReading {
    pub fn percent(&self, channel: Channel) -> u8 {
        match channel {
            Channel::Left => self.left_percent,
            Channel::Right => self.right_percent,
        }
    }
}

/// Reads the tracker and scales it for display. While not streaming the
/// meter reads zero.
#[derive(Debug)]
pub struct LevelMeter {
    tracker: Arc<AmplitudeTracker>,
    reference: f64,
    streaming: AtomicBool,
}

impl LevelMeter {
    pub fn new(tracker: Arc<AmplitudeTracker>, depth: BitDepth, accumulator: Accumulator) -> Self {
        Self {
            tracker,
            reference: full_scale_reference(depth, accumulator),
            streaming: AtomicBool::new(true),
        }
    }

    pub fn reference(&self) -> f64 {
        self.reference
    }

    pub fn set_streaming(&self, streaming: bool) {
        self.streaming.store(streaming, Ordering::Release);
    }

    pub fn is_streaming(&self) -> bool {
        self.streaming.load(Ordering::Acquire)
    }

    pub fn percent(&self, channel: Channel) -> u8 {
        self.read().percent(channel)
    }

    pub fn read(&self) -> MeterReading {
        if !self.is_streaming() {
            return MeterReading::default();
        }
        let raw = self.tracker.levels();
        MeterReading {
            raw,
            left_percent: level_percent(raw.left, self.reference),
            right_percent: level_percent(raw.right, self.reference),
        }
    }
}
