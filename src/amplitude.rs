//! Per-channel amplitude state shared between the converter and the meter.
//!
//! The converter is the only writer; a display loop reads the values at its
//! own pace. Each channel is an independent atomic word so a reader never
//! sees a torn value, and no other synchronization is assumed.

use std::sync::atomic::{AtomicU32, Ordering};

use log::debug;
use serde::Serialize;

use crate::format::Channel;

/// Last average magnitude per channel.
#[derive(Debug, Default)]
pub struct AmplitudeTracker {
    left: AtomicU32,
    right: AtomicU32,
}

/// Point-in-time copy of both channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Levels {
    pub left: u32,
    pub right: u32,
}

impl AmplitudeTracker {
    /// Creates a tracker with both channels at zero.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn left(&self) -> u32 {
        self.left.load(Ordering::Acquire)
    }

    #[inline]
    pub fn right(&self) -> u32 {
        self.right.load(Ordering::Acquire)
    }

    pub fn get(&self, channel: Channel) -> u32 {
        self.slot(channel).load(Ordering::Acquire)
    }

    /// Reads both channels. The two loads are independent, so under a
    /// concurrent conversion they may come from different calls.
    pub fn levels(&self) -> Levels {
        Levels {
            left: self.left(),
            right: self.right(),
        }
    }

    /// Replaces the channel's value with the average of `sum`. An empty sum
    /// leaves the previous value in place.
    pub(crate) fn record(&self, channel: Channel, sum: &MagnitudeSum) {
        match sum.average() {
            Some(avg) => self.slot(channel).store(avg, Ordering::Release),
            None => debug!("No frames for {} channel, keeping previous amplitude", channel),
        }
    }

    fn slot(&self, channel: Channel) -> &AtomicU32 {
        match channel {
            Channel::Left => &self.left,
            Channel::Right => &self.right,
        }
    }
}

/// Running total of per-frame magnitudes for one channel of one buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct MagnitudeSum {
    total: u64,
    frames: u64,
}

impl MagnitudeSum {
    /// `frames` frames of digital silence.
    pub(crate) fn silence(frames: usize) -> Self {
        Self {
            total: 0,
            frames: frames as u64,
        }
    }

    #[inline]
    pub(crate) fn add(&mut self, magnitude: u32) {
        self.total += u64::from(magnitude);
        self.frames += 1;
    }

    pub(crate) fn average(&self) -> Option<u32> {
        if self.frames == 0 {
            return None;
        }
        // Mean of u32 values always fits back into u32.
        Some((self.total / self.frames) as u32)
    }
}
