//! PCM layout primitives: bit depth, channel selector and frame alignment.

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::{ConvertError, Result};

/// Samples per frame in a mono buffer.
pub const MONO: usize = 1;
/// Samples per frame in an interleaved stereo buffer.
pub const STEREO: usize = 2;

/// Supported sample widths. Samples are little-endian signed integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum BitDepth {
    Bits16,
    Bits24,
    Bits32,
}

impl BitDepth {
    pub const ALL: [BitDepth; 3] = [BitDepth::Bits16, BitDepth::Bits24, BitDepth::Bits32];

    pub fn bits(self) -> u16 {
        match self {
            BitDepth::Bits16 => 16,
            BitDepth::Bits24 => 24,
            BitDepth::Bits32 => 32,
        }
    }

    #[inline]
    pub fn bytes_per_sample(self) -> usize {
        self.bits() as usize / 8
    }

    /// Bytes in one frame of `channels` samples.
    #[inline]
    pub fn frame_size(self, channels: usize) -> usize {
        self.bytes_per_sample() * channels
    }

    /// Largest positive sample value, e.g. 32767 for 16-bit.
    pub fn full_scale(self) -> i64 {
        (1i64 << (self.bits() - 1)) - 1
    }
}

impl TryFrom<u16> for BitDepth {
    type Error = ConvertError;

    fn try_from(bits: u16) -> Result<Self> {
        match bits {
            16 => Ok(BitDepth::Bits16),
            24 => Ok(BitDepth::Bits24),
            32 => Ok(BitDepth::Bits32),
            other => {
                warn!("Invalid bit depth: {}", other);
                Err(ConvertError::InvalidBitDepth(other))
            }
        }
    }
}

impl TryFrom<u8> for BitDepth {
    type Error = ConvertError;

    fn try_from(bits: u8) -> Result<Self> {
        BitDepth::try_from(u16::from(bits))
    }
}

impl From<BitDepth> for u16 {
    fn from(depth: BitDepth) -> Self {
        depth.bits()
    }
}

impl fmt::Display for BitDepth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-bit", self.bits())
    }
}

/// Logical channel of a stereo pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Left,
    Right,
}

impl Channel {
    /// The opposite channel of the pair.
    pub fn other(self) -> Self {
        match self {
            Channel::Left => Channel::Right,
            Channel::Right => Channel::Left,
        }
    }

    /// Slot of this channel inside an interleaved frame.
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Channel::Left => 0,
            Channel::Right => 1,
        }
    }
}

/// Raw selector values: 0 is left, 1 is right.
impl TryFrom<u8> for Channel {
    type Error = ConvertError;

    fn try_from(raw: u8) -> Result<Self> {
        match raw {
            0 => Ok(Channel::Left),
            1 => Ok(Channel::Right),
            other => {
                warn!("Invalid channel selection: {}", other);
                Err(ConvertError::invalid_channel(other))
            }
        }
    }
}

impl FromStr for Channel {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l" | "left" => Ok(Channel::Left),
            "r" | "right" => Ok(Channel::Right),
            _ => {
                warn!("Invalid channel selection: {:?}", s);
                Err(ConvertError::invalid_channel(s))
            }
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Left => f.write_str("left"),
            Channel::Right => f.write_str("right"),
        }
    }
}

/// Checks that `len` holds a whole number of `channels`-sample frames and
/// returns the frame count.
pub fn frame_count(len: usize, depth: BitDepth, channels: usize) -> Result<usize> {
    let frame_size = depth.frame_size(channels);
    if len % frame_size != 0 {
        warn!(
            "Size: {} is not divisible by bytes per sample x num channels ({})",
            len, frame_size
        );
        return Err(ConvertError::MisalignedBuffer { len, frame_size });
    }
    Ok(len / frame_size)
}
