//! Error types for the layout converter.
//!
//! Every variant is a caller-input error detected before the converter writes
//! a single output byte, so a failed call leaves the output buffer untouched.

use std::convert::Infallible;
use thiserror::Error;

/// Result type alias for converter operations
pub type Result<T> = std::result::Result<T, ConvertError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    /// Bit depth outside {16, 24, 32}
    #[error("Invalid bit depth: {0} (supported: 16, 24, 32)")]
    InvalidBitDepth(u16),

    /// Buffer length is not a whole number of frames
    #[error("Misaligned buffer: {len} bytes is not a multiple of the {frame_size}-byte frame")]
    MisalignedBuffer { len: usize, frame_size: usize },

    /// Channel selector is neither LEFT nor RIGHT
    #[error("Invalid channel selection: {0}")]
    InvalidChannel(String),

    /// The two mono inputs of a combine differ in length
    #[error("Mono inputs differ in length: left {left} bytes, right {right} bytes")]
    LengthMismatch { left: usize, right: usize },

    /// Output slice cannot hold the converted data
    #[error("Buffer too small: need {needed} bytes, got {actual}")]
    BufferTooSmall { needed: usize, actual: usize },
}

impl ConvertError {
    pub fn invalid_channel(raw: impl ToString) -> Self {
        Self::InvalidChannel(raw.to_string())
    }
}

// Lets typed arguments (`BitDepth`, `Channel`) pass through the same generic
// conversion bounds as their raw counterparts.
impl From<Infallible> for ConvertError {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            ConvertError::InvalidBitDepth(8).to_string(),
            "Invalid bit depth: 8 (supported: 16, 24, 32)"
        );
        assert_eq!(
            ConvertError::MisalignedBuffer { len: 5, frame_size: 4 }.to_string(),
            "Misaligned buffer: 5 bytes is not a multiple of the 4-byte frame"
        );
        assert_eq!(
            ConvertError::invalid_channel(7).to_string(),
            "Invalid channel selection: 7"
        );
    }
}
