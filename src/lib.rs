//! PCM channel-layout conversion with a built-in level meter.
//!
//! [`Converter`] moves samples between mono and interleaved-stereo layouts
//! (zero-pad, copy-pad, combine, one/two-channel split) at 16, 24 or 32 bits.
//! Each successful call also refreshes a per-channel magnitude estimate in an
//! [`AmplitudeTracker`], which a [`LevelMeter`] reads from another thread.
//!
//! ```rust
//! use std::sync::Arc;
//! use pcm_channel_meter::{AmplitudeTracker, Channel, Converter};
//!
//! let tracker = Arc::new(AmplitudeTracker::new());
//! let converter = Converter::new(Arc::clone(&tracker));
//!
//! let mono = [0x01, 0x00, 0x02, 0x00];
//! let mut stereo = [0u8; 8];
//! let written = converter.zero_pad(&mono, Channel::Left, 16u8, &mut stereo).unwrap();
//!
//! assert_eq!(written, 8);
//! assert_eq!(stereo, [0x01, 0x00, 0x00, 0x00, 0x02, 0x00, 0x00, 0x00]);
//! assert_eq!(tracker.right(), 0);
//! ```

pub mod amplitude;
pub mod audio_stream;
pub mod conversion;
pub mod convert;
pub mod display;
pub mod error;
pub mod format;
pub mod get_results;
pub mod make_waves;
pub mod meter;
pub mod presets;
pub mod utils;
pub mod wav_io;

pub use amplitude::{AmplitudeTracker, Levels};
pub use audio_stream::{Converted, Operation, Source, StreamConfig};
pub use conversion::Accumulator;
pub use convert::Converter;
pub use error::{ConvertError, Result};
pub use format::{BitDepth, Channel};
pub use meter::{LevelMeter, MeterReading};
