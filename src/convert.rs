//! Mono/stereo layout conversion over caller-owned byte buffers.
//!
//! Samples are moved as opaque byte groups and never decoded; the bytes are
//! only read a second time for the amplitude estimate. Every check runs before
//! the first output byte is written, so a failed call leaves `output` as it was.

use std::sync::Arc;

use log::{trace, warn};

use crate::amplitude::{AmplitudeTracker, MagnitudeSum};
use crate::conversion::{sample_magnitude, Accumulator};
use crate::error::{ConvertError, Result};
use crate::format::{frame_count, BitDepth, Channel, MONO, STEREO};

/// Runs layout conversions and feeds their amplitude into a shared tracker.
///
/// Bit depth and channel arguments accept either the typed values or their
/// raw forms (`u8`/`u16` bit depth, `u8` channel selector) so raw input is
/// validated in the same call.
#[derive(Debug, Clone)]
pub struct Converter {
    tracker: Arc<AmplitudeTracker>,
    accumulator: Accumulator,
}

impl Converter {
    pub fn new(tracker: Arc<AmplitudeTracker>) -> Self {
        Self {
            tracker,
            accumulator: Accumulator::default(),
        }
    }

    pub fn with_accumulator(mut self, accumulator: Accumulator) -> Self {
        self.accumulator = accumulator;
        self
    }

    pub fn tracker(&self) -> &Arc<AmplitudeTracker> {
        &self.tracker
    }

    pub fn accumulator(&self) -> Accumulator {
        self.accumulator
    }

    /// Mono to stereo, placing `input` in `channel` and silence in the other.
    ///
    /// Writes `2 * input.len()` bytes and returns that count. The tracker gets
    /// the mono level on `channel` and zero on the other channel.
    pub fn zero_pad<C, D>(
        &self,
        input: &[u8],
        channel: C,
        bit_depth: D,
        output: &mut [u8],
    ) -> Result<usize>
    where
        C: TryInto<Channel>,
        C::Error: Into<ConvertError>,
        D: TryInto<BitDepth>,
        D::Error: Into<ConvertError>,
    {
        let depth: BitDepth = resolve(bit_depth)?;
        let frames = frame_count(input.len(), depth, MONO)?;
        let channel: Channel = resolve(channel)?;
        let size = input.len() * 2;
        ensure_capacity(size, output)?;

        let bps = depth.bytes_per_sample();
        let mut signal = MagnitudeSum::default();
        for (sample, frame) in input
            .chunks_exact(bps)
            .zip(output[..size].chunks_exact_mut(bps * STEREO))
        {
            let (left, right) = frame.split_at_mut(bps);
            let (dst, silent) = match channel {
                Channel::Left => (left, right),
                Channel::Right => (right, left),
            };
            dst.copy_from_slice(sample);
            silent.fill(0);
            signal.add(sample_magnitude(sample, self.accumulator));
        }

        self.tracker.record(channel, &signal);
        self.tracker.record(channel.other(), &MagnitudeSum::silence(frames));
        trace!("zero_pad {} {} frames into {} channel", depth, frames, channel);
        Ok(size)
    }

    /// Mono to stereo, duplicating every sample into both channels.
    pub fn copy_pad<D>(&self, input: &[u8], bit_depth: D, output: &mut [u8]) -> Result<usize>
    where
        D: TryInto<BitDepth>,
        D::Error: Into<ConvertError>,
    {
        let depth: BitDepth = resolve(bit_depth)?;
        let frames = frame_count(input.len(), depth, MONO)?;
        let size = input.len() * 2;
        ensure_capacity(size, output)?;

        let bps = depth.bytes_per_sample();
        let mut signal = MagnitudeSum::default();
        for (sample, frame) in input
            .chunks_exact(bps)
            .zip(output[..size].chunks_exact_mut(bps * STEREO))
        {
            let (left, right) = frame.split_at_mut(bps);
            left.copy_from_slice(sample);
            right.copy_from_slice(sample);
            signal.add(sample_magnitude(sample, self.accumulator));
        }

        self.tracker.record(Channel::Left, &signal);
        self.tracker.record(Channel::Right, &signal);
        trace!("copy_pad {} {} frames", depth, frames);
        Ok(size)
    }

    /// Interleaves two equal-length mono buffers into one stereo buffer.
    pub fn combine<D>(
        &self,
        input_left: &[u8],
        input_right: &[u8],
        bit_depth: D,
        output: &mut [u8],
    ) -> Result<usize>
    where
        D: TryInto<BitDepth>,
        D::Error: Into<ConvertError>,
    {
        let depth: BitDepth = resolve(bit_depth)?;
        let frames = frame_count(input_left.len(), depth, MONO)?;
        frame_count(input_right.len(), depth, MONO)?;
        if input_left.len() != input_right.len() {
            warn!(
                "Combine inputs differ in length: {} vs {}",
                input_left.len(),
                input_right.len()
            );
            return Err(ConvertError::LengthMismatch {
                left: input_left.len(),
                right: input_right.len(),
            });
        }
        let size = input_left.len() * 2;
        ensure_capacity(size, output)?;

        let bps = depth.bytes_per_sample();
        let mut left_sum = MagnitudeSum::default();
        let mut right_sum = MagnitudeSum::default();
        for ((l, r), frame) in input_left
            .chunks_exact(bps)
            .zip(input_right.chunks_exact(bps))
            .zip(output[..size].chunks_exact_mut(bps * STEREO))
        {
            let (left, right) = frame.split_at_mut(bps);
            left.copy_from_slice(l);
            right.copy_from_slice(r);
            left_sum.add(sample_magnitude(l, self.accumulator));
            right_sum.add(sample_magnitude(r, self.accumulator));
        }

        self.tracker.record(Channel::Left, &left_sum);
        self.tracker.record(Channel::Right, &right_sum);
        trace!("combine {} {} frames", depth, frames);
        Ok(size)
    }

    /// Extracts one channel of an interleaved stereo buffer.
    ///
    /// Writes `input.len() / 2` bytes. Both channels of the input are metered.
    pub fn one_channel_split<C, D>(
        &self,
        input: &[u8],
        channel: C,
        bit_depth: D,
        output: &mut [u8],
    ) -> Result<usize>
    where
        C: TryInto<Channel>,
        C::Error: Into<ConvertError>,
        D: TryInto<BitDepth>,
        D::Error: Into<ConvertError>,
    {
        let depth: BitDepth = resolve(bit_depth)?;
        let frames = frame_count(input.len(), depth, STEREO)?;
        let channel: Channel = resolve(channel)?;
        let size = input.len() / 2;
        ensure_capacity(size, output)?;

        let bps = depth.bytes_per_sample();
        let mut sums = [MagnitudeSum::default(); STEREO];
        for (frame, dst) in input
            .chunks_exact(bps * STEREO)
            .zip(output[..size].chunks_exact_mut(bps))
        {
            let (left, right) = frame.split_at(bps);
            sums[0].add(sample_magnitude(left, self.accumulator));
            sums[1].add(sample_magnitude(right, self.accumulator));
            dst.copy_from_slice(&frame[channel.index() * bps..][..bps]);
        }

        self.record_stereo(&sums);
        trace!("one_channel_split {} {} frames from {} channel", depth, frames, channel);
        Ok(size)
    }

    /// Splits an interleaved stereo buffer into separate left and right
    /// buffers. Returns the bytes written to each output.
    pub fn two_channel_split<D>(
        &self,
        input: &[u8],
        bit_depth: D,
        output_left: &mut [u8],
        output_right: &mut [u8],
    ) -> Result<usize>
    where
        D: TryInto<BitDepth>,
        D::Error: Into<ConvertError>,
    {
        let depth: BitDepth = resolve(bit_depth)?;
        let frames = frame_count(input.len(), depth, STEREO)?;
        let size = input.len() / 2;
        ensure_capacity(size, output_left)?;
        ensure_capacity(size, output_right)?;

        let bps = depth.bytes_per_sample();
        let mut sums = [MagnitudeSum::default(); STEREO];
        for ((frame, l), r) in input
            .chunks_exact(bps * STEREO)
            .zip(output_left[..size].chunks_exact_mut(bps))
            .zip(output_right[..size].chunks_exact_mut(bps))
        {
            let (left, right) = frame.split_at(bps);
            l.copy_from_slice(left);
            r.copy_from_slice(right);
            sums[0].add(sample_magnitude(left, self.accumulator));
            sums[1].add(sample_magnitude(right, self.accumulator));
        }

        self.record_stereo(&sums);
        trace!("two_channel_split {} {} frames", depth, frames);
        Ok(size)
    }

    fn record_stereo(&self, sums: &[MagnitudeSum; STEREO]) {
        self.tracker.record(Channel::Left, &sums[0]);
        self.tracker.record(Channel::Right, &sums[1]);
    }
}

fn resolve<T, V>(value: V) -> Result<T>
where
    V: TryInto<T>,
    V::Error: Into<ConvertError>,
{
    value.try_into().map_err(Into::into)
}

fn ensure_capacity(needed: usize, output: &[u8]) -> Result<()> {
    if output.len() < needed {
        warn!("Output buffer too small: need {} bytes, got {}", needed, output.len());
        return Err(ConvertError::BufferTooSmall {
            needed,
            actual: output.len(),
        });
    }
    Ok(())
}
