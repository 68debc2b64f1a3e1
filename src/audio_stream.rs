use anyhow::{anyhow, Result};
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use log::{debug, info, warn};

use crate::convert::Converter;
use crate::format::{frame_count, BitDepth, Channel, MONO, STEREO};

/// Layout conversion applied to every chunk of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    ZeroPad(Channel),
    CopyPad,
    Combine,
    OneChannelSplit(Channel),
    TwoChannelSplit,
}

impl Operation {
    /// Channels per frame of the operation's input.
    pub fn input_channels(self) -> usize {
        match self {
            Operation::ZeroPad(_) | Operation::CopyPad | Operation::Combine => MONO,
            Operation::OneChannelSplit(_) | Operation::TwoChannelSplit => STEREO,
        }
    }

    /// Channels per frame of the operation's (first) output.
    pub fn output_channels(self) -> usize {
        match self {
            Operation::ZeroPad(_) | Operation::CopyPad | Operation::Combine => STEREO,
            Operation::OneChannelSplit(_) | Operation::TwoChannelSplit => MONO,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::ZeroPad(ch) => write!(f, "zero-pad ({})", ch),
            Operation::CopyPad => f.write_str("copy-pad"),
            Operation::Combine => f.write_str("combine"),
            Operation::OneChannelSplit(ch) => write!(f, "split ({})", ch),
            Operation::TwoChannelSplit => f.write_str("split-both"),
        }
    }
}

/// Input of a conversion: one buffer, or a left/right pair for `Combine`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Single(Vec<u8>),
    Pair { left: Vec<u8>, right: Vec<u8> },
}

impl Source {
    fn primary_len(&self) -> usize {
        match self {
            Source::Single(bytes) => bytes.len(),
            Source::Pair { left, .. } => left.len(),
        }
    }
}

/// Owned result of one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Converted {
    Single(Vec<u8>),
    Pair { left: Vec<u8>, right: Vec<u8> },
}

impl Converted {
    fn empty_like(op: Operation) -> Self {
        match op {
            Operation::TwoChannelSplit => Converted::Pair {
                left: Vec::new(),
                right: Vec::new(),
            },
            _ => Converted::Single(Vec::new()),
        }
    }

    /// Appends `other` to `self`. Both must come from the same operation.
    pub fn extend(&mut self, other: Converted) -> Result<()> {
        match (self, other) {
            (Converted::Single(dst), Converted::Single(src)) => {
                dst.extend(src);
                Ok(())
            }
            (
                Converted::Pair { left, right },
                Converted::Pair { left: l, right: r },
            ) => {
                left.extend(l);
                right.extend(r);
                Ok(())
            }
            _ => Err(anyhow!("Chunk output layout does not match the stream")),
        }
    }
}

impl Converter {
    /// Runs `op` over `source` into freshly allocated buffers.
    pub fn apply(&self, op: Operation, depth: BitDepth, source: &Source) -> Result<Converted> {
        match (op, source) {
            (Operation::ZeroPad(channel), Source::Single(input)) => {
                let mut out = vec![0u8; input.len() * 2];
                self.zero_pad(input, channel, depth, &mut out)?;
                Ok(Converted::Single(out))
            }
            (Operation::CopyPad, Source::Single(input)) => {
                let mut out = vec![0u8; input.len() * 2];
                self.copy_pad(input, depth, &mut out)?;
                Ok(Converted::Single(out))
            }
            (Operation::Combine, Source::Pair { left, right }) => {
                let mut out = vec![0u8; left.len() * 2];
                self.combine(left, right, depth, &mut out)?;
                Ok(Converted::Single(out))
            }
            (Operation::OneChannelSplit(channel), Source::Single(input)) => {
                let mut out = vec![0u8; input.len() / 2];
                self.one_channel_split(input, channel, depth, &mut out)?;
                Ok(Converted::Single(out))
            }
            (Operation::TwoChannelSplit, Source::Single(input)) => {
                let mut left = vec![0u8; input.len() / 2];
                let mut right = vec![0u8; input.len() / 2];
                self.two_channel_split(input, depth, &mut left, &mut right)?;
                Ok(Converted::Pair { left, right })
            }
            (Operation::Combine, Source::Single(_)) => {
                Err(anyhow!("combine needs a left and a right input"))
            }
            (op, Source::Pair { .. }) => Err(anyhow!("{} takes a single input", op)),
        }
    }
}

/// Settings for a chunked conversion run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamConfig {
    pub operation: Operation,
    pub bit_depth: BitDepth,
    pub chunk_frames: usize,
    pub sample_rate: u32,
    /// Sleep one chunk duration after each chunk.
    pub realtime: bool,
}

impl StreamConfig {
    fn chunk_bytes(&self) -> usize {
        self.chunk_frames.max(1) * self.bit_depth.frame_size(self.operation.input_channels())
    }

    fn chunk_duration(&self) -> Duration {
        Duration::from_secs_f64(self.chunk_frames as f64 / self.sample_rate.max(1) as f64)
    }
}

/// Splits `source` into chunk-sized sources of whole frames.
pub fn chunk_source(source: &Source, config: &StreamConfig) -> Result<Vec<Source>> {
    frame_count(
        source.primary_len(),
        config.bit_depth,
        config.operation.input_channels(),
    )?;
    let size = config.chunk_bytes();
    let chunks: Vec<Source> = match source {
        Source::Single(bytes) => bytes
            .chunks(size)
            .map(|c| Source::Single(c.to_vec()))
            .collect(),
        Source::Pair { left, right } => {
            if left.len() != right.len() {
                return Err(anyhow!(
                    "left and right inputs differ in length ({} vs {} bytes)",
                    left.len(),
                    right.len()
                ));
            }
            left.chunks(size)
                .zip(right.chunks(size))
                .map(|(l, r)| Source::Pair {
                    left: l.to_vec(),
                    right: r.to_vec(),
                })
                .collect()
        }
    };
    Ok(chunks)
}

/// Starts the conversion thread.
///
/// Each chunk of `source` is converted through `converter` and sent on
/// `output_tx`. The thread stops early when `shutdown_flag` is set and sets
/// it itself once the source is exhausted. The first conversion error ends
/// the run and is returned from the join handle.
pub fn start_conversion_thread(
    converter: Arc<Converter>,
    source: Source,
    config: StreamConfig,
    output_tx: Sender<Converted>,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<JoinHandle<Result<usize>>> {
    let chunks = chunk_source(&source, &config)?;
    info!(
        "Starting conversion thread: {} over {} chunks of {} frames",
        config.operation,
        chunks.len(),
        config.chunk_frames
    );

    let handle = thread::Builder::new()
        .name("pcm-convert".into())
        .spawn(move || {
            let result = convert_chunks(&converter, &chunks, &config, &output_tx, &shutdown_flag);
            shutdown_flag.store(true, Ordering::SeqCst);
            match &result {
                Ok(count) => debug!("Conversion thread finished after {} chunks", count),
                Err(e) => warn!("Conversion thread stopped: {}", e),
            }
            result
        })?;

    Ok(handle)
}

fn convert_chunks(
    converter: &Converter,
    chunks: &[Source],
    config: &StreamConfig,
    output_tx: &Sender<Converted>,
    shutdown_flag: &AtomicBool,
) -> Result<usize> {
    let mut converted_chunks = 0;
    for chunk in chunks {
        if shutdown_flag.load(Ordering::SeqCst) {
            debug!("Shutdown requested, stopping after {} chunks", converted_chunks);
            break;
        }
        let out = converter.apply(config.operation, config.bit_depth, chunk)?;
        if output_tx.send(out).is_err() {
            warn!("Output receiver dropped, stopping conversion");
            break;
        }
        converted_chunks += 1;
        if config.realtime {
            thread::sleep(config.chunk_duration());
        }
    }
    Ok(converted_chunks)
}

/// Collects every converted chunk from `output_rx` until the sender hangs up.
pub fn collect_output(op: Operation, output_rx: &Receiver<Converted>) -> Result<Converted> {
    let mut all = Converted::empty_like(op);
    for chunk in output_rx.iter() {
        all.extend(chunk)?;
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amplitude::AmplitudeTracker;
    use crossbeam_channel::unbounded;

    fn stream_config(operation: Operation, chunk_frames: usize) -> StreamConfig {
        StreamConfig {
            operation,
            bit_depth: BitDepth::Bits16,
            chunk_frames,
            sample_rate: 48_000,
            realtime: false,
        }
    }

    #[test]
    fn test_collect_rejects_mismatched_chunk() {
        let (tx, rx) = unbounded();
        tx.send(Converted::Pair {
            left: vec![1, 2],
            right: vec![3, 4],
        })
        .unwrap();
        tx.send(Converted::Single(vec![5, 6, 7, 8])).unwrap();
        drop(tx);
        assert!(collect_output(Operation::TwoChannelSplit, &rx).is_err());

        let mut single = Converted::Single(vec![1]);
        single.extend(Converted::Single(vec![2])).unwrap();
        assert_eq!(single, Converted::Single(vec![1, 2]));
    }

    #[test]
    fn test_apply_checks_source_shape() {
        let conv = Converter::new(Arc::new(AmplitudeTracker::new()));
        let single = Source::Single(vec![0; 4]);
        assert!(conv.apply(Operation::Combine, BitDepth::Bits16, &single).is_err());

        let pair = Source::Pair {
            left: vec![1, 0],
            right: vec![2, 0],
        };
        assert!(conv.apply(Operation::CopyPad, BitDepth::Bits16, &pair).is_err());
        assert_eq!(
            conv.apply(Operation::Combine, BitDepth::Bits16, &pair).unwrap(),
            Converted::Single(vec![1, 0, 2, 0])
        );
    }

    #[test]
    fn test_apply_surfaces_convert_error() {
        let conv = Converter::new(Arc::new(AmplitudeTracker::new()));
        let err = conv
            .apply(Operation::TwoChannelSplit, BitDepth::Bits16, &Source::Single(vec![0; 6]))
            .unwrap_err();
        assert!(err.downcast_ref::<crate::ConvertError>().is_some());
    }

    #[test]
    fn test_chunk_source_keeps_whole_frames() {
        let config = stream_config(Operation::TwoChannelSplit, 2);
        let chunks = chunk_source(&Source::Single(vec![0; 20]), &config).unwrap();
        let sizes: Vec<usize> = chunks
            .iter()
            .map(|c| match c {
                Source::Single(b) => b.len(),
                Source::Pair { .. } => unreachable!(),
            })
            .collect();
        assert_eq!(sizes, vec![8, 8, 4]);

        assert!(chunk_source(&Source::Single(vec![0; 6]), &config).is_err());
    }

    #[test]
    fn test_conversion_thread_matches_single_call() {
        let tracker = Arc::new(AmplitudeTracker::new());
        let converter = Arc::new(Converter::new(Arc::clone(&tracker)));
        let input: Vec<u8> = (0..40u8).collect();
        let source = Source::Single(input.clone());
        let config = stream_config(Operation::TwoChannelSplit, 3);

        let (tx, rx) = unbounded();
        let shutdown = Arc::new(AtomicBool::new(false));
        let handle =
            start_conversion_thread(Arc::clone(&converter), source.clone(), config, tx, Arc::clone(&shutdown))
                .unwrap();
        let streamed = collect_output(config.operation, &rx).unwrap();
        assert_eq!(handle.join().unwrap().unwrap(), 4);
        assert!(shutdown.load(Ordering::SeqCst));

        let whole = converter
            .apply(config.operation, config.bit_depth, &source)
            .unwrap();
        assert_eq!(streamed, whole);
    }

    #[test]
    fn test_conversion_thread_honours_shutdown() {
        let converter = Arc::new(Converter::new(Arc::new(AmplitudeTracker::new())));
        let (tx, rx) = unbounded();
        let shutdown = Arc::new(AtomicBool::new(true));
        let handle = start_conversion_thread(
            converter,
            Source::Single(vec![0; 64]),
            stream_config(Operation::CopyPad, 4),
            tx,
            shutdown,
        )
        .unwrap();
        assert_eq!(handle.join().unwrap().unwrap(), 0);
        assert!(rx.try_recv().is_err());
    }
}
