use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use crossbeam_channel::Sender;
use log::{debug, warn, error};

use crate::meter::{LevelMeter, MeterReading};

const POLL_INTERVAL: Duration = Duration::from_millis(5);
const MAX_SEND_FAILURES: u32 = 5;

/// Starts the meter thread.
///
/// Every `refresh` the meter is read and the reading sent on `reading_tx`.
/// Once `shutdown_flag` is set one last reading is sent, so the final level
/// of a finished stream is always delivered. Returns the number of readings
/// sent.
pub fn start_meter_thread(
    meter: Arc<LevelMeter>,
    refresh: Duration,
    reading_tx: Sender<MeterReading>,
    shutdown_flag: Arc<AtomicBool>,
) -> std::io::Result<JoinHandle<usize>> {
    debug!(target: "get_results", "Starting meter thread, refresh every {:?}", refresh);

    thread::Builder::new()
        .name("pcm-meter".into())
        .spawn(move || {
            let mut update_count = 0;
            let mut consecutive_send_failures = 0;
            let mut last_sent = Instant::now();

            while !shutdown_flag.load(Ordering::SeqCst) {
                if last_sent.elapsed() >= refresh {
                    match reading_tx.send(meter.read()) {
                        Ok(_) => {
                            update_count += 1;
                            consecutive_send_failures = 0;
                        }
                        Err(e) => {
                            consecutive_send_failures += 1;
                            warn!(target: "get_results",
                                  "Failed to send meter reading #{} (attempt {}): {}",
                                  update_count + 1, consecutive_send_failures, e);
                            if consecutive_send_failures > MAX_SEND_FAILURES {
                                error!(target: "get_results", "Reading receiver gone. Stopping meter thread.");
                                return update_count;
                            }
                        }
                    }
                    last_sent = Instant::now();
                }
                thread::sleep(POLL_INTERVAL.min(refresh).max(Duration::from_millis(1)));
            }

            if reading_tx.send(meter.read()).is_ok() {
                update_count += 1;
            }
            debug!(target: "get_results", "Meter thread shutting down after {} readings", update_count);
            update_count
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amplitude::AmplitudeTracker;
    use crate::conversion::Accumulator;
    use crate::convert::Converter;
    use crate::format::{BitDepth, Channel};
    use crossbeam_channel::unbounded;

    #[test]
    fn test_final_reading_after_shutdown() {
        let tracker = Arc::new(AmplitudeTracker::new());
        let meter = Arc::new(LevelMeter::new(Arc::clone(&tracker), BitDepth::Bits16, Accumulator::Narrow));
        let shutdown = Arc::new(AtomicBool::new(false));
        let (tx, rx) = unbounded();

        let handle = start_meter_thread(meter, Duration::from_millis(1), tx, Arc::clone(&shutdown)).unwrap();

        let conv = Converter::new(tracker);
        let mut out = [0u8; 4];
        conv.zero_pad(&20_839i16.to_le_bytes(), Channel::Right, BitDepth::Bits16, &mut out).unwrap();
        shutdown.store(true, Ordering::SeqCst);

        let sent = handle.join().unwrap();
        let readings: Vec<MeterReading> = rx.try_iter().collect();
        assert_eq!(readings.len(), sent);
        let last = readings.last().unwrap();
        assert_eq!(last.right_percent, 100);
        assert_eq!(last.left_percent, 0);
    }

    #[test]
    fn test_interrupted_stream_reads_silence() {
        let tracker = Arc::new(AmplitudeTracker::new());
        let meter = Arc::new(LevelMeter::new(Arc::clone(&tracker), BitDepth::Bits16, Accumulator::Narrow));
        let conv = Converter::new(tracker);
        let mut out = [0u8; 4];
        conv.copy_pad(&20_839i16.to_le_bytes(), BitDepth::Bits16, &mut out).unwrap();

        meter.set_streaming(false);
        let shutdown = Arc::new(AtomicBool::new(true));
        let (tx, rx) = unbounded();
        let handle = start_meter_thread(meter, Duration::from_millis(1), tx, shutdown).unwrap();
        assert_eq!(handle.join().unwrap(), 1);

        let last = rx.try_iter().last().unwrap();
        assert_eq!((last.left_percent, last.right_percent), (0, 0));
        assert_eq!((last.raw.left, last.raw.right), (0, 0));
    }

    #[test]
    fn test_stops_when_receiver_dropped() {
        let meter = Arc::new(LevelMeter::new(
            Arc::new(AmplitudeTracker::new()),
            BitDepth::Bits16,
            Accumulator::Narrow,
        ));
        let (tx, rx) = unbounded();
        drop(rx);
        let handle = start_meter_thread(meter, Duration::from_millis(1), tx, Arc::new(AtomicBool::new(false))).unwrap();
        assert_eq!(handle.join().unwrap(), 0);
    }
}
