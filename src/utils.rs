use log::debug;

pub const MIN_CHUNK_FRAMES: usize = 16;
pub const MAX_CHUNK_FRAMES: usize = 65536;
pub const DEFAULT_REFRESH_MS: u64 = 100;
pub const DEFAULT_SAMPLE_RATE: u32 = 48_000;
pub const DEFAULT_BAR_WIDTH: usize = 40;

/// Picks a chunk size so that a meter refreshing every `refresh_ms` sees
/// roughly four fresh conversions per refresh.
pub fn calculate_chunk_frames(sample_rate: u32, refresh_ms: u64) -> usize {
    let frames_per_refresh = sample_rate as u64 * refresh_ms.max(1) / 1000;
    let chunk = ((frames_per_refresh / 4) as usize).clamp(MIN_CHUNK_FRAMES, MAX_CHUNK_FRAMES);

    debug!(
        "Calculated chunk size - SR: {}, refresh: {} ms, frames: {}",
        sample_rate, refresh_ms, chunk
    );

    chunk
}
