/// Sum of Absolute Differences (SAD) / Manhattan distance on RGBA (all 4 channels).
/// note: alpha is included because rasters are premultiplied, where alpha affects blending.
use rayon::prelude::*;

/// pixels per rayon work unit; small rasters stay on one thread
const MIN_CHUNK_PIXELS: usize = 16 * 1024;

#[inline]
fn sad_scalar(target: &[u8], current: &[u8]) -> u64 {
    target
        .iter()
        .zip(current)
        .map(|(&t, &c)| t.abs_diff(c) as u64)
        .sum()
}

/// total SAD of two equally sized RGBA buffers.
/// integer accumulation, so the parallel split never changes the result.
pub fn sad_rgba(target_rgba: &[u8], current_rgba: &[u8]) -> u64 {
    profiling::scope!("sad_rgba");
    debug_assert_eq!(target_rgba.len(), current_rgba.len());
    debug_assert_eq!(target_rgba.len() % 4, 0);

    let chunk_bytes = MIN_CHUNK_PIXELS * 4;
    if target_rgba.len() <= chunk_bytes {
        return sad_scalar(target_rgba, current_rgba);
    }

    target_rgba
        .par_chunks(chunk_bytes)
        .zip(current_rgba.par_chunks(chunk_bytes))
        .map(|(t, c)| sad_scalar(t, c))
        .sum()
}
