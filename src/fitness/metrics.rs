//─────────────────────────────────────────────────────────────────────────────
// resolution-invariant metrics (SAD/px, PSNR) for progress logging
//─────────────────────────────────────────────────────────────────────────────

/// RGBA
pub const FITNESS_CHANNELS_F64: f64 = 4.0;

/// PSNR in decibels. higher is better (30 dB acceptable, 40+ dB very good)
#[inline]
pub fn psnr_from_mse(mse: f64, peak: f64) -> f64 {
    let mse = mse.max(1e-12);
    10.0 * ((peak * peak) / mse).log10()
}

/// snapshot of resolution-invariant metrics derived from a raw SAD
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MetricsSnapshot {
    pub sad_per_px: f64,
    pub psnr: f64,
}

impl MetricsSnapshot {
    /// pseudo-MSE = SAD / (N * channels), good enough for relative progress
    pub fn from_sad(sad: f64, num_pixels: usize, peak: f64) -> Self {
        let n = (num_pixels.max(1)) as f64;
        let sad_per_px = sad / n;
        let pseudo_mse = sad / (n * FITNESS_CHANNELS_F64);
        Self { sad_per_px, psnr: psnr_from_mse(pseudo_mse, peak) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sad_per_px() {
        let m = MetricsSnapshot::from_sad(765.0 * 100.0, 100, 255.0);
        assert_eq!(m.sad_per_px, 765.0);
    }

    #[test]
    fn test_psnr_monotonic() {
        let good = MetricsSnapshot::from_sad(1_000.0, 1_000, 255.0);
        let bad = MetricsSnapshot::from_sad(100_000.0, 1_000, 255.0);
        assert!(good.psnr > bad.psnr);
        // perfect match is clamped, not infinite
        assert!(MetricsSnapshot::from_sad(0.0, 10, 255.0).psnr.is_finite());
    }
}
