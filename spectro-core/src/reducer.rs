//! # Spectrum Reducer
//!
//! Turns the unpacked one-sided spectrum into display magnitudes and removes
//! the baseline. The converter output always sits on a large constant offset
//! (mid-scale bias plus drift) which would otherwise dwarf every other bin.

use rustfft::num_complex::Complex;

/// Magnitude computation and baseline suppression for a fixed frame length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpectrumReducer {
    frame_length: usize,
    dc_suppress_bins: usize,
}

impl SpectrumReducer {
    pub fn new(frame_length: usize, dc_suppress_bins: usize) -> Self {
        Self {
            frame_length,
            dc_suppress_bins,
        }
    }

    /// Number of bins produced per frame.
    pub fn bins(&self) -> usize {
        self.frame_length / 2
    }

    pub fn dc_suppress_bins(&self) -> usize {
        self.dc_suppress_bins
    }

    /// Fills `out[i] = |bins[i]| / N` for every reported bin, then zeroes the
    /// first `dc_suppress_bins` entries.
    ///
    /// # Arguments
    /// * `bins` - Unpacked transform output; only the first `N/2` entries are read.
    /// * `out` - Magnitude buffer of exactly `N/2` entries.
    ///
    /// Bin 0 is treated like every other bin, so with no suppression it shows
    /// the combined magnitude of the packed DC and Nyquist terms.
    pub fn reduce(&self, bins: &[Complex<f32>], out: &mut [f32]) {
        let count = self.bins();
        debug_assert!(bins.len() >= count);
        debug_assert_eq!(out.len(), count);

        let scale = 1.0 / self.frame_length as f32;
        for (dst, c) in out.iter_mut().zip(&bins[..count]) {
            *dst = c.norm() * scale; // .norm() is sqrt(re^2 + im^2)
        }

        let suppress = self.dc_suppress_bins.min(count);
        out[..suppress].fill(0.0);
    }
}

/// Index of the largest magnitude, `None` for an empty or all-NaN spectrum.
pub fn peak_bin(spectrum: &[f32]) -> Option<usize> {
    spectrum
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.is_nan())
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
}

/// Centre frequency of `bin` in Hz.
pub fn bin_frequency(bin: usize, sample_rate_hz: u32, frame_length: usize) -> f32 {
    bin as f32 * sample_rate_hz as f32 / frame_length as f32
}
