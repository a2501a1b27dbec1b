//! Windowing stage: raw frame × window table → complex frame.

use rustfft::num_complex::Complex;

use crate::window::WindowTable;

/// Writes `(frame[i] * window[i], 0.0)` into `out[i]` for every sample.
///
/// `out` is overwritten in place; lengths are equal by construction of the
/// pipeline buffers.
pub fn apply_window(frame: &[f32], window: &WindowTable, out: &mut [Complex<f32>]) {
    debug_assert_eq!(frame.len(), window.len());
    debug_assert_eq!(frame.len(), out.len());
    for ((dst, &sample), &coeff) in out.iter_mut().zip(frame).zip(window.coefficients()) {
        *dst = Complex::new(sample * coeff, 0.0);
    }
}
