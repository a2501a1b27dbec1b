//! # Fast Fourier Transform (FFT) Module
//!
//! In-place radix-2 transform engine for the spectrum pipeline. It works on a
//! single interleaved complex buffer and is split into the three steps an
//! embedded DSP library exposes, so each can be checked on its own:
//!
//! 1. [`Radix2Fft::forward`]: decimation-in-time butterflies, natural-order
//!    input, bit-reversed output
//! 2. [`Radix2Fft::bit_reverse`]: restores natural frequency order
//! 3. [`Radix2Fft::unpack_real`]: real-signal split producing the one-sided
//!    spectrum
//!
//! ## Features
//! - Twiddle tables computed once by [`Radix2Fft::init`] for the largest size
//!   used; any smaller power of two reuses them
//! - Single precision, no normalisation (the reducer divides by `N`)
//! - No allocation after `init`

use std::f64::consts::PI;

use rustfft::num_complex::Complex;

use crate::error::TransformError;

/// Precomputed radix-2 transform tables.
#[derive(Debug, Clone)]
pub struct Radix2Fft {
    max_size: usize,
    /// `e^{-2πi·rev(j)/max}` for `j < max/2`, stored in bit-reversed order so a
    /// stage with `g` groups reads the first `g` entries.
    twiddles: Box<[Complex<f32>]>,
    /// `e^{-πi·m/max}` for `m <= max/2`, used by the real-signal split.
    split_twiddles: Box<[Complex<f32>]>,
}

fn check_pow2(len: usize) -> Result<(), TransformError> {
    if len < 2 || !len.is_power_of_two() {
        return Err(TransformError::InvalidLength(len));
    }
    Ok(())
}

fn reverse_bits(value: usize, bits: u32) -> usize {
    if bits == 0 {
        0
    } else {
        value.reverse_bits() >> (usize::BITS - bits)
    }
}

impl Radix2Fft {
    /// Builds tables for transforms of up to `max_size` points.
    ///
    /// # Arguments
    /// * `max_size` - Largest transform length the engine will be asked for.
    ///
    /// # Errors
    /// [`TransformError::InvalidLength`] unless `max_size` is a power of two
    /// of at least 2.
    pub fn init(max_size: usize) -> Result<Self, TransformError> {
        check_pow2(max_size)?;

        let half = max_size / 2;
        let bits = half.trailing_zeros();
        let twiddles = (0..half)
            .map(|j| {
                let angle = -2.0 * PI * reverse_bits(j, bits) as f64 / max_size as f64;
                Complex::new(angle.cos() as f32, angle.sin() as f32)
            })
            .collect();
        let split_twiddles = (0..=half)
            .map(|m| {
                let angle = -PI * m as f64 / max_size as f64;
                Complex::new(angle.cos() as f32, angle.sin() as f32)
            })
            .collect();

        Ok(Self {
            max_size,
            twiddles,
            split_twiddles,
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    fn check_len(&self, len: usize) -> Result<(), TransformError> {
        check_pow2(len)?;
        if len > self.max_size {
            return Err(TransformError::TooLarge {
                len,
                max: self.max_size,
            });
        }
        Ok(())
    }

    /// Forward transform in place. The output is in bit-reversed order.
    pub fn forward(&self, buf: &mut [Complex<f32>]) -> Result<(), TransformError> {
        let n = buf.len();
        self.check_len(n)?;

        let mut groups = 1;
        let mut span = n / 2;
        while span > 0 {
            let mut base = 0;
            for w in &self.twiddles[..groups] {
                for a in base..base + span {
                    let b = a + span;
                    let t = buf[b] * w;
                    buf[b] = buf[a] - t;
                    buf[a] += t;
                }
                base += 2 * span;
            }
            groups <<= 1;
            span >>= 1;
        }
        Ok(())
    }

    /// Swaps every entry with its bit-reversed index.
    pub fn bit_reverse(&self, buf: &mut [Complex<f32>]) -> Result<(), TransformError> {
        let n = buf.len();
        self.check_len(n)?;

        let bits = n.trailing_zeros();
        for i in 0..n {
            let j = reverse_bits(i, bits);
            if i < j {
                buf.swap(i, j);
            }
        }
        Ok(())
    }

    /// Real-signal split on a natural-order spectrum `Z` of length `n`.
    ///
    /// For `k` in `1..n/2`:
    /// `X[k] = ½(Z[k] + Z*[n-k]) - ½·i·e^{-πik/n}·(Z[k] - Z*[n-k])`.
    /// Bin 0 packs the DC term in `re` and the Nyquist term in `im` (for a
    /// real input both carry the DC term). Entries `n/2..n` are cleared.
    ///
    /// When `Z` came from a real input (zero imaginary part) it is Hermitian,
    /// the second term vanishes and `X[0..n/2]` is exactly the one-sided
    /// spectrum. When `Z` came from a real sequence of `2n` samples packed as
    /// `n` complex values, `X` is the `n`-bin spectrum of that sequence.
    pub fn unpack_real(&self, buf: &mut [Complex<f32>]) -> Result<(), TransformError> {
        let n = buf.len();
        self.check_len(n)?;
        let half = n / 2;
        let stride = self.max_size / n;

        let z0 = buf[0];
        buf[0] = Complex::new(z0.re + z0.im, z0.re - z0.im);

        // The mirror entries above n/2 are only read, so a single forward pass
        // is safe in place.
        for k in 1..half {
            let zk = buf[k];
            let znk = buf[n - k].conj();
            let even = (zk + znk) * 0.5;
            let odd = (zk - znk) * 0.5;
            let w = self.split_twiddles[k * stride];
            buf[k] = even - Complex::<f32>::i() * w * odd;
        }
        // Z[n/2] pairs with itself; with stride the twiddle is -i.
        let zh = buf[half];
        buf[half] = Complex::new(zh.re, -zh.im);

        for c in &mut buf[half + 1..] {
            *c = Complex::new(0.0, 0.0);
        }
        Ok(())
    }

    /// `forward`, `bit_reverse` and `unpack_real` in sequence.
    pub fn process(&self, buf: &mut [Complex<f32>]) -> Result<(), TransformError> {
        self.forward(buf)?;
        self.bit_reverse(buf)?;
        self.unpack_real(buf)
    }
}
