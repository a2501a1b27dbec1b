//! # Window Table
//!
//! Precomputed per-sample weighting coefficients. The table is generated once
//! at startup for the configured frame length and then only read, so the run
//! loop never evaluates a cosine.
//!
//! All windows are the symmetric form (denominator `N - 1`), tapering to the
//! first and last sample alike.

use std::f64::consts::PI;

use serde::Deserialize;

/// Supported window shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Rectangular,
    /// Good general-purpose balance of leakage and resolution.
    #[default]
    Hann,
    Blackman,
    BlackmanHarris,
    /// Wide main lobe, minimal scalloping: best for reading amplitudes.
    FlatTop,
}

impl WindowKind {
    /// Cosine-sum coefficients `a0, a1, a2, ...` of the window.
    fn cosine_terms(self) -> &'static [f64] {
        match self {
            WindowKind::Rectangular => &[1.0],
            WindowKind::Hann => &[0.5, 0.5],
            WindowKind::Blackman => &[0.42, 0.5, 0.08],
            WindowKind::BlackmanHarris => &[0.35875, 0.48829, 0.14128, 0.01168],
            WindowKind::FlatTop => &[
                0.215_578_95,
                0.416_631_58,
                0.277_263_158,
                0.083_578_947,
                0.006_947_368,
            ],
        }
    }
}

/// Immutable table of `N` window coefficients.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowTable {
    kind: WindowKind,
    coefficients: Box<[f32]>,
    coherent_gain: f32,
}

impl WindowTable {
    /// Generates the `kind` window for `len` samples.
    ///
    /// Deterministic: the same `kind` and `len` always yield bit-identical
    /// coefficients.
    pub fn generate(kind: WindowKind, len: usize) -> Self {
        let terms = kind.cosine_terms();
        let denom = len.saturating_sub(1).max(1) as f64;
        let coefficients: Box<[f32]> = (0..len)
            .map(|i| {
                let x = 2.0 * PI * i as f64 / denom;
                terms
                    .iter()
                    .enumerate()
                    .map(|(k, a)| {
                        let sign = if k % 2 == 0 { 1.0 } else { -1.0 };
                        sign * a * (k as f64 * x).cos()
                    })
                    .sum::<f64>() as f32
            })
            .collect();

        let coherent_gain = if len == 0 {
            0.0
        } else {
            coefficients.iter().map(|&c| f64::from(c)).sum::<f64>() as f32 / len as f32
        };

        Self {
            kind,
            coefficients,
            coherent_gain,
        }
    }

    pub fn kind(&self) -> WindowKind {
        self.kind
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    pub fn coefficients(&self) -> &[f32] {
        &self.coefficients
    }

    /// Mean coefficient: the factor by which the window scales a sinusoid's
    /// peak magnitude.
    pub fn coherent_gain(&self) -> f32 {
        self.coherent_gain
    }
}

impl std::ops::Index<usize> for WindowTable {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.coefficients[index]
    }
}
