//! # Text Spectrum View
//!
//! Draws each spectrum as a grid of vertical bars inside a box border. The
//! bins are spread over the configured number of columns; a column shows the
//! largest bin that falls onto it so narrow peaks never disappear when the
//! view is narrower than the spectrum.

use std::io::{self, Write};

use spectro_core::{DisplayConfig, SpectrumSink};
use tracing::warn;

/// ANSI "cursor home, clear screen".
const CLEAR: &str = "\x1b[H\x1b[2J";

pub struct TextSpectrumView<W: Write> {
    out: W,
    redraw_in_place: bool,
    caption: Option<Box<dyn Fn(&[f32]) -> String>>,
    grid: String,
}

impl<W: Write> TextSpectrumView<W> {
    pub fn new(out: W, redraw_in_place: bool) -> Self {
        Self {
            out,
            redraw_in_place,
            caption: None,
            grid: String::new(),
        }
    }

    /// Adds a line under the bottom border, computed from each spectrum.
    pub fn with_caption(mut self, caption: impl Fn(&[f32]) -> String + 'static) -> Self {
        self.caption = Some(Box::new(caption));
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn flush_grid(&mut self) -> io::Result<()> {
        if self.redraw_in_place {
            self.out.write_all(CLEAR.as_bytes())?;
        }
        self.out.write_all(self.grid.as_bytes())?;
        self.out.flush()
    }
}

/// Maximum of the bins mapped onto each of `width` columns.
fn column_levels(magnitudes: &[f32], width: usize) -> Vec<f32> {
    let bins = magnitudes.len();
    if bins == 0 {
        return vec![0.0; width];
    }
    (0..width)
        .map(|col| {
            let start = col * bins / width;
            let end = ((col + 1) * bins / width).max(start + 1).min(bins);
            magnitudes[start..end]
                .iter()
                .fold(f32::NEG_INFINITY, |max, &m| m.max(max))
        })
        .collect()
}

/// Bar height in rows for `level` scaled linearly between `min` and `max`.
fn bar_height(level: f32, view: &DisplayConfig) -> usize {
    let span = view.max - view.min;
    let scaled = (level - view.min) / span * view.height as f32;
    if !scaled.is_finite() || scaled <= 0.0 {
        return 0;
    }
    (scaled.round() as usize).min(view.height)
}

/// Renders the whole bordered grid into `grid`, replacing its contents.
fn draw(magnitudes: &[f32], view: &DisplayConfig, grid: &mut String) {
    let heights: Vec<usize> = column_levels(magnitudes, view.width)
        .into_iter()
        .map(|level| bar_height(level, view))
        .collect();

    let border = format!("+{}+\n", "-".repeat(view.width));
    grid.clear();
    grid.push_str(&border);
    for row in 0..view.height {
        // Row 0 is the top of the view
        let threshold = view.height - row;
        grid.push('|');
        for &h in &heights {
            grid.push(if h >= threshold { view.fill_glyph } else { ' ' });
        }
        grid.push_str("|\n");
    }
    grid.push_str(&border);
}

impl<W: Write> SpectrumSink for TextSpectrumView<W> {
    fn render(&mut self, magnitudes: &[f32], view: &DisplayConfig) {
        draw(magnitudes, view, &mut self.grid);
        if let Some(caption) = &self.caption {
            self.grid.push_str(&caption(magnitudes));
            self.grid.push('\n');
        }

        if let Err(e) = self.flush_grid() {
            warn!("failed to write spectrum: {e}");
        }
    }
}
