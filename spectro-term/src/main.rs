//! # Spectro - Live Spectrum Monitor
//!
//! Terminal front end for `spectro-core`. Picks a sample source, wires its
//! conversion-done callback to the pipeline notification and draws every
//! spectrum as text.
//!
//! ## Threads
//! - **Source**: generator thread (synthetic) or audio callback (audio input)
//!   writing into the driver store and raising the notification
//! - **Main**: the pipeline driver and the renderer

mod args;
mod render;

use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use spectro_core::acquisition::{AcquisitionChannel, Pacing, SyntheticAdc};
use spectro_core::reducer::{bin_frequency, peak_bin};
use spectro_core::{Config, Cooperate, Pipeline, ThreadYield, notify};
use tracing::info;

use args::{Args, Source, convert_filter};
use render::TextSpectrumView;

fn open_source(source: Source, config: &Config) -> Result<Box<dyn AcquisitionChannel>> {
    match source {
        Source::Synthetic => {
            let adc = SyntheticAdc::configure(
                config.acquisition.clone(),
                config.synthetic.clone(),
                Pacing::RealTime,
            )?;
            Ok(Box::new(adc))
        }
        #[cfg(feature = "audio-input")]
        Source::Audio => {
            let adc = spectro_core::acquisition::AudioInputAdc::configure(
                config.acquisition.clone(),
            )?;
            Ok(Box::new(adc))
        }
        #[cfg(not(feature = "audio-input"))]
        Source::Audio => anyhow::bail!("audio input support was not compiled in (feature `audio-input`)"),
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(convert_filter(args.verbose.log_level_filter()))
        .with_writer(io::stderr)
        .init();

    let config = args.resolve_config()?;
    let mut pipeline = Pipeline::new(&config).context("building the pipeline")?;

    let mut channel = open_source(args.source, &config).context("opening the sample source")?;
    let (notifier, notification) = notify::pair();
    channel.register_callback(Arc::new(move |_| {
        notifier.signal();
    }))?;
    channel.start().context("starting acquisition")?;
    info!(source = ?args.source, "acquisition started");

    let rate = config.acquisition.sample_rate_hz;
    let frame_length = config.transform.frame_length;
    let mut view = TextSpectrumView::new(io::stdout().lock(), !args.scroll).with_caption(
        move |spectrum: &[f32]| match peak_bin(spectrum) {
            Some(bin) if spectrum[bin] > 0.0 => format!(
                "peak {:8.1} Hz  (bin {bin}, {:.2})",
                bin_frequency(bin, rate, frame_length),
                spectrum[bin]
            ),
            _ => "no signal".to_owned(),
        },
    );
    let mut cooperate = ThreadYield::default();

    match args.frames {
        Some(frames) => {
            for _ in 0..frames {
                pipeline.run_once(&mut *channel, &notification, &mut view)?;
                cooperate.hand_off();
            }
            channel.stop()?;
            let stats = pipeline.assembler_stats();
            info!(
                frames = stats.frames,
                dropped = stats.dropped_samples,
                overflows = stats.overflows,
                timeouts = stats.timeouts,
                "finished"
            );
            Ok(())
        }
        None => {
            let err = match pipeline.run(&mut *channel, &notification, &mut view, &mut cooperate) {
                Ok(never) => match never {},
                Err(e) => e,
            };
            // Best effort; the pipeline error is what gets reported.
            let _ = channel.stop();
            Err(err).context("pipeline stopped")
        }
    }
}
