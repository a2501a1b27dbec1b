//! Argument parsing for running from the command line

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use spectro_core::Config;

#[derive(Parser, Debug)]
#[command(author, version, about = "Live single-channel spectrum monitor", long_about = None)]
pub struct Args {
    /// TOML configuration file; every key is optional
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    /// Where samples come from
    #[arg(short, long, value_enum, default_value_t = Source::Synthetic)]
    pub source: Source,
    /// Samples per transform (power of two)
    #[arg(long)]
    pub frame_length: Option<usize>,
    /// Converter sample rate in Hz
    #[arg(long)]
    pub sample_rate: Option<u32>,
    /// Converter channel to monitor
    #[arg(long)]
    pub channel: Option<u8>,
    /// Number of low bins forced to zero
    #[arg(long)]
    pub dc_bins: Option<usize>,
    /// Columns of the spectrum view
    #[arg(long)]
    pub width: Option<usize>,
    /// Rows of the spectrum view
    #[arg(long)]
    pub height: Option<usize>,
    /// Stop after this many spectra instead of running forever
    #[arg(short = 'n', long)]
    pub frames: Option<u64>,
    /// Leave previous spectra on screen instead of redrawing in place
    #[arg(long)]
    pub scroll: bool,
    #[command(flatten)]
    pub verbose: clap_verbosity_flag::Verbosity<clap_verbosity_flag::WarnLevel>,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Source {
    /// Simulated converter driven by the `[synthetic]` section
    Synthetic,
    /// Default audio input device, standing in for the converter
    Audio,
}

impl Args {
    /// Loads the configuration file (or defaults) and applies flag overrides.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)
                .with_context(|| format!("loading configuration from {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(len) = self.frame_length {
            config.transform.frame_length = len;
        }
        if let Some(rate) = self.sample_rate {
            config.acquisition.sample_rate_hz = rate;
        }
        if let Some(channel) = self.channel {
            config.acquisition.channel_id = channel;
        }
        if let Some(bins) = self.dc_bins {
            config.transform.dc_suppress_bins = bins;
        }
        if let Some(width) = self.width {
            config.display.width = width;
        }
        if let Some(height) = self.height {
            config.display.height = height;
        }

        config.validate().context("invalid configuration")?;
        Ok(config)
    }
}

/// Match verbosity filter with tracing subscriber log levels
pub fn convert_filter(filter: log::LevelFilter) -> tracing_subscriber::filter::LevelFilter {
    match filter {
        log::LevelFilter::Off => tracing_subscriber::filter::LevelFilter::OFF,
        log::LevelFilter::Error => tracing_subscriber::filter::LevelFilter::ERROR,
        log::LevelFilter::Warn => tracing_subscriber::filter::LevelFilter::WARN,
        log::LevelFilter::Info => tracing_subscriber::filter::LevelFilter::INFO,
        log::LevelFilter::Debug => tracing_subscriber::filter::LevelFilter::DEBUG,
        log::LevelFilter::Trace => tracing_subscriber::filter::LevelFilter::TRACE,
    }
}
