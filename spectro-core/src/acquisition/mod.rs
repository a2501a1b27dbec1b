//! # Acquisition Channel
//!
//! The contract between the pipeline and whatever produces raw converter
//! results. A channel is configured once, gets a conversion-done callback
//! registered, and is then started. From that point on the driver fills its
//! own store buffer and fires the callback each time a conversion frame is
//! ready; the consumer drains the store with non-blocking [`read`] calls.
//!
//! ## Drivers
//! - [`SyntheticAdc`]: simulated converter fed by a signal generator thread
//! - [`AudioInputAdc`]: the default sound-card input (feature `audio-input`)
//!
//! [`read`]: AcquisitionChannel::read

mod format;
mod store;
mod synthetic;

#[cfg(feature = "audio-input")]
mod audio_input;

pub use format::{Sample, SampleFormat};
pub use synthetic::{Pacing, SignalSpec, SyntheticAdc, Tone};

#[cfg(feature = "audio-input")]
pub use audio_input::AudioInputAdc;

use std::sync::Arc;

use serde::Deserialize;

use crate::error::{AcquisitionError, ConfigError};

/// Number of channels on the converter unit.
pub const CHANNEL_COUNT: u8 = 10;
/// Lowest continuous sample rate the converter supports.
pub const SAMPLE_RATE_MIN_HZ: u32 = 611;
/// Highest continuous sample rate the converter supports.
pub const SAMPLE_RATE_MAX_HZ: u32 = 83_333;

/// Input attenuation applied ahead of the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Attenuation {
    #[default]
    Db0,
    Db2_5,
    Db6,
    Db12,
}

impl Attenuation {
    /// Approximate full-scale input voltage in millivolts.
    pub fn full_scale_mv(self) -> u32 {
        match self {
            Attenuation::Db0 => 950,
            Attenuation::Db2_5 => 1250,
            Attenuation::Db6 => 1750,
            Attenuation::Db12 => 3100,
        }
    }

    /// Code scale relative to no attenuation: the same input voltage spans
    /// fewer codes as the full-scale range widens.
    pub fn gain(self) -> f32 {
        Attenuation::Db0.full_scale_mv() as f32 / self.full_scale_mv() as f32
    }
}

/// Static configuration of one acquisition channel.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    pub channel_id: u8,
    pub sample_rate_hz: u32,
    pub bit_resolution: u8,
    pub attenuation: Attenuation,
    pub sample_format: SampleFormat,
    /// Bytes delivered per conversion frame (one callback per frame).
    pub conv_frame_size: usize,
    /// Capacity of the driver-owned store buffer in bytes.
    pub max_store_buf_size: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            channel_id: 2,
            sample_rate_hz: 20_000,
            bit_resolution: 12,
            attenuation: Attenuation::Db0,
            sample_format: SampleFormat::Type2,
            conv_frame_size: 256,
            max_store_buf_size: 1024,
        }
    }
}

impl ChannelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.channel_id >= CHANNEL_COUNT {
            return Err(ConfigError::InvalidChannel(self.channel_id));
        }
        if !(SAMPLE_RATE_MIN_HZ..=SAMPLE_RATE_MAX_HZ).contains(&self.sample_rate_hz) {
            return Err(ConfigError::SampleRateOutOfRange {
                rate: self.sample_rate_hz,
                min: SAMPLE_RATE_MIN_HZ,
                max: SAMPLE_RATE_MAX_HZ,
            });
        }
        if !(9..=12).contains(&self.bit_resolution) {
            return Err(ConfigError::UnsupportedResolution(self.bit_resolution));
        }
        let width = self.sample_format.width();
        if self.conv_frame_size == 0 || self.conv_frame_size % width != 0 {
            return Err(ConfigError::InvalidConvFrame {
                size: self.conv_frame_size,
                width,
            });
        }
        if self.max_store_buf_size < self.conv_frame_size {
            return Err(ConfigError::StoreTooSmall {
                store: self.max_store_buf_size,
                conv: self.conv_frame_size,
            });
        }
        Ok(())
    }

    /// Largest code the converter produces at the configured resolution.
    pub fn max_code(&self) -> u16 {
        (1u16 << self.bit_resolution) - 1
    }

    /// Result words per conversion frame.
    pub fn samples_per_conv_frame(&self) -> usize {
        self.conv_frame_size / self.sample_format.width()
    }
}

/// Outcome of a non-blocking [`AcquisitionChannel::read`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOutcome {
    /// Bytes written to the front of the output buffer.
    pub bytes: usize,
    pub status: ReadStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    Ok,
    /// The store overflowed since the previous read and conversion frames were
    /// lost. Any returned bytes are still valid.
    BufferFull,
    /// Nothing available right now; wait for the next notification.
    Timeout,
    /// The channel is not running.
    InvalidState,
}

impl ReadOutcome {
    pub const fn new(bytes: usize, status: ReadStatus) -> Self {
        Self { bytes, status }
    }
}

/// Details handed to the conversion-done callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvDoneEvent {
    /// Bytes in the conversion frame that just became readable.
    pub size: usize,
}

/// Runs on the producer context. It must only raise a wake signal: no shared
/// buffers, no blocking.
pub type ConvDoneCallback = Arc<dyn Fn(ConvDoneEvent) + Send + Sync + 'static>;

/// A continuous, interrupt-driven source of raw converter results.
pub trait AcquisitionChannel {
    fn config(&self) -> &ChannelConfig;

    /// Installs the conversion-done callback. Only valid while stopped.
    fn register_callback(&mut self, callback: ConvDoneCallback) -> Result<(), AcquisitionError>;

    fn start(&mut self) -> Result<(), AcquisitionError>;

    fn stop(&mut self) -> Result<(), AcquisitionError>;

    /// Moves up to `out.len()` bytes out of the driver store. Never blocks.
    fn read(&mut self, out: &mut [u8]) -> ReadOutcome;
}
