//! # Error Types
//!
//! Every fallible operation in the pipeline reports one of the enums below.
//! Configuration and transform-size problems are fatal and surface before the
//! run loop starts; transient driver conditions are *not* errors and travel as
//! [`ReadStatus`](crate::acquisition::ReadStatus) values instead.

use thiserror::Error;

/// Invalid or unsupported configuration, detected once at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("frame length {0} is not a power of two")]
    FrameLengthNotPowerOfTwo(usize),
    #[error("frame length {len} outside supported range {min}..={max}")]
    FrameLengthOutOfRange { len: usize, min: usize, max: usize },
    #[error("channel {0} does not exist on this converter")]
    InvalidChannel(u8),
    #[error("sample rate {rate} Hz outside supported range {min}..={max} Hz")]
    SampleRateOutOfRange { rate: u32, min: u32, max: u32 },
    #[error("bit resolution {0} not supported (9..=12)")]
    UnsupportedResolution(u8),
    #[error("conversion frame of {size} bytes is not a non-zero multiple of the {width}-byte result word")]
    InvalidConvFrame { size: usize, width: usize },
    #[error("store buffer of {store} bytes cannot hold one {conv}-byte conversion frame")]
    StoreTooSmall { store: usize, conv: usize },
    #[error("cannot suppress {bins} bins of a {available}-bin spectrum")]
    DcSuppressTooLarge { bins: usize, available: usize },
    #[error("invalid display settings: {0}")]
    InvalidDisplay(String),
    #[error("input device unavailable: {0}")]
    Device(String),
    #[error("could not read configuration: {0}")]
    Io(#[from] std::io::Error),
    #[error("could not parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Transform engine misuse.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransformError {
    #[error("transform length {0} is not a power of two >= 2")]
    InvalidLength(usize),
    #[error("transform length {len} exceeds the initialised maximum {max}")]
    TooLarge { len: usize, max: usize },
}

/// Lifecycle errors of an acquisition channel.
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("operation not valid while the channel is {0}")]
    InvalidState(&'static str),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("input stream failed: {0}")]
    Stream(String),
}

/// Raised by [`Notification::wait`](crate::notify::Notification::wait).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NotifyError {
    #[error("every notifier was dropped; no further wakes can arrive")]
    Disconnected,
}

/// Fatal conditions while assembling a frame.
#[derive(Debug, Error)]
pub enum AssembleError {
    #[error("acquisition channel is not running")]
    ChannelNotRunning,
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// Anything that stops the pipeline driver.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
    #[error(transparent)]
    Assemble(#[from] AssembleError),
}
