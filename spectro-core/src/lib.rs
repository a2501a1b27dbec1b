// spectro-core/src/lib.rs

//! Headless core of the spectrum monitor.
//!
//! A converter channel fills a driver-owned store in the background and
//! raises a notification whenever a conversion frame lands. A single
//! consumer drains it into fixed-length frames, windows them, runs an
//! in-place radix-2 transform and hands the reduced magnitude spectrum to a
//! renderer. This crate contains no terminal code; see `spectro-term`.

pub mod acquisition;
pub mod assembler;
pub mod config;
pub mod error;
pub mod fft;
pub mod notify;
pub mod pipeline;
pub mod reducer;
pub mod window;
pub mod windowing;

pub use assembler::{AssemblerStats, FillProgress, FrameAssembler};
pub use config::{Config, DisplayConfig, TransformConfig};
pub use error::{
    AcquisitionError, AssembleError, ConfigError, NotifyError, PipelineError, TransformError,
};
pub use fft::Radix2Fft;
pub use notify::{Notification, Notifier};
pub use pipeline::{
    Cooperate, IterationReport, Pipeline, PipelineState, SpectrumSink, ThreadYield,
};
pub use reducer::SpectrumReducer;
pub use window::{WindowKind, WindowTable};
