//! # Pipeline Driver
//!
//! The single consumer task. Owns every per-iteration buffer (frame, complex
//! frame, spectrum) for its whole lifetime; nothing here is shared with the
//! producer context, which only ever raises the notification.
//!
//! One iteration walks the states
//! `WaitNotify → Accumulate → Window → Transform → Reduce → Render` and then
//! hands control back to the scheduler once before starting over.

use std::thread;
use std::time::Duration;

use rustfft::num_complex::Complex;
use tracing::{info, trace};

use crate::acquisition::AcquisitionChannel;
use crate::assembler::{AssemblerStats, FrameAssembler};
use crate::config::{Config, DisplayConfig};
use crate::error::{PipelineError, TransformError};
use crate::fft::Radix2Fft;
use crate::notify::Notification;
use crate::reducer::{SpectrumReducer, peak_bin};
use crate::window::WindowTable;
use crate::windowing::apply_window;

/// Where the driver currently is within an iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    WaitNotify,
    Accumulate,
    Window,
    Transform,
    Reduce,
    Render,
}

/// Receives every finished spectrum. Purely a sink: the slice is only valid
/// for the duration of the call.
pub trait SpectrumSink {
    fn render(&mut self, magnitudes: &[f32], view: &DisplayConfig);
}

impl<F> SpectrumSink for F
where
    F: FnMut(&[f32], &DisplayConfig),
{
    fn render(&mut self, magnitudes: &[f32], view: &DisplayConfig) {
        self(magnitudes, view)
    }
}

/// Scheduling hand-off taken once per iteration so that lower-priority
/// cooperative work (a supervisor, a watchdog feeder) is never starved.
pub trait Cooperate {
    fn hand_off(&mut self);
}

/// Sleeps for one scheduler tick.
#[derive(Debug, Clone, Copy)]
pub struct ThreadYield {
    pub tick: Duration,
}

impl Default for ThreadYield {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(1),
        }
    }
}

impl Cooperate for ThreadYield {
    fn hand_off(&mut self) {
        if self.tick.is_zero() {
            thread::yield_now();
        } else {
            thread::sleep(self.tick);
        }
    }
}

/// Summary of one completed iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IterationReport {
    pub iteration: u64,
    pub peak_bin: Option<usize>,
    pub peak_magnitude: f32,
    pub assembler: AssemblerStats,
}

/// Window, transform and reduce stages with the buffers they own.
struct Stages {
    window: WindowTable,
    fft: Radix2Fft,
    reducer: SpectrumReducer,
    complex: Box<[Complex<f32>]>,
    spectrum: Box<[f32]>,
    state: PipelineState,
}

impl Stages {
    fn enter(&mut self, state: PipelineState) {
        trace!(from = ?self.state, to = ?state, "pipeline state");
        self.state = state;
    }

    fn process(&mut self, frame: &[f32]) -> Result<(), TransformError> {
        self.enter(PipelineState::Window);
        apply_window(frame, &self.window, &mut self.complex);

        self.enter(PipelineState::Transform);
        self.fft.process(&mut self.complex)?;

        self.enter(PipelineState::Reduce);
        self.reducer.reduce(&self.complex, &mut self.spectrum);
        Ok(())
    }
}

pub struct Pipeline {
    display: DisplayConfig,
    assembler: FrameAssembler,
    stages: Stages,
    iteration: u64,
}

impl Pipeline {
    /// Validates `config` and allocates every buffer the run loop will use.
    ///
    /// # Arguments
    /// * `config` - Complete configuration; transform and display sections are
    ///   copied, the acquisition section selects sample format and channel.
    ///
    /// # Returns
    /// A pipeline in [`PipelineState::WaitNotify`], or the first
    /// configuration or transform error found.
    pub fn new(config: &Config) -> Result<Self, PipelineError> {
        config.validate()?;
        let n = config.transform.frame_length;
        let fft = Radix2Fft::init(n)?;
        let window = WindowTable::generate(config.transform.window, n);
        let reducer = SpectrumReducer::new(n, config.transform.dc_suppress_bins);

        info!(
            frame_length = n,
            window = ?config.transform.window,
            coherent_gain = window.coherent_gain(),
            dc_suppress_bins = config.transform.dc_suppress_bins,
            bin_width_hz = config.bin_width_hz(),
            "pipeline initialised"
        );

        Ok(Self {
            display: config.display.clone(),
            assembler: FrameAssembler::new(
                n,
                config.acquisition.sample_format,
                config.acquisition.channel_id,
            ),
            stages: Stages {
                window,
                fft,
                reducer,
                complex: vec![Complex::new(0.0, 0.0); n].into_boxed_slice(),
                spectrum: vec![0.0; reducer.bins()].into_boxed_slice(),
                state: PipelineState::WaitNotify,
            },
            iteration: 0,
        })
    }

    pub fn state(&self) -> PipelineState {
        self.stages.state
    }

    pub fn window(&self) -> &WindowTable {
        &self.stages.window
    }

    /// The spectrum of the last completed iteration.
    pub fn spectrum(&self) -> &[f32] {
        &self.stages.spectrum
    }

    pub fn assembler_stats(&self) -> AssemblerStats {
        self.assembler.stats()
    }

    /// Windows, transforms and reduces `frame` into the spectrum buffer.
    ///
    /// This is the processing half of an iteration, usable on its own for
    /// offline frames. `frame` must hold exactly `frame_length` samples.
    pub fn process_frame(&mut self, frame: &[f32]) -> Result<&[f32], PipelineError> {
        self.stages.process(frame)?;
        Ok(&self.stages.spectrum)
    }

    /// Runs one full iteration: blocks for a frame, processes it and hands
    /// the spectrum to `sink`.
    ///
    /// # Arguments
    /// * `channel` - Started acquisition channel to drain.
    /// * `notification` - Wake raised by the channel's conversion-done callback.
    /// * `sink` - Renderer receiving the spectrum and the display shape.
    ///
    /// # Returns
    /// An [`IterationReport`] with the peak bin and running assembler
    /// counters, or a fatal error (stopped channel, lost notifier).
    pub fn run_once<C, S>(
        &mut self,
        channel: &mut C,
        notification: &Notification,
        sink: &mut S,
    ) -> Result<IterationReport, PipelineError>
    where
        C: AcquisitionChannel + ?Sized,
        S: SpectrumSink + ?Sized,
    {
        self.stages.enter(PipelineState::WaitNotify);
        self.stages.enter(PipelineState::Accumulate);
        let frame = self.assembler.fill(channel, notification)?;
        self.stages.process(frame)?;

        self.stages.enter(PipelineState::Render);
        let spectrum = &self.stages.spectrum;
        sink.render(spectrum, &self.display);

        self.iteration += 1;
        let peak = peak_bin(spectrum);
        let report = IterationReport {
            iteration: self.iteration,
            peak_bin: peak,
            peak_magnitude: peak.map_or(0.0, |i| spectrum[i]),
            assembler: self.assembler.stats(),
        };
        trace!(?report, "iteration complete");
        self.stages.enter(PipelineState::WaitNotify);
        Ok(report)
    }

    /// Loops forever, yielding to `cooperate` once per iteration. Returns only
    /// on a fatal error.
    pub fn run<C, S, Y>(
        &mut self,
        channel: &mut C,
        notification: &Notification,
        sink: &mut S,
        cooperate: &mut Y,
    ) -> Result<std::convert::Infallible, PipelineError>
    where
        C: AcquisitionChannel + ?Sized,
        S: SpectrumSink + ?Sized,
        Y: Cooperate + ?Sized,
    {
        loop {
            self.run_once(channel, notification, sink)?;
            cooperate.hand_off();
        }
    }
}
