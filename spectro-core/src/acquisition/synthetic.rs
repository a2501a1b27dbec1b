//! Simulated continuous converter.
//!
//! A background thread stands in for the conversion hardware: it evaluates a
//! [`SignalSpec`] at the configured sample rate, quantises each value to a
//! code, encodes it in the configured [`SampleFormat`](super::SampleFormat)
//! and pushes it into the driver store. The store fires the registered
//! callback once per conversion frame, exactly like the real peripheral.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{debug, info};

use super::store::{StoreReader, StoreWriter, store};
use super::{
    AcquisitionChannel, CHANNEL_COUNT, ChannelConfig, ConvDoneCallback, ReadOutcome, ReadStatus,
    Sample, SampleFormat,
};
use crate::error::AcquisitionError;

/// One sinusoidal component, amplitude in converter codes at 0 dB
/// attenuation.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Tone {
    pub frequency_hz: f32,
    pub amplitude: f32,
}

/// What the simulated converter sees on its input pin.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SignalSpec {
    pub tones: Vec<Tone>,
    /// Constant offset in codes.
    pub dc_offset: f32,
    /// Peak amplitude of uniform noise in codes.
    pub noise: f32,
    /// Tag every n-th result with a foreign channel.
    pub stray_every: Option<usize>,
    pub seed: u64,
}

impl Default for SignalSpec {
    fn default() -> Self {
        Self {
            tones: vec![Tone {
                frequency_hz: 1000.0,
                amplitude: 800.0,
            }],
            dc_offset: 2048.0,
            noise: 8.0,
            stray_every: None,
            seed: 0x5eed,
        }
    }
}

/// How the generator thread is clocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pacing {
    /// One conversion frame per `samples / sample_rate` of wall time. The
    /// store overflows if the consumer falls behind.
    RealTime,
    /// Produce as fast as the consumer drains; never overflows.
    Backpressure,
}

struct Generator {
    signal: SignalSpec,
    channel: u8,
    sample_rate: f32,
    max_code: f32,
    gain: f32,
    index: u64,
    rng: StdRng,
}

impl Generator {
    fn new(config: &ChannelConfig, signal: SignalSpec) -> Self {
        let rng = StdRng::seed_from_u64(signal.seed);
        Self {
            signal,
            channel: config.channel_id,
            sample_rate: config.sample_rate_hz as f32,
            max_code: f32::from(config.max_code()),
            gain: config.attenuation.gain(),
            index: 0,
            rng,
        }
    }

    fn next_sample(&mut self) -> Sample {
        let n = self.index;
        self.index += 1;

        let t = n as f64 / f64::from(self.sample_rate);
        let mut value = self.signal.dc_offset;
        for tone in &self.signal.tones {
            let phase = (2.0 * std::f64::consts::PI * f64::from(tone.frequency_hz) * t)
                % (2.0 * std::f64::consts::PI);
            value += tone.amplitude * (phase as f32).sin();
        }
        if self.signal.noise > 0.0 {
            value += self.rng.gen_range(-self.signal.noise..=self.signal.noise);
        }

        let channel = match self.signal.stray_every {
            Some(every) if every > 0 && (n + 1) % every as u64 == 0 => {
                (self.channel + 1) % CHANNEL_COUNT
            }
            _ => self.channel,
        };
        Sample {
            channel,
            code: (value * self.gain).round().clamp(0.0, self.max_code) as u16,
        }
    }
}

/// Poll interval of a backpressured generator waiting for store space.
const STALL_POLL: Duration = Duration::from_micros(50);
/// Polls between repeated conversion-done wakes while stalled (about 1 ms).
const STALL_RAISE_POLLS: u32 = 20;

/// Hardware state owned by the generator thread while running.
struct Hardware {
    generator: Generator,
    writer: StoreWriter,
}

pub struct SyntheticAdc {
    config: ChannelConfig,
    pacing: Pacing,
    callback: Option<ConvDoneCallback>,
    reader: Option<StoreReader>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<Generator>>,
    // Parked here between stop() and the next start()
    generator: Option<Generator>,
}

impl SyntheticAdc {
    /// Validates `config` and builds a stopped converter.
    ///
    /// # Arguments
    /// * `config` - Channel, rate, resolution, attenuation and store geometry.
    /// * `signal` - What the simulated input pin sees.
    /// * `pacing` - Wall-clock paced or driven by free store space.
    ///
    /// # Returns
    /// A converter ready for `register_callback` and `start`, or
    /// [`AcquisitionError::Config`] when `config` is rejected.
    pub fn configure(
        config: ChannelConfig,
        signal: SignalSpec,
        pacing: Pacing,
    ) -> Result<Self, AcquisitionError> {
        config.validate()?;
        info!(
            channel = config.channel_id,
            rate = config.sample_rate_hz,
            bits = config.bit_resolution,
            attenuation = ?config.attenuation,
            format = ?config.sample_format,
            "synthetic converter configured"
        );
        let generator = Generator::new(&config, signal);
        Ok(Self {
            config,
            pacing,
            callback: None,
            reader: None,
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            generator: Some(generator),
        })
    }

    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }
}

fn run_hardware(
    mut hw: Hardware,
    running: Arc<AtomicBool>,
    format: SampleFormat,
    pacing: Pacing,
    frame_period: Duration,
) -> Generator {
    let width = format.width();
    let samples_per_frame = hw.writer.conv_frame_size() / width;
    let mut word = [0u8; 4];
    let mut deadline = Instant::now();

    while running.load(Ordering::Acquire) {
        match pacing {
            Pacing::RealTime => {
                deadline += frame_period;
                let now = Instant::now();
                if deadline > now {
                    thread::sleep(deadline - now);
                }
            }
            Pacing::Backpressure => {
                let mut polls = 0u32;
                while hw.writer.free() < hw.writer.conv_frame_size() {
                    if !running.load(Ordering::Acquire) {
                        return hw.generator;
                    }
                    // Stalled with unread results: keep interrupting, the
                    // reader may have consumed the last wake already.
                    if polls % STALL_RAISE_POLLS == 0 {
                        hw.writer.raise();
                    }
                    polls = polls.wrapping_add(1);
                    thread::sleep(STALL_POLL);
                }
            }
        }
        for _ in 0..samples_per_frame {
            let sample = hw.generator.next_sample();
            format.encode(sample, &mut word);
            hw.writer.push_word(&word[..width]);
        }
    }
    hw.generator
}

impl AcquisitionChannel for SyntheticAdc {
    fn config(&self) -> &ChannelConfig {
        &self.config
    }

    fn register_callback(&mut self, callback: ConvDoneCallback) -> Result<(), AcquisitionError> {
        if self.is_running() {
            return Err(AcquisitionError::InvalidState("running"));
        }
        self.callback = Some(callback);
        Ok(())
    }

    fn start(&mut self) -> Result<(), AcquisitionError> {
        let Some(generator) = self.generator.take() else {
            return Err(AcquisitionError::InvalidState("running"));
        };
        let (writer, reader) = store(
            self.config.max_store_buf_size,
            self.config.conv_frame_size,
            self.callback.clone(),
        );
        self.reader = Some(reader);
        self.running.store(true, Ordering::Release);

        let hw = Hardware { generator, writer };
        let running = self.running.clone();
        let format = self.config.sample_format;
        let pacing = self.pacing;
        let frame_period = Duration::from_secs_f64(
            self.config.samples_per_conv_frame() as f64 / f64::from(self.config.sample_rate_hz),
        );
        let worker = thread::Builder::new()
            .name("synthetic-adc".into())
            .spawn(move || run_hardware(hw, running, format, pacing, frame_period))
            .map_err(|e| AcquisitionError::Stream(e.to_string()))?;
        self.worker = Some(worker);
        info!(pacing = ?self.pacing, "synthetic converter started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AcquisitionError> {
        let Some(worker) = self.worker.take() else {
            return Err(AcquisitionError::InvalidState("stopped"));
        };
        self.running.store(false, Ordering::Release);
        let generator = worker
            .join()
            .map_err(|_| AcquisitionError::Stream("generator thread panicked".into()))?;
        self.generator = Some(generator);
        self.reader = None;
        debug!("synthetic converter stopped");
        Ok(())
    }

    fn read(&mut self, out: &mut [u8]) -> ReadOutcome {
        match (&mut self.reader, self.worker.is_some()) {
            (Some(reader), true) => reader.read(out),
            _ => ReadOutcome::new(0, ReadStatus::InvalidState),
        }
    }
}

impl Drop for SyntheticAdc {
    fn drop(&mut self) {
        if self.worker.is_some() {
            let _ = self.stop();
        }
    }
}
