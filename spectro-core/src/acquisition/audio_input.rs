//! # Sound-Card Input
//!
//! Uses CPAL (Cross-Platform Audio Library) to treat the default input
//! device as a continuous converter. The device callback scales each `f32`
//! sample in `[-1, 1]` by the attenuation gain, quantises it to a code at the
//! configured resolution, encodes it as a result word and pushes it into the
//! driver store, which fires the conversion-done callback per conversion
//! frame.
//!
//! ## Notes
//! - Only the first channel of an interleaved multi-channel stream is used.
//! - The requested sample rate must be inside a range the device supports.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use tracing::{info, warn};

use super::store::{StoreReader, store};
use super::{AcquisitionChannel, ChannelConfig, ConvDoneCallback, ReadOutcome, ReadStatus, Sample};
use crate::error::{AcquisitionError, ConfigError};

pub struct AudioInputAdc {
    config: ChannelConfig,
    device: cpal::Device,
    stream_config: cpal::StreamConfig,
    callback: Option<ConvDoneCallback>,
    reader: Option<StoreReader>,
    stream: Option<cpal::Stream>,
}

impl AudioInputAdc {
    /// Opens the default input device and checks it can run at the
    /// configured sample rate.
    pub fn configure(config: ChannelConfig) -> Result<Self, AcquisitionError> {
        config.validate()?;

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| ConfigError::Device("no input device available".into()))?;
        let name = device
            .name()
            .unwrap_or_else(|_| "<unnamed device>".to_string());

        let configs = device
            .supported_input_configs()
            .map_err(|e| ConfigError::Device(e.to_string()))?
            .collect::<Vec<_>>();
        let supported = find_supported_config(configs, config.sample_rate_hz).ok_or_else(|| {
            ConfigError::Device(format!(
                "{name} has no f32 input format at {} Hz",
                config.sample_rate_hz
            ))
        })?;
        let stream_config: cpal::StreamConfig = supported
            .with_sample_rate(cpal::SampleRate(config.sample_rate_hz))
            .into();

        info!(
            device = %name,
            rate = config.sample_rate_hz,
            channels = stream_config.channels,
            "audio input configured"
        );
        Ok(Self {
            config,
            device,
            stream_config,
            callback: None,
            reader: None,
            stream: None,
        })
    }
}

/// Picks an `f32` input configuration whose rate range covers `target_rate`,
/// preferring the fewest channels.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .filter(|c| c.min_sample_rate().0 <= target_rate && target_rate <= c.max_sample_rate().0)
        .min_by_key(|c| c.channels())
}

/// Maps `[-1, 1]` onto `0..=max_code`.
fn quantise(x: f32, max_code: u16) -> u16 {
    let scaled = (x.clamp(-1.0, 1.0) + 1.0) * 0.5 * f32::from(max_code);
    scaled.round() as u16
}

impl AcquisitionChannel for AudioInputAdc {
    fn config(&self) -> &ChannelConfig {
        &self.config
    }

    fn register_callback(&mut self, callback: ConvDoneCallback) -> Result<(), AcquisitionError> {
        if self.stream.is_some() {
            return Err(AcquisitionError::InvalidState("running"));
        }
        self.callback = Some(callback);
        Ok(())
    }

    fn start(&mut self) -> Result<(), AcquisitionError> {
        if self.stream.is_some() {
            return Err(AcquisitionError::InvalidState("running"));
        }
        let (mut writer, reader) = store(
            self.config.max_store_buf_size,
            self.config.conv_frame_size,
            self.callback.clone(),
        );

        let channels = usize::from(self.stream_config.channels.max(1));
        let format = self.config.sample_format;
        let width = format.width();
        let channel = self.config.channel_id;
        let max_code = self.config.max_code();
        let gain = self.config.attenuation.gain();
        let mut word = [0u8; 4];

        let err_fn = |err| warn!("an error occurred on the input stream: {err}");
        let stream = self
            .device
            .build_input_stream(
                &self.stream_config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    for frame in data.chunks(channels) {
                        let sample = Sample {
                            channel,
                            code: quantise(frame[0] * gain, max_code),
                        };
                        format.encode(sample, &mut word);
                        writer.push_word(&word[..width]);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| AcquisitionError::Stream(e.to_string()))?;
        stream
            .play()
            .map_err(|e| AcquisitionError::Stream(e.to_string()))?;

        self.reader = Some(reader);
        self.stream = Some(stream);
        info!("audio input started");
        Ok(())
    }

    fn stop(&mut self) -> Result<(), AcquisitionError> {
        let Some(stream) = self.stream.take() else {
            return Err(AcquisitionError::InvalidState("stopped"));
        };
        if let Err(e) = stream.pause() {
            warn!("error pausing input stream: {e}");
        }
        drop(stream);
        self.reader = None;
        Ok(())
    }

    fn read(&mut self, out: &mut [u8]) -> ReadOutcome {
        match (&mut self.reader, self.stream.is_some()) {
            (Some(reader), true) => reader.read(out),
            _ => ReadOutcome::new(0, ReadStatus::InvalidState),
        }
    }
}
