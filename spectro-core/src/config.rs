//! # Configuration
//!
//! Everything the pipeline needs is fixed at startup from one TOML document.
//! Every section and key is optional; missing values fall back to the
//! defaults below (2048-point Hann transform at 20 kHz on channel 2, ten
//! suppressed bins, a 128×10 text view scaled 0..100).
//!
//! ```toml
//! [acquisition]
//! channel_id = 2
//! sample_rate_hz = 20000
//! attenuation = "db0"
//! sample_format = "type2"
//!
//! [transform]
//! frame_length = 2048
//! window = "hann"
//! dc_suppress_bins = 10
//!
//! [display]
//! width = 128
//! height = 10
//! min = 0.0
//! max = 100.0
//! fill_glyph = "|"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::acquisition::{ChannelConfig, SignalSpec};
use crate::error::ConfigError;
use crate::window::WindowKind;

/// Smallest transform the pipeline accepts.
pub const MIN_FRAME_LENGTH: usize = 4;
/// Largest transform the pipeline accepts.
pub const MAX_FRAME_LENGTH: usize = 65_536;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub acquisition: ChannelConfig,
    pub transform: TransformConfig,
    pub display: DisplayConfig,
    /// Input of the simulated converter; ignored by hardware sources.
    pub synthetic: SignalSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Samples per frame; a power of two.
    pub frame_length: usize,
    pub window: WindowKind,
    /// Lowest bins forced to zero after reduction.
    pub dc_suppress_bins: usize,
}

/// Shape handed to the renderer with every spectrum.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub width: usize,
    pub height: usize,
    pub min: f32,
    pub max: f32,
    pub fill_glyph: char,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            frame_length: 2048,
            window: WindowKind::Hann,
            dc_suppress_bins: 10,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            width: 128,
            height: 10,
            min: 0.0,
            max: 100.0,
            fill_glyph: '|',
        }
    }
}

impl TransformConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let len = self.frame_length;
        if !len.is_power_of_two() {
            return Err(ConfigError::FrameLengthNotPowerOfTwo(len));
        }
        if !(MIN_FRAME_LENGTH..=MAX_FRAME_LENGTH).contains(&len) {
            return Err(ConfigError::FrameLengthOutOfRange {
                len,
                min: MIN_FRAME_LENGTH,
                max: MAX_FRAME_LENGTH,
            });
        }
        if self.dc_suppress_bins >= len / 2 {
            return Err(ConfigError::DcSuppressTooLarge {
                bins: self.dc_suppress_bins,
                available: len / 2,
            });
        }
        Ok(())
    }
}

impl DisplayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::InvalidDisplay(format!(
                "{}x{} view has no area",
                self.width, self.height
            )));
        }
        if !(self.min < self.max) {
            return Err(ConfigError::InvalidDisplay(format!(
                "min {} must be below max {}",
                self.min, self.max
            )));
        }
        if self.fill_glyph.is_control() {
            return Err(ConfigError::InvalidDisplay(
                "fill glyph must be printable".into(),
            ));
        }
        Ok(())
    }
}

impl Config {
    /// Parses a TOML document without validating it.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Reads, parses and validates a configuration file.
    ///
    /// # Arguments
    /// * `path` - TOML file; missing sections and keys take their defaults.
    ///
    /// # Returns
    /// A validated `Config`, or the I/O, parse or validation error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every section. Called once before anything is allocated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.acquisition.validate()?;
        self.transform.validate()?;
        self.display.validate()
    }

    /// Frequency resolution of one bin in Hz.
    pub fn bin_width_hz(&self) -> f32 {
        self.acquisition.sample_rate_hz as f32 / self.transform.frame_length as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::{Attenuation, SampleFormat};

    #[test]
    fn defaults_are_valid() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.transform.frame_length, 2048);
        assert_eq!(config.acquisition.sample_rate_hz, 20_000);
        assert!((config.bin_width_hz() - 9.765625).abs() < 1e-6);
    }

    #[test]
    fn parses_partial_document() {
        let config = Config::from_toml(
            r##"
            [acquisition]
            channel_id = 4
            attenuation = "db12"
            sample_format = "type1"

            [transform]
            frame_length = 1024
            window = "blackman_harris"

            [display]
            fill_glyph = "#"

            [synthetic]
            tones = [{ frequency_hz = 440.0, amplitude = 100.0 }]
            stray_every = 50
            "##,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.acquisition.channel_id, 4);
        assert_eq!(config.acquisition.attenuation, Attenuation::Db12);
        assert_eq!(config.acquisition.sample_format, SampleFormat::Type1);
        assert_eq!(config.acquisition.sample_rate_hz, 20_000);
        assert_eq!(config.transform.window, WindowKind::BlackmanHarris);
        assert_eq!(config.transform.dc_suppress_bins, 10);
        assert_eq!(config.display.fill_glyph, '#');
        assert_eq!(config.synthetic.tones[0].frequency_hz, 440.0);
        assert_eq!(config.synthetic.stray_every, Some(50));
    }

    #[test]
    fn rejects_bad_transform_sizes() {
        let mut config = Config::default();
        config.transform.frame_length = 2000;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FrameLengthNotPowerOfTwo(2000))
        ));

        config.transform.frame_length = 2;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FrameLengthOutOfRange { len: 2, .. })
        ));

        config.transform.frame_length = 16;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::DcSuppressTooLarge { bins: 10, available: 8 })
        ));
    }

    #[test]
    fn rejects_degenerate_display() {
        let mut config = Config::default();
        config.display.max = config.display.min;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidDisplay(_))));
    }

    #[test]
    fn unknown_enum_values_fail_to_parse() {
        assert!(matches!(
            Config::from_toml("[transform]\nwindow = \"triangle\""),
            Err(ConfigError::Parse(_))
        ));
    }
}
