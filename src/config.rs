//! Compile-time sizes and the runtime output configuration.

use crate::format::SampleFormat;

/// Size in bytes of every buffer the mixer produces.
pub const MIXER_BUFFER_SIZE: usize = 512;

/// Float slots in the accumulator. Every output format is 16-bit.
pub const ACCUMULATOR_LEN: usize = MIXER_BUFFER_SIZE / 2;

/// Scale of the mixer's internal float domain.
///
/// Each channel's samples are normalised so that its declared range maps
/// onto this value, and the output stage maps it back onto the output range.
pub const INTERNAL_RANGE: f32 = 1023.0;

/// Top of the external master volume scale.
pub const MAX_VOLUME: u16 = 1023;

/// Output-stage settings applied by [`Mixer::with_config`](crate::Mixer::with_config).
///
/// ```
/// use mixdown::{MixerConfig, SampleFormat};
///
/// let config = MixerConfig::default()
///     .with_format(SampleFormat::I16)
///     .with_volume(512)
///     .with_sample_range(4095);
/// assert_eq!(config.format, SampleFormat::I16);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MixerConfig {
    /// Packed output encoding. Must be [`SampleFormat::U16`] or [`SampleFormat::I16`].
    pub format: SampleFormat,
    /// Master volume on the `0..=1023` scale.
    pub volume: u16,
    /// Maximum magnitude of packed output samples.
    pub sample_range: u16,
    /// Bits OR'd into every packed sample.
    pub or_mask: u32,
}

impl MixerConfig {
    pub fn with_format(mut self, format: SampleFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_volume(mut self, volume: u16) -> Self {
        self.volume = volume;
        self
    }

    pub fn with_sample_range(mut self, sample_range: u16) -> Self {
        self.sample_range = sample_range;
        self
    }

    pub fn with_or_mask(mut self, or_mask: u32) -> Self {
        self.or_mask = or_mask;
        self
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            format: SampleFormat::U16,
            volume: MAX_VOLUME,
            sample_range: INTERNAL_RANGE as u16,
            or_mask: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accumulator_covers_one_buffer() {
        assert_eq!(ACCUMULATOR_LEN * SampleFormat::U16.bytes_per_sample(), MIXER_BUFFER_SIZE);
        assert_eq!(ACCUMULATOR_LEN * SampleFormat::I16.bytes_per_sample(), MIXER_BUFFER_SIZE);
    }

    #[test]
    fn default_is_full_scale_unsigned() {
        let config = MixerConfig::default();
        assert_eq!(config.format, SampleFormat::U16);
        assert_eq!(config.volume, 1023);
        assert_eq!(config.sample_range, 1023);
        assert_eq!(config.or_mask, 0);
    }
}
