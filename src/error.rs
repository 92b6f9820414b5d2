//! Mixer errors.

use thiserror::Error;

use crate::format::SampleFormat;
use crate::mixer::ChannelId;

/// Rejected control input. The mixer's previous state is left untouched.
///
/// Every variant belongs to the "invalid parameter" class; the mixing path
/// itself never fails.
#[derive(Error, Clone, Copy, Debug, PartialEq, Eq)]
pub enum MixerError {
    #[error("unsupported output format {0:?}, expected U16 or I16")]
    UnsupportedFormat(SampleFormat),
    #[error("volume {0} is outside 0..=1023")]
    VolumeOutOfRange(u16),
    #[error("no channel with id {0:?}")]
    UnknownChannel(ChannelId),
}

impl MixerError {
    #[inline]
    pub fn is_invalid_parameter(&self) -> bool {
        matches!(
            self,
            MixerError::UnsupportedFormat(_)
                | MixerError::VolumeOutOfRange(_)
                | MixerError::UnknownChannel(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::string::ToString;

    #[test]
    fn messages_name_the_bad_value() {
        let err = MixerError::VolumeOutOfRange(2000);
        assert!(err.is_invalid_parameter());
        assert_eq!(err.to_string(), "volume 2000 is outside 0..=1023");

        let err = MixerError::UnsupportedFormat(SampleFormat::U8);
        assert!(err.to_string().contains("U8"));
    }
}
