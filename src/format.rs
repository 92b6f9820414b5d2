//! Sample formats and their wire codecs.
//!
//! Every buffer passed between pipeline stages is raw bytes. A
//! [`SampleFormat`] says how to read a sample out of those bytes and how to
//! write one back. 16-bit formats are little-endian on the wire.

use bytes::{Buf, BufMut};

/// Encoding of the samples carried by a stream.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default)]
pub enum SampleFormat {
    /// The stream has not declared a format yet.
    #[default]
    Unknown,
    /// 8-bit unsigned, zero level at the middle of the range.
    U8,
    /// 16-bit unsigned little-endian, zero level at the middle of the range.
    U16,
    /// 16-bit signed little-endian.
    I16,
}

impl SampleFormat {
    /// Bytes occupied by one sample. `0` for [`SampleFormat::Unknown`].
    #[inline]
    pub const fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::Unknown => 0,
            SampleFormat::U8 => 1,
            SampleFormat::U16 | SampleFormat::I16 => 2,
        }
    }

    /// Unsigned encodings are biased; their silence sits at `range / 2`.
    #[inline]
    pub const fn is_unsigned(self) -> bool {
        matches!(self, SampleFormat::U8 | SampleFormat::U16)
    }

    #[inline]
    pub const fn is_known(self) -> bool {
        !matches!(self, SampleFormat::Unknown)
    }

    /// Whether a mixer may pack its output in this format.
    #[inline]
    pub const fn is_output_format(self) -> bool {
        matches!(self, SampleFormat::U16 | SampleFormat::I16)
    }

    /// Reads one raw sample from the front of `buf`, returned as a float
    /// without any normalisation.
    ///
    /// Returns `0.0` without consuming anything for [`SampleFormat::Unknown`].
    ///
    /// # Panics
    ///
    /// Panics if `buf` holds fewer than [`bytes_per_sample`](Self::bytes_per_sample)
    /// bytes. Callers check `remaining()` first.
    #[inline]
    pub fn read_sample<B: Buf>(self, buf: &mut B) -> f32 {
        match self {
            SampleFormat::Unknown => 0.0,
            SampleFormat::U8 => buf.get_u8() as f32,
            SampleFormat::U16 => buf.get_u16_le() as f32,
            SampleFormat::I16 => buf.get_i16_le() as f32,
        }
    }

    /// Writes `sample` to `buf`, truncated to the width of the format.
    ///
    /// Nothing is written for [`SampleFormat::Unknown`].
    #[inline]
    pub fn write_sample<B: BufMut>(self, buf: &mut B, sample: i32) {
        match self {
            SampleFormat::Unknown => {}
            SampleFormat::U8 => buf.put_u8(sample as u8),
            SampleFormat::U16 => buf.put_u16_le(sample as u16),
            SampleFormat::I16 => buf.put_i16_le(sample as i16),
        }
    }

    /// Maps a raw sample with maximum magnitude `range` into `[-1.0, 1.0]`.
    ///
    /// Used by playback sinks to turn packed integers back into floats.
    #[inline]
    pub fn decode_normalized(self, raw: f32, range: f32) -> f32 {
        let half = range * 0.5;
        if half <= 0.0 {
            return 0.0;
        }

        let centred = if self.is_unsigned() { raw - half } else { raw };
        (centred / half).clamp(-1.0, 1.0)
    }
}
