//! Per-source mixer state.

use alloc::boxed::Box;

use bytes::{Buf, Bytes};

use crate::config::INTERNAL_RANGE;
use crate::format::SampleFormat;
use crate::mixer::ChannelId;
use crate::stream::{DataSource, SupplyNotifier};

/// Adapts one upstream [`DataSource`] into the mixer's float domain.
///
/// A channel owns the source it reads from, the input buffer it is part way
/// through, and the counter of supply notifications it has not pulled yet.
/// Dropping a channel disconnects its source.
pub(crate) struct Channel {
    id: ChannelId,
    stream: Box<dyn DataSource>,
    format: SampleFormat,
    bytes_per_sample: usize,
    /// Declared maximum magnitude of this source's raw samples.
    range: u16,
    gain: f32,
    offset: f32,
    volume: f32,
    /// Unread part of the held input buffer; consumed from the front.
    buffer: Bytes,
    supply: SupplyNotifier,
}

impl Channel {
    /// Builds the channel and registers it as `stream`'s consumer.
    pub fn attach(id: ChannelId, mut stream: Box<dyn DataSource>, range: u16) -> Self {
        let supply = SupplyNotifier::new();
        stream.connect(Box::new(supply.clone()));

        let mut channel = Self {
            id,
            stream,
            format: SampleFormat::Unknown,
            bytes_per_sample: 0,
            range: range.max(1),
            gain: 1.0,
            offset: 0.0,
            volume: 1.0,
            buffer: Bytes::new(),
            supply,
        };
        channel.configure();
        channel
    }

    /// Re-reads the source's format and derives gain and offset from it.
    ///
    /// Leaves everything untouched while the source's format is unknown.
    pub fn configure(&mut self) {
        let format = self.stream.format();
        if !format.is_known() {
            return;
        }

        if format != self.format {
            tracing::debug!(channel = ?self.id, ?format, "channel format configured");
        }

        let range = f32::from(self.range);
        self.format = format;
        self.bytes_per_sample = format.bytes_per_sample();
        self.gain = INTERNAL_RANGE / range;
        self.offset = if format.is_unsigned() { range * -0.5 } else { 0.0 };
    }

    #[inline]
    pub fn id(&self) -> ChannelId {
        self.id
    }

    #[inline]
    pub fn format(&self) -> SampleFormat {
        self.format
    }

    #[inline]
    pub fn pending_supply(&self) -> u32 {
        self.supply.pending()
    }

    /// Whole samples left in the held buffer.
    #[inline]
    fn samples_left(&self) -> usize {
        match self.bytes_per_sample {
            0 => 0,
            n => self.buffer.remaining() / n,
        }
    }

    /// Adds this channel's next samples into `acc`, starting at slot 0.
    ///
    /// Consumes the held buffer and, while notifications are pending, pulls
    /// replacements from the source. Stops when `acc` is full or when input
    /// runs dry with nothing pending; the slots it didn't reach get no
    /// contribution. Returns the number of slots filled.
    pub fn accumulate(&mut self, acc: &mut [f32]) -> usize {
        if !self.format.is_known() {
            self.configure();
            if !self.format.is_known() {
                return 0;
            }
        }

        let format = self.format;
        let scale = self.gain * self.volume;
        let offset = self.offset;
        let mut filled = 0;

        while filled < acc.len() {
            let n = self.samples_left().min(acc.len() - filled);
            for slot in &mut acc[filled..filled + n] {
                let v = format.read_sample(&mut self.buffer) + offset;
                *slot += v * scale;
            }
            filled += n;

            if filled == acc.len() {
                break;
            }

            // Out of whole samples. A trailing partial sample is dropped.
            if !self.supply.take() {
                #[cfg(feature = "warn_on_empty")]
                tracing::warn!(channel = ?self.id, filled, "channel starved mid-cycle");
                #[cfg(not(feature = "warn_on_empty"))]
                tracing::trace!(channel = ?self.id, filled, "channel starved mid-cycle");
                break;
            }
            self.buffer = self.stream.pull();
        }

        filled
    }
}

impl Drop for Channel {
    fn drop(&mut self) {
        // Disconnect first so no notification races the buffer release.
        self.stream.disconnect();
        self.buffer = Bytes::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::DataSink;
    use alloc::vec;
    use alloc::vec::Vec;

    struct Chunks {
        format: SampleFormat,
        chunks: Vec<Bytes>,
        sink: Option<Box<dyn DataSink>>,
    }

    impl Chunks {
        fn new(format: SampleFormat, chunks: Vec<Bytes>) -> Self {
            Self { format, chunks, sink: None }
        }
    }

    impl DataSource for Chunks {
        fn pull(&mut self) -> Bytes {
            if self.chunks.is_empty() {
                Bytes::new()
            } else {
                self.chunks.remove(0)
            }
        }

        fn format(&self) -> SampleFormat {
            self.format
        }

        fn connect(&mut self, mut sink: Box<dyn DataSink>) {
            for _ in 0..self.chunks.len() {
                sink.pull_request();
            }
            self.sink = Some(sink);
        }
    }

    fn i16_bytes(samples: &[i16]) -> Bytes {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect::<Vec<u8>>().into()
    }

    #[test]
    fn unsigned_sources_are_centred() {
        let src = Chunks::new(SampleFormat::U8, vec![]);
        let ch = Channel::attach(ChannelId(0), Box::new(src), 255);
        assert_eq!(ch.offset, -127.5);
        assert_eq!(ch.gain, INTERNAL_RANGE / 255.0);
        assert_eq!(ch.bytes_per_sample, 1);
    }

    #[test]
    fn signed_sources_have_no_offset() {
        let src = Chunks::new(SampleFormat::I16, vec![]);
        let ch = Channel::attach(ChannelId(0), Box::new(src), 1023);
        assert_eq!(ch.offset, 0.0);
        assert_eq!(ch.gain, 1.0);
    }

    #[test]
    fn zero_range_is_clamped() {
        let src = Chunks::new(SampleFormat::I16, vec![]);
        let ch = Channel::attach(ChannelId(0), Box::new(src), 0);
        assert!(ch.gain.is_finite() && ch.gain > 0.0);
    }

    #[test]
    fn unknown_format_contributes_nothing() {
        let src = Chunks::new(SampleFormat::Unknown, vec![i16_bytes(&[100; 4])]);
        let mut ch = Channel::attach(ChannelId(0), Box::new(src), 1023);
        let mut acc = [0.0f32; 4];
        assert_eq!(ch.accumulate(&mut acc), 0);
        assert_eq!(acc, [0.0; 4]);
        assert_eq!(ch.pending_supply(), 1);
    }

    #[test]
    fn pulls_across_buffers_until_full() {
        let chunks = vec![i16_bytes(&[10, 20]), i16_bytes(&[30, 40, 50])];
        let src = Chunks::new(SampleFormat::I16, chunks);
        let mut ch = Channel::attach(ChannelId(0), Box::new(src), 1023);

        let mut acc = [1.0f32; 4];
        assert_eq!(ch.accumulate(&mut acc), 4);
        assert_eq!(acc, [11.0, 21.0, 31.0, 41.0]);

        // The rest of the second chunk carries over to the next cycle.
        let mut acc = [0.0f32; 4];
        assert_eq!(ch.accumulate(&mut acc), 1);
        assert_eq!(acc, [50.0, 0.0, 0.0, 0.0]);
    }

    #[test]
    fn trailing_partial_sample_is_dropped() {
        let src = Chunks::new(SampleFormat::I16, vec![Bytes::from_static(&[5, 0, 7])]);
        let mut ch = Channel::attach(ChannelId(0), Box::new(src), 1023);
        let mut acc = [0.0f32; 4];
        assert_eq!(ch.accumulate(&mut acc), 1);
        assert_eq!(acc[0], 5.0);
    }
}
