//! Lock-free bridge from a producer thread into a mixer channel.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::{Bytes, BytesMut};
use rtrb::{Consumer, Producer, RingBuffer};

use crate::format::SampleFormat;
use crate::stream::{DataSink, DataSource};

type SharedSink = Arc<Mutex<Option<Box<dyn DataSink>>>>;

/// Creates a ring of `capacity` bytes carrying `format` samples.
///
/// The [`RingWriter`] stays with the producing thread; the [`RingSource`]
/// is attached to a mixer. Each pull returns at most `chunk_len` bytes and
/// only whole samples; `chunk_len` is rounded down to a multiple of the
/// sample width, and to at least one sample.
///
/// ```
/// use mixdown::nodes::ring;
/// use mixdown::{DataSource, Mixer, SampleFormat};
///
/// let (mut writer, source) = ring(4096, SampleFormat::I16, 512);
/// let mut mixer = Mixer::new(SampleFormat::I16);
/// let id = mixer.add_channel(source, 1023);
///
/// writer.write(&[0x10, 0x00, 0x20, 0x00]);
/// assert_eq!(mixer.pending_supply(id), Some(1));
///
/// let out = mixer.pull();
/// assert_eq!(&out[..4], &[0x10, 0x00, 0x20, 0x00]);
/// ```
pub fn ring(capacity: usize, format: SampleFormat, chunk_len: usize) -> (RingWriter, RingSource) {
    let (producer, consumer) = RingBuffer::<u8>::new(capacity);
    let sink: SharedSink = Arc::new(Mutex::new(None));
    let announced = Arc::new(AtomicUsize::new(0));
    let width = format.bytes_per_sample().max(1);
    let chunk_len = (chunk_len - chunk_len % width).max(width);

    let writer = RingWriter {
        producer,
        capacity,
        width,
        chunk_len,
        sink: sink.clone(),
        announced: announced.clone(),
    };
    let source = RingSource {
        consumer,
        format,
        width,
        chunk_len,
        sink,
        announced,
    };
    (writer, source)
}

/// Producer half of [`ring`].
pub struct RingWriter {
    producer: Producer<u8>,
    capacity: usize,
    width: usize,
    chunk_len: usize,
    sink: SharedSink,
    /// Notifications sent that no pull has answered yet.
    announced: Arc<AtomicUsize>,
}

impl RingWriter {
    /// Writes as much of `data` as fits and returns how many bytes were taken.
    ///
    /// The consumer is notified once per pull needed to drain the whole
    /// samples now buffered, minus the notifications it already holds.
    /// Bytes of an incomplete sample wait for the rest of it.
    pub fn write(&mut self, data: &[u8]) -> usize {
        let n = data.len().min(self.producer.slots());
        if n == 0 {
            return 0;
        }

        let mut chunk = match self.producer.write_chunk(n) {
            Ok(chunk) => chunk,
            Err(_) => return 0,
        };
        let (first, second) = chunk.as_mut_slices();
        let split = first.len();
        first.copy_from_slice(&data[..split]);
        second.copy_from_slice(&data[split..n]);
        chunk.commit_all();

        let buffered = self.capacity - self.producer.slots();
        let needed = (buffered - buffered % self.width).div_ceil(self.chunk_len);

        if let Ok(mut sink) = self.sink.lock() {
            if let Some(sink) = sink.as_mut() {
                let mut extra = 0;
                let _ = self.announced.fetch_update(Ordering::AcqRel, Ordering::Acquire, |sent| {
                    extra = needed.saturating_sub(sent);
                    Some(sent + extra)
                });
                for _ in 0..extra {
                    sink.pull_request();
                }
            }
        }
        n
    }

    /// Free space in bytes.
    #[inline]
    pub fn available(&self) -> usize {
        self.producer.slots()
    }
}

/// Consumer half of [`ring`].
pub struct RingSource {
    consumer: Consumer<u8>,
    format: SampleFormat,
    width: usize,
    chunk_len: usize,
    sink: SharedSink,
    announced: Arc<AtomicUsize>,
}

impl RingSource {
    /// Bytes written but not pulled yet.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.consumer.slots()
    }
}

impl DataSource for RingSource {
    fn pull(&mut self) -> Bytes {
        let _ = self
            .announced
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |sent| sent.checked_sub(1));

        let available = self.consumer.slots().min(self.chunk_len);
        let n = available - available % self.width;
        if n == 0 {
            return Bytes::new();
        }
        let chunk = match self.consumer.read_chunk(n) {
            Ok(chunk) => chunk,
            Err(_) => return Bytes::new(),
        };

        let (first, second) = chunk.as_slices();
        let mut out = BytesMut::with_capacity(n);
        out.extend_from_slice(first);
        out.extend_from_slice(second);
        chunk.commit_all();
        out.freeze()
    }

    fn format(&self) -> SampleFormat {
        self.format
    }

    fn connect(&mut self, sink: Box<dyn DataSink>) {
        if let Ok(mut slot) = self.sink.lock() {
            *slot = Some(sink);
            self.announced.store(0, Ordering::Release);
        }
    }

    fn disconnect(&mut self) {
        if let Ok(mut slot) = self.sink.lock() {
            *slot = None;
            self.announced.store(0, Ordering::Release);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::SupplyNotifier;
    use crate::Mixer;

    fn i16_samples(buf: &[u8]) -> Vec<i16> {
        buf.chunks_exact(2).map(|b| i16::from_le_bytes([b[0], b[1]])).collect()
    }

    #[test]
    fn writes_are_announced_per_chunk() {
        let (mut writer, mut source) = ring(64, SampleFormat::U8, 4);
        let notifier = SupplyNotifier::new();
        source.connect(Box::new(notifier.clone()));

        assert_eq!(writer.write(&[1, 2, 3, 4, 5, 6]), 6);
        assert_eq!(notifier.pending(), 2);

        assert_eq!(&source.pull()[..], &[1, 2, 3, 4]);
        assert_eq!(&source.pull()[..], &[5, 6]);
        assert!(source.pull().is_empty());
    }

    #[test]
    fn full_ring_takes_what_fits() {
        let (mut writer, source) = ring(4, SampleFormat::U8, 4);
        assert_eq!(writer.write(&[1, 2, 3, 4, 5, 6]), 4);
        assert_eq!(writer.available(), 0);
        assert_eq!(writer.write(&[7]), 0);
        assert_eq!(source.buffered(), 4);
    }

    #[test]
    fn disconnected_ring_stays_quiet() {
        let (mut writer, mut source) = ring(16, SampleFormat::U8, 4);
        let notifier = SupplyNotifier::new();
        source.connect(Box::new(notifier.clone()));
        source.disconnect();

        writer.write(&[1, 2]);
        assert_eq!(notifier.pending(), 0);
    }

    #[test]
    fn writer_can_live_on_another_thread() {
        let (mut writer, mut source) = ring(64, SampleFormat::U8, 64);
        let notifier = SupplyNotifier::new();
        source.connect(Box::new(notifier.clone()));

        std::thread::spawn(move || {
            writer.write(&[9; 10]);
        })
        .join()
        .unwrap();

        assert!(notifier.take());
        assert_eq!(source.pull().len(), 10);
    }

    #[test]
    fn chunk_len_is_rounded_to_whole_samples() {
        let (mut writer, source) = ring(64, SampleFormat::I16, 3);
        let mut mixer = Mixer::new(SampleFormat::I16);
        let id = mixer.add_channel(source, 1023);

        writer.write(&[10, 0, 20, 0, 30, 0]);
        assert_eq!(mixer.pending_supply(id), Some(3));

        let out = i16_samples(&mixer.pull());
        assert_eq!(&out[..4], &[10, 20, 30, 0]);
    }

    #[test]
    fn sample_split_across_writes_is_kept_whole() {
        let (mut writer, source) = ring(64, SampleFormat::I16, 512);
        let mut mixer = Mixer::new(SampleFormat::I16);
        mixer.add_channel(source, 1023);

        writer.write(&[10, 0, 20]);
        let out = i16_samples(&mixer.pull());
        assert_eq!(&out[..2], &[10, 0]);

        writer.write(&[0, 30, 0]);
        let out = i16_samples(&mixer.pull());
        assert_eq!(&out[..3], &[20, 30, 0]);
    }

    #[test]
    fn small_writes_share_one_notification() {
        let (mut writer, mut source) = ring(64, SampleFormat::U8, 4);
        let notifier = SupplyNotifier::new();
        source.connect(Box::new(notifier.clone()));

        for byte in 1..=3 {
            writer.write(&[byte]);
        }
        assert_eq!(notifier.pending(), 1);

        writer.write(&[4, 5]);
        assert_eq!(notifier.pending(), 2);

        assert_eq!(&source.pull()[..], &[1, 2, 3, 4]);
        writer.write(&[6]);
        assert_eq!(notifier.pending(), 2);
    }

    #[test]
    fn half_a_sample_is_not_announced() {
        let (mut writer, mut source) = ring(16, SampleFormat::U16, 4);
        let notifier = SupplyNotifier::new();
        source.connect(Box::new(notifier.clone()));

        writer.write(&[1]);
        assert_eq!(notifier.pending(), 0);
        assert!(source.pull().is_empty());

        writer.write(&[2]);
        assert_eq!(notifier.pending(), 1);
        assert_eq!(&source.pull()[..], &[1, 2]);
    }
}
