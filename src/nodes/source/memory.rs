//! Queue of pre-built buffers.

use alloc::boxed::Box;
use alloc::collections::VecDeque;
use alloc::vec::Vec;

use bytes::Bytes;

use crate::format::SampleFormat;
use crate::stream::{DataSink, DataSource};

/// Plays buffers that are already in memory, one per pull.
///
/// Each queued buffer counts as one unit of supply: connecting announces
/// every buffer already queued, and [`push`](Self::push) announces new ones
/// to a connected consumer. Once the queue is empty, pulls return empty
/// buffers.
pub struct MemorySource {
    format: SampleFormat,
    chunks: VecDeque<Bytes>,
    sink: Option<Box<dyn DataSink>>,
}

impl MemorySource {
    pub fn new(format: SampleFormat, chunks: Vec<Bytes>) -> Self {
        Self {
            format,
            chunks: chunks.into(),
            sink: None,
        }
    }

    /// Queues another buffer and tells the consumer about it.
    pub fn push(&mut self, chunk: Bytes) {
        self.chunks.push_back(chunk);
        if let Some(sink) = self.sink.as_mut() {
            sink.pull_request();
        }
    }

    /// Buffers not pulled yet.
    #[inline]
    pub fn queued(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.sink.is_some()
    }
}

impl DataSource for MemorySource {
    fn pull(&mut self) -> Bytes {
        self.chunks.pop_front().unwrap_or_default()
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

    fn disconnect(&mut self) {
        self.sink = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::SupplyNotifier;
    use alloc::vec;

    #[test]
    fn connect_announces_queued_chunks() {
        let mut src = MemorySource::new(
            SampleFormat::U8,
            vec![Bytes::from_static(&[1]), Bytes::from_static(&[2])],
        );
        let notifier = SupplyNotifier::new();
        src.connect(Box::new(notifier.clone()));
        assert_eq!(notifier.pending(), 2);

        src.push(Bytes::from_static(&[3]));
        assert_eq!(notifier.pending(), 3);
    }

    #[test]
    fn pulls_in_order_then_runs_dry() {
        let mut src = MemorySource::new(
            SampleFormat::U8,
            vec![Bytes::from_static(&[1]), Bytes::from_static(&[2, 3])],
        );
        assert_eq!(&src.pull()[..], &[1]);
        assert_eq!(&src.pull()[..], &[2, 3]);
        assert!(src.pull().is_empty());
        assert_eq!(src.queued(), 0);
    }

    #[test]
    fn disconnect_silences_notifications() {
        let mut src = MemorySource::new(SampleFormat::U8, vec![]);
        let notifier = SupplyNotifier::new();
        src.connect(Box::new(notifier.clone()));
        src.disconnect();
        assert!(!src.is_connected());

        src.push(Bytes::from_static(&[9]));
        assert_eq!(notifier.pending(), 0);
    }
}
