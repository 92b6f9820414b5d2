//! Pull-streaming capabilities shared by every pipeline stage.
//!
//! Data only moves when a consumer asks for it:
//!
//! - A producer that has new data calls [`DataSink::pull_request`] on
//!   whatever is connected below it.
//! - The consumer later calls [`DataSource::pull`] on its own schedule.
//!
//! Notifications are cheap and never move data themselves. The
//! [`Mixer`](crate::Mixer) counts them per channel with a [`SupplyNotifier`]
//! and pulls lazily during its own mix cycle.

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::sync::atomic::{AtomicU32, Ordering};

use bytes::Bytes;

use crate::format::SampleFormat;

/// The downstream half of a connection: told whenever data is available.
pub trait DataSink: Send {
    /// New data can be pulled from the upstream source.
    fn pull_request(&mut self);
}

/// The upstream half of a connection: hands out raw sample buffers on demand.
pub trait DataSource: Send {
    /// Returns the next chunk of raw samples.
    ///
    /// Must not block. The buffer may be shorter than the consumer would
    /// like, or empty, if that is all that is ready.
    fn pull(&mut self) -> Bytes;

    /// Encoding of the buffers returned by [`pull`](Self::pull).
    fn format(&self) -> SampleFormat;

    /// Registers `sink` as the receiver of this source's supply notifications.
    fn connect(&mut self, sink: Box<dyn DataSink>);

    /// Forgets the connected sink. No notifications are sent afterwards.
    fn disconnect(&mut self) {}
}

/// Counts "more data is available" notifications for one consumer.
///
/// Clones share the same counter. Hand one clone to the producer (it is a
/// [`DataSink`]) and keep another to [`take`](Self::take) notifications as
/// buffers are pulled. The counter is atomic, so the producer side may
/// signal from another thread or an interrupt handler.
#[derive(Clone, Debug, Default)]
pub struct SupplyNotifier {
    pending: Arc<AtomicU32>,
}

impl SupplyNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one notification.
    #[inline]
    pub fn notify(&self) {
        self.pending.fetch_add(1, Ordering::AcqRel);
    }

    /// Number of notifications not yet consumed.
    #[inline]
    pub fn pending(&self) -> u32 {
        self.pending.load(Ordering::Acquire)
    }

    /// Consumes one notification if any are pending.
    #[inline]
    pub fn take(&self) -> bool {
        self.pending
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok()
    }
}

impl DataSink for SupplyNotifier {
    fn pull_request(&mut self) {
        self.notify();
    }
}
