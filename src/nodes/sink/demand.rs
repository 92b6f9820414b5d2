use crate::stream::{DataSink, SupplyNotifier};

/// A sink that just counts "buffer available" notifications.
///
/// Connect a clone below a mixer and poll the other from whatever loop
/// drives playback: each [`take`](Self::take) that succeeds means one
/// [`pull`](crate::DataSource::pull) is due.
#[derive(Clone, Debug, Default)]
pub struct Demand(SupplyNotifier);

impl Demand {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn pending(&self) -> u32 {
        self.0.pending()
    }

    /// Consumes one notification if any are pending.
    #[inline]
    pub fn take(&self) -> bool {
        self.0.take()
    }
}

impl DataSink for Demand {
    fn pull_request(&mut self) {
        self.0.notify();
    }
}
