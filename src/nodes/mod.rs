//! Ready-made pipeline stages to put around a [`Mixer`](crate::Mixer).
//!
//! ## Sources ([`source`])
//!
//! Feed a mixer channel:
//! - [`MemorySource`] - Plays a queue of pre-built buffers
//! - [`Tone`] - Endless 16-bit sine generator (requires `std`)
//! - [`RingSource`] - Reads bytes written from another thread (requires `std`)
//!
//! ## Sinks ([`sink`])
//!
//! Sit below a mixer:
//! - [`Demand`] - Counts availability notifications for a driver loop
//! - [`CpalSink`] - Plays packed output on an audio device (requires `cpal_sink` feature)

pub mod source;
pub mod sink;

// Re-export common types at the top level for convenience
pub use source::MemorySource;
#[cfg(feature = "std")]
pub use source::{ring, RingSource, RingWriter, Tone};
pub use sink::Demand;

#[cfg(feature = "cpal_sink")]
pub use sink::CpalSink;
