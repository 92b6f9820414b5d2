//! # mixdown
//!
//! A pull-based sample mixer for small audio pipelines.
//!
//! Any number of independently clocked [`DataSource`]s are attached to a
//! [`Mixer`] as channels. Whatever sits below the mixer pulls fixed-size
//! buffers from it; each pull normalises every channel into a shared float
//! accumulator, then packs the sum into a 16-bit output format with master
//! volume, range mapping, clipping and an optional OR mask.
//!
//! - Buffers are shared [`bytes::Bytes`], moved between stages without copying
//! - Producers announce data with cheap notifications; the mixer pulls lazily
//! - A starved channel goes quiet for the rest of a cycle instead of stalling
//!   the mix
//! - The core builds without `std`, for embedded targets
//!
//! ## Quick Start
//!
//! ```
//! use mixdown::nodes::{Demand, Tone};
//! use mixdown::{DataSource, Mixer, SampleFormat, MIXER_BUFFER_SIZE};
//!
//! let mut mixer = Mixer::new(SampleFormat::I16);
//! let demand = Demand::new();
//! mixer.connect(Box::new(demand.clone()));
//!
//! mixer.add_channel(Tone::new(440.0, 8000), Tone::RANGE);
//! mixer.add_channel(Tone::new(660.0, 8000), Tone::RANGE);
//!
//! while demand.take() {
//!     let buffer = mixer.pull();
//!     assert_eq!(buffer.len(), MIXER_BUFFER_SIZE);
//!     # break;
//! }
//! ```
//!
//! ## Features
//!
//! - `std` (default): std-only nodes ([`nodes::Tone`], [`nodes::RingSource`])
//! - `cpal_sink`: [`nodes::CpalSink`] for playback on a desktop audio device
//! - `warn_on_empty`: log starved channels at `warn` instead of `trace`

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

mod channel;
mod config;
mod error;
mod format;
mod mixer;
mod stream;
pub mod nodes;

pub use config::{MixerConfig, ACCUMULATOR_LEN, INTERNAL_RANGE, MAX_VOLUME, MIXER_BUFFER_SIZE};
pub use error::MixerError;
pub use format::SampleFormat;
pub use mixer::{ChannelId, Mixer};
pub use stream::{DataSink, DataSource, SupplyNotifier};
