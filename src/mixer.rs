//! The mixer: many pull-driven sources in, one packed stream out.

use alloc::boxed::Box;
use alloc::vec::Vec;

use bytes::{Bytes, BytesMut};

use crate::channel::Channel;
use crate::config::{MixerConfig, ACCUMULATOR_LEN, INTERNAL_RANGE, MAX_VOLUME, MIXER_BUFFER_SIZE};
use crate::error::MixerError;
use crate::format::SampleFormat;
use crate::stream::{DataSink, DataSource};

/// Stable identifier for a channel attached to a [`Mixer`].
///
/// Ids are never reused, so a stale id can't address a newer channel.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct ChannelId(pub(crate) u64);

/// Blends any number of upstream sources into one fixed-size output stream.
///
/// The mixer is itself a [`DataSource`]: whatever sits below it calls
/// [`pull`](DataSource::pull) to get exactly [`MIXER_BUFFER_SIZE`] bytes of
/// packed samples, and is told through its [`DataSink`] whenever a buffer
/// has been produced.
///
/// Each cycle, every channel is normalised into a shared float accumulator
/// (`INTERNAL_RANGE` full scale), so the order channels are summed in
/// doesn't matter. The accumulator is then scaled by the master volume,
/// mapped onto the output range, clipped, OR'd with the output mask and
/// encoded in the output format.
///
/// A channel that runs out of input mid-cycle and has no pending supply
/// notifications simply stops contributing for the rest of that cycle.
/// Nothing in the mixing path blocks or fails.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use mixdown::nodes::{Demand, MemorySource};
/// use mixdown::{DataSource, Mixer, SampleFormat, MIXER_BUFFER_SIZE};
///
/// let mut mixer = Mixer::new(SampleFormat::I16);
/// let demand = Demand::new();
/// mixer.connect(Box::new(demand.clone()));
///
/// let tone = Bytes::from(vec![0x10, 0x00, 0x20, 0x00]);
/// mixer.add_channel(MemorySource::new(SampleFormat::I16, vec![tone]), 1023);
///
/// let out = mixer.pull();
/// assert_eq!(out.len(), MIXER_BUFFER_SIZE);
/// assert_eq!(&out[..4], &[0x10, 0x00, 0x20, 0x00]);
/// ```
///
/// Dropping the mixer disconnects every attached source exactly once.
pub struct Mixer {
    channels: Vec<Channel>,
    next_channel_id: u64,
    accumulator: [f32; ACCUMULATOR_LEN],
    downstream: Option<Box<dyn DataSink>>,

    output_format: SampleFormat,
    bytes_per_sample_out: usize,
    /// Master volume as a linear scale in `[0.0, 1.0]`.
    volume: f32,
    volume_level: u16,
    output_range: f32,
    or_mask: u32,
}

impl Mixer {
    /// Creates a mixer producing `format`.
    ///
    /// If `format` isn't a supported output format the mixer keeps its
    /// default of [`SampleFormat::U16`].
    pub fn new(format: SampleFormat) -> Self {
        let defaults = MixerConfig::default();
        let mut mixer = Self {
            channels: Vec::new(),
            next_channel_id: 0,
            accumulator: [0.0; ACCUMULATOR_LEN],
            downstream: None,
            output_format: defaults.format,
            bytes_per_sample_out: defaults.format.bytes_per_sample(),
            volume: 1.0,
            volume_level: MAX_VOLUME,
            output_range: f32::from(defaults.sample_range),
            or_mask: defaults.or_mask,
        };

        if mixer.set_format(format).is_err() {
            tracing::debug!(requested = ?format, "keeping default output format");
        }
        mixer
    }

    /// Creates a mixer with every output setting taken from `config`.
    pub fn with_config(config: MixerConfig) -> Result<Self, MixerError> {
        let mut mixer = Self::new(SampleFormat::U16);
        mixer.set_format(config.format)?;
        mixer.set_volume(config.volume)?;
        mixer.set_sample_range(config.sample_range);
        mixer.set_or_mask(config.or_mask);
        Ok(mixer)
    }

    /// Attaches `source` as a new channel.
    ///
    /// `range` is the largest magnitude `source` produces; it is scaled so
    /// that this maps onto full scale inside the mixer. The source is told
    /// it now has a consumer and its supply notifications are counted
    /// against this channel from here on.
    pub fn add_channel<S: DataSource + 'static>(&mut self, source: S, range: u16) -> ChannelId {
        let id = ChannelId(self.next_channel_id);
        self.next_channel_id += 1;

        let channel = Channel::attach(id, Box::new(source), range);
        tracing::debug!(channel = ?id, range, format = ?channel.format(), "channel attached");

        self.channels.push(channel);
        id
    }

    /// Detaches a channel. Its source is disconnected before its buffer is released.
    pub fn remove_channel(&mut self, id: ChannelId) -> Result<(), MixerError> {
        let idx = self
            .channels
            .iter()
            .position(|c| c.id() == id)
            .ok_or(MixerError::UnknownChannel(id))?;

        drop(self.channels.remove(idx));
        tracing::debug!(channel = ?id, "channel removed");
        Ok(())
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn contains(&self, id: ChannelId) -> bool {
        self.channels.iter().any(|c| c.id() == id)
    }

    /// Supply notifications received by a channel that haven't been pulled yet.
    pub fn pending_supply(&self, id: ChannelId) -> Option<u32> {
        self.channels
            .iter()
            .find(|c| c.id() == id)
            .map(Channel::pending_supply)
    }

    /// Selects the packed output encoding. Only `U16` and `I16` are accepted.
    pub fn set_format(&mut self, format: SampleFormat) -> Result<(), MixerError> {
        if !format.is_output_format() {
            tracing::warn!(?format, "rejected output format");
            return Err(MixerError::UnsupportedFormat(format));
        }

        self.output_format = format;
        self.bytes_per_sample_out = format.bytes_per_sample();
        Ok(())
    }

    /// Master volume on the `0..=1023` scale.
    #[inline]
    pub fn volume(&self) -> u16 {
        self.volume_level
    }

    /// Sets the master volume on the `0..=1023` scale.
    pub fn set_volume(&mut self, volume: u16) -> Result<(), MixerError> {
        if volume > MAX_VOLUME {
            tracing::warn!(volume, "rejected master volume");
            return Err(MixerError::VolumeOutOfRange(volume));
        }

        self.volume_level = volume;
        self.volume = f32::from(volume) / f32::from(MAX_VOLUME);
        Ok(())
    }

    /// Maximum magnitude of packed output samples.
    #[inline]
    pub fn sample_range(&self) -> u16 {
        self.output_range as u16
    }

    pub fn set_sample_range(&mut self, range: u16) {
        self.output_range = f32::from(range);
    }

    #[inline]
    pub fn or_mask(&self) -> u32 {
        self.or_mask
    }

    /// Bits OR'd into every packed sample, for downstream stages that carry
    /// control data inside their samples.
    pub fn set_or_mask(&mut self, mask: u32) {
        self.or_mask = mask;
    }

    #[inline]
    pub fn is_connected(&self) -> bool {
        self.downstream.is_some()
    }

    fn notify_downstream(&mut self) {
        match self.downstream.as_mut() {
            Some(sink) => sink.pull_request(),
            None => tracing::trace!("no downstream sink to notify"),
        }
    }

    /// Runs one mix cycle into the accumulator.
    fn accumulate(&mut self, len: usize) {
        let acc = &mut self.accumulator[..len];
        acc.fill(0.0);

        for channel in self.channels.iter_mut() {
            let filled = channel.accumulate(acc);
            if filled < len {
                tracing::trace!(channel = ?channel.id(), filled, len, "partial contribution");
            }
        }
    }

    /// Scales, offsets, clips, masks and encodes the first `len` accumulator slots.
    fn pack(&self, len: usize) -> Bytes {
        let format = self.output_format;
        let range = self.output_range;
        let scale = self.volume * range / INTERNAL_RANGE;

        let (offset, lo, hi) = if format.is_unsigned() {
            // Integer midpoint, as the wire level for silence.
            ((range / 2.0) as i32 as f32, 0.0, range)
        } else {
            (0.0, -range / 2.0, range / 2.0)
        };
        let mask = self.or_mask as i32;

        let mut out = BytesMut::with_capacity(MIXER_BUFFER_SIZE);
        for &slot in &self.accumulator[..len] {
            let sample = (slot * scale + offset).clamp(lo, hi);
            format.write_sample(&mut out, sample as i32 | mask);
        }
        out.freeze()
    }
}

impl DataSource for Mixer {
    /// Produces exactly [`MIXER_BUFFER_SIZE`] bytes and notifies the downstream sink.
    ///
    /// With no channels attached the buffer holds the output format's
    /// silence level (still OR'd with the mask).
    fn pull(&mut self) -> Bytes {
        let len = MIXER_BUFFER_SIZE / self.bytes_per_sample_out;

        if self.channels.is_empty() {
            self.accumulator[..len].fill(0.0);
        } else {
            self.accumulate(len);
        }

        let output = self.pack(len);
        tracing::trace!(channels = self.channels.len(), bytes = output.len(), "mix cycle complete");

        self.notify_downstream();
        output
    }

    fn format(&self) -> SampleFormat {
        self.output_format
    }

    /// Stores `sink` and immediately tells it a buffer is available.
    fn connect(&mut self, sink: Box<dyn DataSink>) {
        self.downstream = Some(sink);
        tracing::debug!("downstream connected");
        self.notify_downstream();
    }

    fn disconnect(&mut self) {
        if self.downstream.take().is_some() {
            tracing::debug!("downstream disconnected");
        }
    }
}
