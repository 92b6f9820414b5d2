//! Sine wave source

use bytes::{Bytes, BytesMut};

use crate::format::SampleFormat;
use crate::stream::{DataSink, DataSource};

/// An endless sine generator producing 16-bit signed samples.
///
/// A tone always has more data, so it announces one buffer when connected
/// and another after every pull. Attach it with [`Tone::RANGE`] to map its
/// full scale onto the mixer's.
pub struct Tone {
    frequency: f32,
    sample_rate: u32,
    amplitude: f32,
    phase: f32,
    chunk_len: usize,
    sink: Option<Box<dyn DataSink>>,
}

impl Tone {
    /// Peak-to-peak span of a full-amplitude tone.
    pub const RANGE: u16 = u16::MAX;

    pub fn new(frequency: f32, sample_rate: u32) -> Self {
        Self {
            frequency,
            sample_rate: sample_rate.max(1),
            amplitude: 0.25, // -12dB, safe default
            phase: 0.0,
            chunk_len: 128,
            sink: None,
        }
    }

    pub fn with_amplitude(mut self, amplitude: f32) -> Self {
        self.amplitude = amplitude.clamp(0.0, 1.0);
        self
    }

    /// Samples generated per pull.
    pub fn with_chunk_len(mut self, samples: usize) -> Self {
        self.chunk_len = samples.max(1);
        self
    }

    #[inline]
    pub fn frequency(&self) -> f32 {
        self.frequency
    }

    #[inline]
    pub fn amplitude(&self) -> f32 {
        self.amplitude
    }
}

impl DataSource for Tone {
    fn pull(&mut self) -> Bytes {
        let phase_inc = self.frequency / self.sample_rate as f32;
        let peak = self.amplitude * i16::MAX as f32;

        let mut out = BytesMut::with_capacity(self.chunk_len * 2);
        for _ in 0..self.chunk_len {
            let sample = (self.phase * core::f32::consts::TAU).sin() * peak;
            SampleFormat::I16.write_sample(&mut out, sample as i32);

            self.phase += phase_inc;
            self.phase -= self.phase.floor();
        }

        if let Some(sink) = self.sink.as_mut() {
            sink.pull_request();
        }
        out.freeze()
    }

    fn format(&self) -> SampleFormat {
        SampleFormat::I16
    }

    fn connect(&mut self, mut sink: Box<dyn DataSink>) {
        sink.pull_request();
        self.sink = Some(sink);
    }

    fn disconnect(&mut self) {
        self.sink = None;
    }
}
