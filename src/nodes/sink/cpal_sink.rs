//! CPAL audio output for packed mixer buffers

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat as DeviceFormat, SupportedStreamConfig};
use rtrb::{Consumer, Producer, RingBuffer};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use crate::format::SampleFormat;

/// Plays packed mixer output on a CPAL device.
///
/// The CPAL stream runs on its own thread; [`write`](Self::write) decodes a
/// packed buffer back to floats and feeds them into a ring buffer the
/// stream consumes. The mono mix is copied to every device channel.
pub struct CpalSink {
    buffer: Producer<f32>,
    channels: usize,
    sample_rate: u32,
    /// Tracks how many samples CPAL has consumed
    samples_consumed: Arc<AtomicUsize>,
    /// Tracks underrun state for diagnostics
    had_underrun: Arc<AtomicBool>,
}

impl CpalSink {
    /// Opens the system's default output device.
    ///
    /// Returns `None` if no audio device is available.
    pub fn default_output() -> Option<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device()?;
        let config = device.default_output_config().ok()?;
        tracing::debug!(device = ?device.name().ok(), ?config, "opening output device");
        Some(Self::new(&device, &config))
    }

    /// Create a new sink for the given device and config
    pub fn new(device: &cpal::Device, config: &SupportedStreamConfig) -> Self {
        let channels = config.channels() as usize;
        let sample_format = config.sample_format();
        let stream_config = config.config();
        let sample_rate = stream_config.sample_rate.0;

        // Ring buffer sized for ~100ms of audio to handle scheduling jitter
        let buffer_samples = ((sample_rate as f32 * 0.1) as usize) * channels;
        let buffer_size = buffer_samples.next_power_of_two().max(8192);
        let (producer, consumer) = RingBuffer::<f32>::new(buffer_size);

        let samples_consumed = Arc::new(AtomicUsize::new(0));
        let had_underrun = Arc::new(AtomicBool::new(false));
        let playback = Playback {
            consumer,
            samples_consumed: samples_consumed.clone(),
            had_underrun: had_underrun.clone(),
        };

        // Spawn stream on dedicated thread
        let device = device.clone();
        std::thread::spawn(move || {
            let stream = match build_stream(&device, sample_format, &stream_config, playback) {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::error!(?err, "failed to build output stream");
                    return;
                }
            };

            if let Err(err) = stream.play() {
                tracing::error!(?err, "failed to start output stream");
                return;
            }

            // Keep thread alive - stream lives as long as this thread
            loop {
                std::thread::park();
            }
        });

        Self {
            buffer: producer,
            channels,
            sample_rate,
            samples_consumed,
            had_underrun,
        }
    }

    /// Device sample rate in Hz. Sources should generate at this rate.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Returns how many samples have been played
    #[inline]
    pub fn samples_consumed(&self) -> usize {
        self.samples_consumed.load(Ordering::Relaxed)
    }

    /// Returns available space in the buffer, in mixer samples
    #[inline]
    pub fn buffer_available(&self) -> usize {
        self.buffer.slots() / self.channels
    }

    /// Check and clear the underrun flag
    pub fn check_underrun(&self) -> bool {
        self.had_underrun.swap(false, Ordering::Relaxed)
    }

    /// Queues one packed buffer for playback.
    ///
    /// `format` and `range` must match the mixer that produced `packed`.
    /// Returns `false` and drops the buffer if it doesn't fit.
    pub fn write(&mut self, packed: &[u8], format: SampleFormat, range: u16) -> bool {
        let bytes_per_sample = format.bytes_per_sample();
        if bytes_per_sample == 0 {
            return false;
        }

        let samples = packed.len() / bytes_per_sample;
        if self.buffer.slots() < samples * self.channels {
            tracing::trace!(samples, "output ring full, dropping buffer");
            return false;
        }

        let range = f32::from(range);
        let mut reader = packed;
        for _ in 0..samples {
            let raw = format.read_sample(&mut reader);
            let sample = format.decode_normalized(raw, range);
            for _ in 0..self.channels {
                // Safety: we verified slots above
                let _ = self.buffer.push(sample);
            }
        }
        true
    }
}

fn build_stream(
    device: &cpal::Device,
    sample_format: DeviceFormat,
    stream_config: &cpal::StreamConfig,
    playback: Playback,
) -> Result<cpal::Stream, cpal::BuildStreamError> {
    match sample_format {
        DeviceFormat::F32 => playback.build::<f32>(device, stream_config, |s| s),
        DeviceFormat::I16 => playback.build::<i16>(device, stream_config, |s| (s * i16::MAX as f32) as i16),
        DeviceFormat::U16 => {
            playback.build::<u16>(device, stream_config, |s| ((s + 1.0) * 0.5 * u16::MAX as f32) as u16)
        }
        other => {
            tracing::error!(format = ?other, "unsupported device sample format");
            Err(cpal::BuildStreamError::StreamConfigNotSupported)
        }
    }
}

/// State moved into the CPAL callback.
struct Playback {
    consumer: Consumer<f32>,
    samples_consumed: Arc<AtomicUsize>,
    had_underrun: Arc<AtomicBool>,
}

impl Playback {
    fn build<T>(
        mut self,
        device: &cpal::Device,
        stream_config: &cpal::StreamConfig,
        convert: fn(f32) -> T,
    ) -> Result<cpal::Stream, cpal::BuildStreamError>
    where
        T: cpal::SizedSample + Send + 'static,
    {
        device.build_output_stream(
            stream_config,
            move |data: &mut [T], _| {
                let mut underrun = false;
                for sample in data.iter_mut() {
                    let s = self.consumer.pop().unwrap_or_else(|_| {
                        underrun = true;
                        0.0
                    });
                    *sample = convert(s.clamp(-1.0, 1.0));
                }
                if underrun {
                    self.had_underrun.store(true, Ordering::Relaxed);
                }
                self.samples_consumed.fetch_add(data.len(), Ordering::Relaxed);
            },
            |err| tracing::error!(?err, "CPAL stream error"),
            None,
        )
    }
}
