//! Example: mix a chord of tones and play it on the default output device
//!
//! Run with: cargo run --example mix_tones --features cpal_sink
//!
//! Set `RUST_LOG=mixdown=debug` to watch channels attach and detach.

use std::thread::sleep;
use std::time::{Duration, Instant};

use mixdown::nodes::{CpalSink, Demand, Tone};
use mixdown::{DataSource, Mixer, MixerConfig, SampleFormat, ACCUMULATOR_LEN};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let Some(mut sink) = CpalSink::default_output() else {
        eprintln!("No audio output devices found!");
        return;
    };
    let rate = sink.sample_rate();
    println!("Playing a C major chord at {}Hz", rate);
    println!("Press Ctrl+C to stop\n");

    let config = MixerConfig::default()
        .with_format(SampleFormat::I16)
        .with_sample_range(4095)
        .with_volume(700);
    let mut mixer = Mixer::with_config(config).expect("valid mixer config");

    let demand = Demand::new();
    mixer.connect(Box::new(demand.clone()));

    mixer.add_channel(Tone::new(261.63, rate), Tone::RANGE); // C4
    mixer.add_channel(Tone::new(329.63, rate), Tone::RANGE); // E4
    let fifth = mixer.add_channel(Tone::new(392.00, rate), Tone::RANGE); // G4

    let start = Instant::now();
    let mut dropped_fifth = false;

    loop {
        // Pull only when the mixer has announced a buffer and the device has room.
        while sink.buffer_available() >= ACCUMULATOR_LEN && demand.take() {
            let buffer = mixer.pull();
            sink.write(&buffer, mixer.format(), mixer.sample_range());
        }

        if sink.check_underrun() {
            tracing::warn!("output underrun");
        }

        if !dropped_fifth && start.elapsed() > Duration::from_secs(3) {
            mixer.remove_channel(fifth).expect("channel is attached");
            dropped_fifth = true;
            println!("Dropped the fifth");
        }

        sleep(Duration::from_micros(500));
    }
}
