use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use dasp_signal::Signal;
use mixdown::nodes::{MemorySource, Tone};
use mixdown::{DataSource, Mixer, SampleFormat, ACCUMULATOR_LEN};

/// One accumulator's worth of a 440Hz sine as unsigned 16-bit samples.
fn sine_u16() -> Bytes {
    let mut signal = dasp_signal::rate(8000.0).const_hz(440.0).sine();
    (0..ACCUMULATOR_LEN)
        .flat_map(|_| {
            let s = signal.next();
            (((s + 1.0) * 0.5 * u16::MAX as f64) as u16).to_le_bytes()
        })
        .collect::<Vec<u8>>()
        .into()
}

pub fn criterion_benchmark(c: &mut Criterion) {
    c.bench_function("Mixer.pull() 4 tones", |b| {
        let mut mixer = Mixer::new(SampleFormat::I16);
        for i in 0..4 {
            mixer.add_channel(Tone::new(220.0 * (i + 1) as f32, 8000), Tone::RANGE);
        }

        b.iter(|| black_box(mixer.pull()))
    });

    c.bench_function("Mixer.pull() 8 buffered U16 channels", |b| {
        let chunk = sine_u16();

        b.iter_batched(
            || {
                let mut mixer = Mixer::new(SampleFormat::U16);
                for _ in 0..8 {
                    let src = MemorySource::new(SampleFormat::U16, vec![chunk.clone()]);
                    mixer.add_channel(src, u16::MAX);
                }
                mixer
            },
            |mut mixer| black_box(mixer.pull()),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("Mixer.pull() empty", |b| {
        let mut mixer = Mixer::new(SampleFormat::U16);
        b.iter(|| black_box(mixer.pull()))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
