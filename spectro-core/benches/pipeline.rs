use criterion::{Criterion, black_box, criterion_group, criterion_main};
use rand::prelude::*;
use rustfft::num_complex::Complex;
use spectro_core::acquisition::SampleFormat;
use spectro_core::{Config, Pipeline, Radix2Fft, SpectrumReducer, WindowKind, WindowTable};

const N: usize = 2048;

fn benchmark(c: &mut Criterion) {
    let mut rng = rand::thread_rng();

    let frame: Vec<f32> = (0..N).map(|_| rng.gen_range(0.0..4096.0)).collect();
    let mut words = vec![0u8; N * SampleFormat::Type2.width()];
    rng.fill(&mut words[..]);

    // Containers
    let window = WindowTable::generate(WindowKind::Hann, N);
    let fft = Radix2Fft::init(N).unwrap();
    let reducer = SpectrumReducer::new(N, 10);
    let mut complex = vec![Complex::new(0.0f32, 0.0); N];
    let mut spectrum = vec![0.0f32; N / 2];
    let mut pipeline = Pipeline::new(&Config::default()).unwrap();

    c.bench_function("decode type2 words", |b| {
        b.iter(|| {
            for word in black_box(&words).chunks_exact(4) {
                black_box(SampleFormat::Type2.decode(word));
            }
        })
    });

    c.bench_function("apply window", |b| {
        b.iter(|| {
            spectro_core::windowing::apply_window(
                black_box(&frame),
                black_box(&window),
                black_box(&mut complex),
            )
        })
    });

    c.bench_function("radix2 real transform", |b| {
        b.iter(|| fft.process(black_box(&mut complex)))
    });

    c.bench_function("reduce spectrum", |b| {
        b.iter(|| reducer.reduce(black_box(&complex), black_box(&mut spectrum)))
    });

    c.bench_function("process frame", |b| {
        b.iter(|| {
            pipeline
                .process_frame(black_box(&frame))
                .map(|s| s[0])
        })
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
