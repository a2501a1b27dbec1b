use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use spectro_core::acquisition::{
    AcquisitionChannel, ChannelConfig, Pacing, SampleFormat, SignalSpec, SyntheticAdc, Tone,
};
use spectro_core::reducer::{bin_frequency, peak_bin};
use spectro_core::{Config, Cooperate, DisplayConfig, Pipeline, PipelineError, notify};

fn single_tone(frequency_hz: f32, stray_every: Option<usize>) -> SignalSpec {
    SignalSpec {
        tones: vec![Tone {
            frequency_hz,
            amplitude: 800.0,
        }],
        dc_offset: 2048.0,
        noise: 4.0,
        stray_every,
        seed: 7,
    }
}

fn start(config: &Config, signal: SignalSpec) -> (SyntheticAdc, notify::Notification) {
    let mut adc =
        SyntheticAdc::configure(config.acquisition.clone(), signal, Pacing::Backpressure).unwrap();
    let (notifier, notification) = notify::pair();
    adc.register_callback(Arc::new(move |_| {
        notifier.signal();
    }))
    .unwrap();
    adc.start().unwrap();
    (adc, notification)
}

#[test]
fn synthetic_tone_lands_on_its_bin() {
    let config = Config::default();
    let mut pipeline = Pipeline::new(&config).unwrap();
    let (mut adc, notification) = start(&config, single_tone(1000.0, None));

    let mut renders = 0;
    let mut sink = |spectrum: &[f32], view: &DisplayConfig| {
        assert_eq!(spectrum.len(), 1024);
        assert_eq!(view.width, 128);
        renders += 1;
    };

    for _ in 0..3 {
        let report = pipeline.run_once(&mut adc, &notification, &mut sink).unwrap();
        let peak = report.peak_bin.unwrap();
        assert!(peak.abs_diff(102) <= 1, "peak at bin {peak}");
        let freq = bin_frequency(peak, config.acquisition.sample_rate_hz, 2048);
        assert!((freq - 1000.0).abs() < 10.0);
    }
    assert_eq!(renders, 3);
    assert!(pipeline.spectrum()[..10].iter().all(|&m| m == 0.0));
    adc.stop().unwrap();
}

/// Bin a tone lands on when `dropped` of every `kept + dropped` samples were
/// discarded: the frame then spans proportionally more time.
fn compressed_bin(frequency_hz: f32, kept: u64, dropped: u64) -> usize {
    let nominal = frequency_hz * 2048.0 / 20_000.0;
    (nominal * (kept + dropped) as f32 / kept as f32).round() as usize
}

#[test]
fn foreign_samples_compress_the_time_base() {
    let mut config = Config::default();
    config.acquisition.sample_format = SampleFormat::Type1;
    let mut pipeline = Pipeline::new(&config).unwrap();
    let (mut adc, notification) = start(&config, single_tone(2500.0, Some(16)));

    let mut sink = |_: &[f32], _: &DisplayConfig| {};
    let report = pipeline.run_once(&mut adc, &notification, &mut sink).unwrap();
    adc.stop().unwrap();

    let dropped = report.assembler.dropped_samples;
    assert!(dropped > 0);
    assert_eq!(report.assembler.frames, 1);
    // Every 16th sample is discarded, so 2500 Hz reads as 2500 * 16/15.
    let expected = compressed_bin(2500.0, 2048, dropped);
    assert_eq!(expected, 273);
    assert!(report.peak_bin.unwrap().abs_diff(expected) <= 1);
}

#[test]
fn strays_never_stall_a_multi_frame_run() {
    let (done_tx, done_rx) = crossbeam_channel::unbounded();
    thread::spawn(move || {
        let mut config = Config::default();
        config.acquisition.sample_format = SampleFormat::Type1;
        let mut pipeline = Pipeline::new(&config).unwrap();
        let (mut adc, notification) = start(&config, single_tone(2500.0, Some(16)));
        let mut sink = |_: &[f32], _: &DisplayConfig| {};
        for _ in 0..5 {
            let report = pipeline.run_once(&mut adc, &notification, &mut sink).unwrap();
            if done_tx.send(report).is_err() {
                return;
            }
        }
        adc.stop().unwrap();
    });

    let mut previous_dropped = 0u64;
    for iteration in 1..=5u64 {
        let report = done_rx
            .recv_timeout(Duration::from_secs(10))
            .unwrap_or_else(|_| panic!("iteration {iteration} never completed"));
        assert_eq!(report.iteration, iteration);
        assert_eq!(report.assembler.frames, iteration);

        let dropped = report.assembler.dropped_samples - previous_dropped;
        previous_dropped = report.assembler.dropped_samples;
        let expected = compressed_bin(2500.0, 2048, dropped);
        assert!(report.peak_bin.unwrap().abs_diff(expected) <= 1);
    }
}

#[test]
fn seeded_input_gives_identical_spectra_across_runs() {
    fn capture(config: &Config) -> Vec<Vec<f32>> {
        let mut pipeline = Pipeline::new(config).unwrap();
        let (mut adc, notification) = start(config, single_tone(1000.0, None));
        let mut spectra = Vec::new();
        let mut sink = |m: &[f32], _: &DisplayConfig| spectra.push(m.to_vec());
        for _ in 0..3 {
            pipeline.run_once(&mut adc, &notification, &mut sink).unwrap();
        }
        adc.stop().unwrap();
        spectra
    }

    let config = Config::default();
    let first = capture(&config);
    let second = capture(&config);
    assert_eq!(first.len(), 3);
    assert_eq!(first, second);

    // Frames differ (the tone phase advances) but the peak stays put.
    for spectrum in &first {
        assert!(peak_bin(spectrum).unwrap().abs_diff(102) <= 1);
    }
}

#[test]
fn stopped_channel_ends_the_run_loop() {
    struct Counting(Arc<AtomicUsize>);
    impl Cooperate for Counting {
        fn hand_off(&mut self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    let config = Config {
        acquisition: ChannelConfig {
            conv_frame_size: 256,
            max_store_buf_size: 1024,
            ..Default::default()
        },
        ..Default::default()
    };
    let mut pipeline = Pipeline::new(&config).unwrap();
    let (mut adc, notification) = start(&config, single_tone(1000.0, None));

    let hand_offs = Arc::new(AtomicUsize::new(0));
    let mut cooperate = Counting(hand_offs.clone());
    let mut rendered = 0;
    let mut sink = |_: &[f32], _: &DisplayConfig| rendered += 1;

    // Two full iterations, then pull the converter out from under the loop.
    pipeline.run_once(&mut adc, &notification, &mut sink).unwrap();
    cooperate.hand_off();
    pipeline.run_once(&mut adc, &notification, &mut sink).unwrap();
    adc.stop().unwrap();
    // The store is gone; keep the wake pending so the loop reaches read().
    let (notifier, notification) = notify::pair();
    notifier.signal();

    let err = pipeline
        .run(&mut adc, &notification, &mut sink, &mut cooperate)
        .unwrap_err();
    assert!(matches!(err, PipelineError::Assemble(_)));
    assert_eq!(rendered, 2);
    assert_eq!(hand_offs.load(Ordering::Relaxed), 1);
}
