//! Artifact tests for runtime parameter changes
//!
//! Every parameter the chain exposes can change while audio is flowing:
//! gains ramp and filter coefficients smooth, so none of these changes may
//! produce a click (a sample-to-sample discontinuity the signal itself
//! could not have produced).

use hush_dsp::{AudioContext, ChainConfig, SignalGraph};
use std::f32::consts::PI;

const SAMPLE_RATE: u32 = 48000;

fn build_graph() -> SignalGraph {
    let context = AudioContext::offline(SAMPLE_RATE).unwrap();
    SignalGraph::build(&context).unwrap()
}

/// Generate a sine wave (stereo interleaved)
fn generate_sine(frequency: f32, duration_sec: f32, amplitude: f32) -> Vec<f32> {
    let num_samples = (SAMPLE_RATE as f32 * duration_sec) as usize;
    let mut buffer = Vec::with_capacity(num_samples * 2);
    for i in 0..num_samples {
        let t = i as f32 / SAMPLE_RATE as f32;
        let sample = (2.0 * PI * frequency * t).sin() * amplitude;
        buffer.push(sample);
        buffer.push(sample);
    }
    buffer
}

/// Largest left-channel sample-to-sample step across a buffer boundary pair
fn max_step(buffers: &[&[f32]]) -> f32 {
    let mut previous: Option<f32> = None;
    let mut max = 0.0f32;
    for buffer in buffers {
        for frame in buffer.chunks_exact(2) {
            if let Some(p) = previous {
                max = max.max((frame[0] - p).abs());
            }
            previous = Some(frame[0]);
        }
    }
    max
}

/// What a clean sine of this frequency/amplitude can step per sample,
/// with headroom
fn step_budget(frequency: f32, amplitude: f32) -> f32 {
    amplitude * 2.0 * PI * frequency / SAMPLE_RATE as f32 * 2.0
}

#[test]
fn master_gain_change_does_not_click() {
    let mut graph = build_graph();

    let mut first = generate_sine(440.0, 0.1, 0.5);
    graph.process(&mut first);

    graph.reconfigure(&ChainConfig {
        master_gain: 0.2,
        ..ChainConfig::default()
    });

    let mut second = generate_sine(440.0, 0.1, 0.5);
    graph.process(&mut second);

    let budget = step_budget(440.0, 0.5);
    let step = max_step(&[&first[..], &second[..]]);
    assert!(step < budget, "step {step} exceeds budget {budget}");
}

#[test]
fn mute_ramps_instead_of_cutting() {
    let mut graph = build_graph();

    let mut first = generate_sine(440.0, 0.1, 0.8);
    graph.process(&mut first);

    graph.reconfigure(&ChainConfig {
        muted: true,
        ..ChainConfig::default()
    });

    let mut second = generate_sine(440.0, 0.1, 0.8);
    graph.process(&mut second);

    let budget = step_budget(440.0, 0.8);
    let step = max_step(&[&first[..], &second[..]]);
    assert!(step < budget, "step {step} exceeds budget {budget}");

    // And it does reach silence
    let tail = &second[second.len() - 200..];
    assert!(tail.iter().all(|&s| s.abs() < 1.0e-3));
}

#[test]
fn band_gain_change_does_not_click() {
    let mut graph = build_graph();
    let mut config = ChainConfig {
        eq_enabled: true,
        ..ChainConfig::default()
    };
    graph.reconfigure(&config);

    let mut first = generate_sine(250.0, 0.1, 0.5);
    graph.process(&mut first);

    config.band_gains[1] = 12.0; // the 250 Hz band
    graph.reconfigure(&config);

    let mut second = generate_sine(250.0, 0.2, 0.5);
    graph.process(&mut second);

    // Budget allows for the fully boosted (~4x) tone
    let budget = step_budget(250.0, 0.5) * 4.0;
    let step = max_step(&[&first[..], &second[..]]);
    assert!(step < budget, "step {step} exceeds budget {budget}");
    assert!(second.iter().all(|s| s.is_finite()));
}

#[test]
fn ducking_transition_does_not_click() {
    let mut graph = build_graph();
    let handle = graph.ducking_handle();

    let mut first = generate_sine(440.0, 0.1, 0.5);
    graph.process(&mut first);

    handle.set_gain(1.0 / 3.0);
    let mut second = generate_sine(440.0, 0.1, 0.5);
    graph.process(&mut second);

    handle.set_gain(1.0);
    let mut third = generate_sine(440.0, 0.1, 0.5);
    graph.process(&mut third);

    let budget = step_budget(440.0, 0.5);
    let step = max_step(&[&first[..], &second[..], &third[..]]);
    assert!(step < budget, "step {step} exceeds budget {budget}");
}

#[test]
fn section_toggle_mid_stream_stays_finite() {
    let mut graph = build_graph();
    let mut config = ChainConfig {
        amp_enabled: true,
        amp_gain: 1.5,
        eq_enabled: false,
        band_gains: [6.0, -6.0, 6.0, -6.0, 6.0],
        ..ChainConfig::default()
    };
    graph.reconfigure(&config);

    let mut buffers = Vec::new();
    for toggle in 0..6 {
        config.eq_enabled = toggle % 2 == 0;
        graph.reconfigure(&config);
        let mut buffer = generate_sine(1000.0, 0.05, 0.4);
        graph.process(&mut buffer);
        buffers.push(buffer);
    }

    for buffer in &buffers {
        assert!(buffer.iter().all(|s| s.is_finite()));
        assert!(buffer.iter().all(|&s| s.abs() < 4.0));
    }
}
