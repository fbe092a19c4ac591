//! Spectrum probe: a non-mutating tap on the signal chain
//!
//! The render path copies frames into a small ring buffer as they pass the
//! tap point; the analysis and visualization domains read an instantaneous
//! magnitude spectrum from it. The tap never alters the signal and the
//! write never blocks: under contention the copy for that buffer is simply
//! dropped, which the soft-real-time consumers tolerate.

use std::sync::{Arc, Mutex};

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

/// Analysis window length. A fixed power of two balancing temporal
/// resolution (voice/beat detection) against frequency resolution.
pub const FFT_SIZE: usize = 256;

/// Number of magnitude bins returned per sample: `FFT_SIZE / 2`.
pub const BIN_COUNT: usize = FFT_SIZE / 2;

/// Mono ring buffer at the tap point
struct TapBuffer {
    samples: [f32; FFT_SIZE],
    write_pos: usize,
    /// Saturating fill counter; the reader yields nothing until a full
    /// window has been observed
    filled: usize,
}

impl TapBuffer {
    fn new() -> Self {
        Self {
            samples: [0.0; FFT_SIZE],
            write_pos: 0,
            filled: 0,
        }
    }

    #[inline]
    fn push(&mut self, sample: f32) {
        self.samples[self.write_pos] = sample;
        self.write_pos = (self.write_pos + 1) % FFT_SIZE;
        if self.filled < FFT_SIZE {
            self.filled += 1;
        }
    }

    /// Copy the window in time order, oldest first
    fn snapshot(&self) -> Option<[f32; FFT_SIZE]> {
        if self.filled < FFT_SIZE {
            return None;
        }
        let mut out = [0.0; FFT_SIZE];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = self.samples[(self.write_pos + i) % FFT_SIZE];
        }
        Some(out)
    }

    fn clear(&mut self) {
        self.samples = [0.0; FFT_SIZE];
        self.write_pos = 0;
        self.filled = 0;
    }
}

struct TapShared {
    buffer: Mutex<TapBuffer>,
    sample_rate: u32,
}

/// The tap node owned by the signal graph
pub struct SpectrumProbe {
    shared: Arc<TapShared>,
}

impl SpectrumProbe {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            shared: Arc::new(TapShared {
                buffer: Mutex::new(TapBuffer::new()),
                sample_rate,
            }),
        }
    }

    /// Mirror an interleaved stereo buffer into the tap (mono mix)
    ///
    /// Render-path safe: no allocation, and a contended lock drops the
    /// write instead of waiting.
    pub fn push(&self, buffer: &[f32]) {
        if let Ok(mut tap) = self.shared.buffer.try_lock() {
            for frame in buffer.chunks_exact(2) {
                tap.push(0.5 * (frame[0] + frame[1]));
            }
        }
    }

    /// Create a reader for the analysis or visualization domain
    pub fn reader(&self) -> SpectrumReader {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        let scratch_len = fft.get_inplace_scratch_len();

        SpectrumReader {
            shared: Arc::clone(&self.shared),
            fft,
            input: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
        }
    }

    /// Width of one frequency bin in Hz: `sample_rate / FFT_SIZE`
    pub fn bin_hz(&self) -> f32 {
        self.shared.sample_rate as f32 / FFT_SIZE as f32
    }

    /// Forget the current window. Used when the chain stops, so a restart
    /// cannot analyze stale audio.
    pub fn clear(&self) {
        if let Ok(mut tap) = self.shared.buffer.lock() {
            tap.clear();
        }
    }
}

/// Cloneable spectrum sampler
///
/// One clone per consumer (ducking controller, visualizer); clones share
/// the tap but own their FFT scratch space, so both can sample within the
/// same scheduling tick.
pub struct SpectrumReader {
    shared: Arc<TapShared>,
    fft: Arc<dyn Fft<f32>>,
    input: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl Clone for SpectrumReader {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            fft: Arc::clone(&self.fft),
            input: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            scratch: vec![Complex::new(0.0, 0.0); self.scratch.len()],
        }
    }
}

impl SpectrumReader {
    /// Sample the current per-bin magnitudes at the tap point
    ///
    /// Returns [`BIN_COUNT`] non-negative magnitudes, bin `i` centered at
    /// `i * sample_rate / FFT_SIZE` Hz, or an empty vector while the tap
    /// has not yet observed a full window (treated as silence downstream).
    /// Never blocks the render path and never mutates the signal.
    pub fn magnitudes(&mut self) -> Vec<f32> {
        let window = {
            let Ok(tap) = self.shared.buffer.lock() else {
                return Vec::new();
            };
            tap.snapshot()
        };
        let Some(window) = window else {
            return Vec::new();
        };

        for (slot, &sample) in self.input.iter_mut().zip(window.iter()) {
            *slot = Complex::new(sample, 0.0);
        }
        self.fft.process_with_scratch(&mut self.input, &mut self.scratch);

        self.input[..BIN_COUNT]
            .iter()
            .map(|c| c.norm() / FFT_SIZE as f32)
            .collect()
    }

    /// Width of one frequency bin in Hz
    pub fn bin_hz(&self) -> f32 {
        self.shared.sample_rate as f32 / FFT_SIZE as f32
    }

    /// Number of bins returned by [`magnitudes`](Self::magnitudes)
    pub fn bin_count(&self) -> usize {
        BIN_COUNT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn push_sine(probe: &SpectrumProbe, frequency: f32, sample_rate: u32, frames: usize) {
        let mut buffer = Vec::with_capacity(frames * 2);
        for i in 0..frames {
            let t = i as f32 / sample_rate as f32;
            let sample = (2.0 * PI * frequency * t).sin();
            buffer.push(sample);
            buffer.push(sample);
        }
        probe.push(&buffer);
    }

    #[test]
    fn unprimed_probe_yields_nothing() {
        let probe = SpectrumProbe::new(48000);
        let mut reader = probe.reader();
        assert!(reader.magnitudes().is_empty());

        // Half a window is still not enough
        push_sine(&probe, 1000.0, 48000, FFT_SIZE / 2);
        assert!(reader.magnitudes().is_empty());
    }

    #[test]
    fn full_window_yields_fixed_length_spectrum() {
        let probe = SpectrumProbe::new(48000);
        let mut reader = probe.reader();

        push_sine(&probe, 1000.0, 48000, FFT_SIZE);
        let magnitudes = reader.magnitudes();

        assert_eq!(magnitudes.len(), BIN_COUNT);
        assert!(magnitudes.iter().all(|&m| m >= 0.0));
    }

    #[test]
    fn dominant_bin_matches_tone() {
        let sample_rate = 48000;
        let probe = SpectrumProbe::new(sample_rate);
        let mut reader = probe.reader();

        // 3000 Hz sits near bin 16 (3000 / 187.5)
        push_sine(&probe, 3000.0, sample_rate, FFT_SIZE);
        let magnitudes = reader.magnitudes();

        let (peak_bin, _) = magnitudes
            .iter()
            .enumerate()
            .skip(1) // ignore DC
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap())
            .unwrap();

        let peak_freq = peak_bin as f32 * reader.bin_hz();
        assert!(
            (peak_freq - 3000.0).abs() <= reader.bin_hz(),
            "peak at {peak_freq} Hz"
        );
    }

    #[test]
    fn silence_has_no_energy() {
        let probe = SpectrumProbe::new(48000);
        let mut reader = probe.reader();

        probe.push(&[0.0; FFT_SIZE * 2]);
        let magnitudes = reader.magnitudes();

        assert_eq!(magnitudes.len(), BIN_COUNT);
        assert!(magnitudes.iter().all(|&m| m < 1.0e-6));
    }

    #[test]
    fn clear_forgets_the_window() {
        let probe = SpectrumProbe::new(48000);
        let mut reader = probe.reader();

        push_sine(&probe, 1000.0, 48000, FFT_SIZE);
        assert!(!reader.magnitudes().is_empty());

        probe.clear();
        assert!(reader.magnitudes().is_empty());
    }

    #[test]
    fn readers_are_independent() {
        let probe = SpectrumProbe::new(48000);
        let mut a = probe.reader();
        let mut b = a.clone();

        push_sine(&probe, 1000.0, 48000, FFT_SIZE);

        let ma = a.magnitudes();
        let mb = b.magnitudes();
        assert_eq!(ma.len(), mb.len());
        for (x, y) in ma.iter().zip(mb.iter()) {
            assert!((x - y).abs() < 1.0e-6);
        }
    }

    #[test]
    fn push_does_not_alter_signal() {
        let probe = SpectrumProbe::new(48000);
        let buffer: Vec<f32> = (0..512).map(|i| (i as f32 * 0.01).sin()).collect();
        let copy = buffer.clone();

        probe.push(&buffer);
        assert_eq!(buffer, copy);
    }
}
