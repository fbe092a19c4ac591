//! Fixed five-band equalizer
//!
//! One second-order peaking (bell) filter per configured center frequency.
//! Center frequency and Q are fixed at construction; per-band gain is the
//! only mutable parameter. Coefficients are exponentially smoothed so
//! runtime gain changes cannot click, and filter state is never reset on a
//! parameter change.

use crate::config::{BAND_COUNT, BAND_FREQUENCIES, BAND_GAIN_RANGE_DB, BAND_Q};
use crate::error::{DspError, Result};

/// Smoothing coefficient for exponential coefficient interpolation,
/// applied once per frame. ~3 ms time constant at 44.1 kHz.
const SMOOTH_COEFF: f32 = 0.002;

/// Second-order peaking filter (RBJ cookbook form), stereo
#[derive(Debug, Clone)]
struct PeakingFilter {
    // Target coefficients (set on gain change)
    target_b0: f32,
    target_b1: f32,
    target_b2: f32,
    target_a1: f32,
    target_a2: f32,

    // Active coefficients, smoothed toward target each frame
    b0: f32,
    b1: f32,
    b2: f32,
    a1: f32,
    a2: f32,

    // State variables, per channel
    x1_l: f32,
    x2_l: f32,
    y1_l: f32,
    y2_l: f32,
    x1_r: f32,
    x2_r: f32,
    y1_r: f32,
    y2_r: f32,
}

impl PeakingFilter {
    /// Neutral (pass-through) filter
    fn new() -> Self {
        Self {
            target_b0: 1.0,
            target_b1: 0.0,
            target_b2: 0.0,
            target_a1: 0.0,
            target_a2: 0.0,
            b0: 1.0,
            b1: 0.0,
            b2: 0.0,
            a1: 0.0,
            a2: 0.0,
            x1_l: 0.0,
            x2_l: 0.0,
            y1_l: 0.0,
            y2_l: 0.0,
            x1_r: 0.0,
            x2_r: 0.0,
            y1_r: 0.0,
            y2_r: 0.0,
        }
    }

    /// Retarget as a peaking EQ at the given gain. Active coefficients are
    /// left alone; smoothing carries them over.
    fn set_peaking(&mut self, sample_rate: f32, frequency: f32, q: f32, gain_db: f32) {
        if sample_rate < 1.0 {
            return;
        }

        let a = 10.0_f32.powf(gain_db / 40.0);
        // Clamp toward Nyquist to keep the filter stable at low rates
        let clamped_freq = frequency.min(sample_rate * 0.45);
        let omega = 2.0 * std::f32::consts::PI * clamped_freq / sample_rate;
        let sin_omega = omega.sin();
        let cos_omega = omega.cos();
        let alpha = sin_omega / (2.0 * q);

        let b0 = 1.0 + alpha * a;
        let b1 = -2.0 * cos_omega;
        let b2 = 1.0 - alpha * a;
        let a0 = 1.0 + alpha / a;
        let a1 = -2.0 * cos_omega;
        let a2 = 1.0 - alpha / a;

        self.target_b0 = b0 / a0;
        self.target_b1 = b1 / a0;
        self.target_b2 = b2 / a0;
        self.target_a1 = a1 / a0;
        self.target_a2 = a2 / a0;
    }

    /// One smoothing step toward the target coefficients
    #[inline]
    fn smooth_coefficients(&mut self) {
        self.b0 += SMOOTH_COEFF * (self.target_b0 - self.b0);
        self.b1 += SMOOTH_COEFF * (self.target_b1 - self.b1);
        self.b2 += SMOOTH_COEFF * (self.target_b2 - self.b2);
        self.a1 += SMOOTH_COEFF * (self.target_a1 - self.a1);
        self.a2 += SMOOTH_COEFF * (self.target_a2 - self.a2);
    }

    /// Process one stereo frame
    #[inline]
    fn process_frame(&mut self, left: f32, right: f32) -> (f32, f32) {
        self.smooth_coefficients();

        let mut out_l = self.b0 * left + self.b1 * self.x1_l + self.b2 * self.x2_l
            - self.a1 * self.y1_l
            - self.a2 * self.y2_l;

        // Flush denormals; they stall the FPU on long silences
        if out_l.abs() < 1.0e-15 {
            out_l = 0.0;
        }

        self.x2_l = self.x1_l;
        self.x1_l = left;
        self.y2_l = self.y1_l;
        self.y1_l = out_l;

        let mut out_r = self.b0 * right + self.b1 * self.x1_r + self.b2 * self.x2_r
            - self.a1 * self.y1_r
            - self.a2 * self.y2_r;

        if out_r.abs() < 1.0e-15 {
            out_r = 0.0;
        }

        self.x2_r = self.x1_r;
        self.x1_r = right;
        self.y2_r = self.y1_r;
        self.y1_r = out_r;

        (out_l, out_r)
    }

    /// Clear state and snap to target coefficients. Only used when the
    /// whole chain (re)starts, never on a parameter change.
    fn reset(&mut self) {
        self.x1_l = 0.0;
        self.x2_l = 0.0;
        self.y1_l = 0.0;
        self.y2_l = 0.0;
        self.x1_r = 0.0;
        self.x2_r = 0.0;
        self.y1_r = 0.0;
        self.y2_r = 0.0;
        self.b0 = self.target_b0;
        self.b1 = self.target_b1;
        self.b2 = self.target_b2;
        self.a1 = self.target_a1;
        self.a2 = self.target_a2;
    }
}

/// The five-band equalizer section of the chain
///
/// Bands are created once at graph construction, in ascending
/// center-frequency order, and destroyed with the graph. Processing runs
/// them in series.
pub struct FilterBank {
    filters: [PeakingFilter; BAND_COUNT],
    gains_db: [f32; BAND_COUNT],
    sample_rate: f32,
    needs_update: bool,
}

impl FilterBank {
    /// Create the bank with all bands flat
    pub fn new(sample_rate: u32) -> Self {
        let mut bank = Self {
            filters: [
                PeakingFilter::new(),
                PeakingFilter::new(),
                PeakingFilter::new(),
                PeakingFilter::new(),
                PeakingFilter::new(),
            ],
            gains_db: [0.0; BAND_COUNT],
            sample_rate: sample_rate as f32,
            needs_update: true,
        };
        bank.update_filters();
        for filter in &mut bank.filters {
            filter.reset();
        }
        bank
    }

    /// Number of bands (fixed)
    pub fn band_count(&self) -> usize {
        BAND_COUNT
    }

    /// Center frequency of a band in Hz
    pub fn band_frequency(&self, index: usize) -> Result<f32> {
        Self::check_index(index)?;
        Ok(BAND_FREQUENCIES[index])
    }

    /// Set one band's gain in dB
    ///
    /// Gain is clamped into [-20, +20] at this boundary; callers are
    /// expected to supply pre-clamped values.
    pub fn set_band_gain(&mut self, index: usize, gain_db: f32) -> Result<()> {
        Self::check_index(index)?;
        let (lo, hi) = BAND_GAIN_RANGE_DB;
        self.gains_db[index] = gain_db.clamp(lo, hi);
        self.needs_update = true;
        Ok(())
    }

    /// Get one band's gain in dB (as clamped)
    pub fn band_gain(&self, index: usize) -> Result<f32> {
        Self::check_index(index)?;
        Ok(self.gains_db[index])
    }

    /// Set all band gains at once, ascending center-frequency order
    pub fn set_band_gains(&mut self, gains_db: &[f32; BAND_COUNT]) {
        for (index, &gain) in gains_db.iter().enumerate() {
            // Index is in range by construction
            let _ = self.set_band_gain(index, gain);
        }
    }

    fn check_index(index: usize) -> Result<()> {
        if index >= BAND_COUNT {
            return Err(DspError::IndexOutOfRange {
                index,
                count: BAND_COUNT,
            });
        }
        Ok(())
    }

    /// Recompute target coefficients for any band whose gain changed
    fn update_filters(&mut self) {
        if !self.needs_update {
            return;
        }

        for i in 0..BAND_COUNT {
            self.filters[i].set_peaking(
                self.sample_rate,
                BAND_FREQUENCIES[i],
                BAND_Q,
                self.gains_db[i],
            );
        }

        self.needs_update = false;
    }

    /// Process an interleaved stereo buffer through all bands in series
    pub fn process(&mut self, buffer: &mut [f32]) {
        self.update_filters();

        for frame in buffer.chunks_exact_mut(2) {
            let mut left = frame[0];
            let mut right = frame[1];

            for filter in &mut self.filters {
                let (l, r) = filter.process_frame(left, right);
                left = l;
                right = r;
            }

            frame[0] = left;
            frame[1] = right;
        }
    }

    /// Clear filter state (keeps gains). Used on chain (re)start.
    pub fn reset(&mut self) {
        self.needs_update = true;
        self.update_filters();
        for filter in &mut self.filters {
            filter.reset();
        }
    }
}
