//! Gain stages with click-free ramping
//!
//! A [`GainStage`] wraps one scalar gain/mute control (preamp, ducking,
//! master). Writers on other scheduling domains set targets through a
//! cloneable [`GainHandle`]; the render path ramps the applied gain toward
//! the target with a one-pole smoother so updates never click.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// Slider floor: -60 dB maps to linear 0 to represent "silent" without a
/// -inf value.
pub const GAIN_FLOOR_DB: f32 = -60.0;

/// Ramp time constant for gain changes (ms). Long enough to be click-free,
/// short enough to feel immediate.
const RAMP_TIME_MS: f32 = 15.0;

/// Convert a slider dB position to a linear multiplier.
///
/// Anything at or below the -60 dB floor is silence (linear 0).
pub fn db_to_linear(db: f32) -> f32 {
    if db <= GAIN_FLOOR_DB {
        0.0
    } else {
        10.0_f32.powf(db / 20.0)
    }
}

/// Convert a linear multiplier back to a slider dB position.
///
/// Linear 0 (or anything non-positive) maps to the -60 dB floor rather
/// than failing; it is not reconstructible to a nonzero gain.
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        GAIN_FLOOR_DB
    } else {
        (20.0 * linear.log10()).max(GAIN_FLOOR_DB)
    }
}

/// Shared scalar state between the render path and other domains
///
/// Last-write-wins: both the UI and the ducking controller address
/// logically distinct stages, so plain atomic stores suffice.
struct GainShared {
    /// Target linear gain, stored as f32 bits
    gain_bits: AtomicU32,
    /// Mute short-circuits the effective gain to 0, preserving the target
    muted: AtomicBool,
}

impl GainShared {
    fn new(gain: f32) -> Self {
        Self {
            gain_bits: AtomicU32::new(gain.to_bits()),
            muted: AtomicBool::new(false),
        }
    }

    fn gain(&self) -> f32 {
        f32::from_bits(self.gain_bits.load(Ordering::Relaxed))
    }

    fn set_gain(&self, gain: f32) {
        // Non-negative linear multiplier; negative input is a caller bug,
        // clamped defensively.
        self.gain_bits.store(gain.max(0.0).to_bits(), Ordering::Relaxed);
    }
}

/// Cloneable, thread-safe writer for a [`GainStage`] target
///
/// This is the only surface the ducking controller holds; it never owns the
/// stage itself.
#[derive(Clone)]
pub struct GainHandle {
    shared: Arc<GainShared>,
}

impl GainHandle {
    /// Set the target linear gain (non-negative)
    pub fn set_gain(&self, gain: f32) {
        self.shared.set_gain(gain);
    }

    /// Get the stored target linear gain (ignores mute)
    pub fn gain(&self) -> f32 {
        self.shared.gain()
    }

    /// Mute or unmute. Muting preserves the stored gain; unmuting restores
    /// it.
    pub fn set_muted(&self, muted: bool) {
        self.shared.muted.store(muted, Ordering::Relaxed);
    }

    /// Check if muted
    pub fn is_muted(&self) -> bool {
        self.shared.muted.load(Ordering::Relaxed)
    }
}

/// A single scalar gain/mute stage in the signal chain
pub struct GainStage {
    shared: Arc<GainShared>,
    /// Gain currently applied by the render path, ramping toward the target
    current: f32,
    /// Per-frame one-pole smoothing coefficient
    smooth_coeff: f32,
}

impl GainStage {
    /// Create a stage with the given initial gain, already settled (no ramp
    /// on the first buffer).
    pub fn new(sample_rate: u32, gain: f32) -> Self {
        let gain = gain.max(0.0);
        // One-pole coefficient for a ~15 ms time constant at this rate
        let frames_per_ms = sample_rate as f32 / 1000.0;
        let smooth_coeff = 1.0 - (-1.0 / (frames_per_ms * RAMP_TIME_MS)).exp();

        Self {
            shared: Arc::new(GainShared::new(gain)),
            current: gain,
            smooth_coeff,
        }
    }

    /// Get a cloneable writer for this stage's target
    pub fn handle(&self) -> GainHandle {
        GainHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Set the target linear gain (non-negative)
    pub fn set_gain(&self, gain: f32) {
        self.shared.set_gain(gain);
    }

    /// Get the stored target linear gain (ignores mute)
    pub fn gain(&self) -> f32 {
        self.shared.gain()
    }

    /// Mute or unmute, preserving the stored gain
    pub fn set_muted(&self, muted: bool) {
        self.shared.muted.store(muted, Ordering::Relaxed);
    }

    /// Check if muted
    pub fn is_muted(&self) -> bool {
        self.shared.muted.load(Ordering::Relaxed)
    }

    /// Effective target: 0 while muted, the stored gain otherwise
    fn effective_target(&self) -> f32 {
        if self.is_muted() {
            0.0
        } else {
            self.shared.gain()
        }
    }

    /// Apply the stage to an interleaved stereo buffer (in-place)
    ///
    /// Real-time safe: atomic loads and arithmetic only. The applied gain
    /// ramps toward the target per frame; both channels of a frame get the
    /// same gain so the stereo image cannot wobble during a ramp.
    pub fn apply(&mut self, buffer: &mut [f32]) {
        let target = self.effective_target();

        if self.current == target {
            // Settled: plain multiply (or nothing at unity)
            if target == 1.0 {
                return;
            }
            if target == 0.0 {
                buffer.fill(0.0);
                return;
            }
            for sample in buffer.iter_mut() {
                *sample *= target;
            }
            return;
        }

        for frame in buffer.chunks_exact_mut(2) {
            self.current += self.smooth_coeff * (target - self.current);
            frame[0] *= self.current;
            frame[1] *= self.current;
        }

        // Snap once the ramp is inaudibly close so the fast path re-engages
        if (self.current - target).abs() < 1.0e-4 {
            self.current = target;
        }
    }

    /// Snap the applied gain to the target, abandoning any ramp in flight.
    /// Used when (re)starting the chain, never mid-stream.
    pub fn reset(&mut self) {
        self.current = self.effective_target();
    }

    /// Gain currently being applied by the render path
    pub fn applied_gain(&self) -> f32 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn db_floor_round_trip() {
        // Linear 0 maps to the floor and back to 0, never -inf
        assert_eq!(linear_to_db(0.0), GAIN_FLOOR_DB);
        assert_eq!(db_to_linear(GAIN_FLOOR_DB), 0.0);
        assert_eq!(db_to_linear(linear_to_db(0.0)), 0.0);
    }

    #[test]
    fn db_round_trip_unity() {
        assert!((db_to_linear(0.0) - 1.0).abs() < 1.0e-6);
        assert!((linear_to_db(1.0) - 0.0).abs() < 1.0e-6);
        assert!((db_to_linear(-6.0) - 0.501).abs() < 0.001);
    }

    #[test]
    fn mute_preserves_gain() {
        let stage = GainStage::new(48000, 0.8);
        stage.set_muted(true);
        assert!(stage.is_muted());
        assert_eq!(stage.gain(), 0.8);

        stage.set_muted(false);
        assert_eq!(stage.gain(), 0.8);
    }

    #[test]
    fn handle_writes_are_visible() {
        let stage = GainStage::new(48000, 1.0);
        let handle = stage.handle();

        handle.set_gain(1.0 / 3.0);
        assert!((stage.gain() - 1.0 / 3.0).abs() < 1.0e-6);
    }

    #[test]
    fn negative_gain_clamped() {
        let stage = GainStage::new(48000, 1.0);
        stage.set_gain(-0.5);
        assert_eq!(stage.gain(), 0.0);
    }

    #[test]
    fn settled_unity_is_identity() {
        let mut stage = GainStage::new(48000, 1.0);
        let mut buffer = vec![0.5, -0.5, 0.25, -0.25];
        let original = buffer.clone();

        stage.apply(&mut buffer);
        assert_eq!(buffer, original);
    }

    #[test]
    fn ramp_converges_to_target() {
        let mut stage = GainStage::new(48000, 1.0);
        stage.set_gain(0.25);

        // ~200 ms of audio is far past the 15 ms time constant
        let mut buffer = vec![1.0; 19200];
        stage.apply(&mut buffer);

        assert!((stage.applied_gain() - 0.25).abs() < 1.0e-3);
        // Late samples sit at the target, early samples near the old gain
        assert!((buffer[19199] - 0.25).abs() < 1.0e-3);
        assert!(buffer[0] > 0.9);
    }

    #[test]
    fn ramp_has_no_discontinuity() {
        let mut stage = GainStage::new(48000, 1.0);
        stage.set_gain(0.0);

        let mut buffer = vec![1.0; 4800];
        stage.apply(&mut buffer);

        // On a DC input the gain trajectory is the output; it must descend
        // without a single sudden step.
        for pair in buffer.windows(2) {
            assert!((pair[0] - pair[1]).abs() < 0.01);
        }
    }

    #[test]
    fn mute_short_circuits_applied_gain() {
        let mut stage = GainStage::new(48000, 0.8);
        stage.set_muted(true);

        let mut buffer = vec![1.0; 19200];
        stage.apply(&mut buffer);
        assert!(stage.applied_gain() < 1.0e-3);

        // Unmute restores the stored value
        stage.set_muted(false);
        let mut buffer = vec![1.0; 19200];
        stage.apply(&mut buffer);
        assert!((stage.applied_gain() - 0.8).abs() < 1.0e-3);
    }
}
