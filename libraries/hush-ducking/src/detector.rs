//! Spectral voice-activity detection
//!
//! A cheap energy-ratio heuristic over the probe spectrum: when the share
//! of energy in the telephone voice band is high for long enough, voice is
//! considered present. A hysteretic counter keeps the flag from flapping on
//! borderline content.

/// Frequency band treated as voice (Hz). The classic telephone band.
pub const VOICE_BAND_HZ: (f32, f32) = (300.0, 3400.0);

/// Voice-band energy share above which a frame counts as voiced
pub const RATIO_THRESHOLD: f32 = 0.35;

/// The active flag rises when the counter exceeds this
pub const ACTIVATE_ABOVE: u32 = 10;

/// The active flag falls when the counter drops below this
pub const DEACTIVATE_BELOW: u32 = 5;

/// Counter saturation ceiling; bounds how long sustained voice can hold
/// the flag after the voice stops (2:1 against the activation threshold)
pub const FRAME_CEILING: u32 = 20;

/// Hysteretic voice-presence detector over spectrum frames
#[derive(Debug, Clone)]
pub struct VoiceActivityDetector {
    consecutive_voice_frames: u32,
    is_active: bool,
}

impl VoiceActivityDetector {
    pub fn new() -> Self {
        Self {
            consecutive_voice_frames: 0,
            is_active: false,
        }
    }

    /// Feed one spectrum frame; returns `true` when the active flag changed
    ///
    /// `magnitudes` are per-bin magnitudes with bin `i` centered at
    /// `i * bin_hz` Hz. An empty frame (probe not primed, analysis skipped)
    /// counts as silence; this method never fails.
    pub fn observe(&mut self, magnitudes: &[f32], bin_hz: f32) -> bool {
        let voiced = voice_ratio(magnitudes, bin_hz) > RATIO_THRESHOLD;

        if voiced {
            self.consecutive_voice_frames = (self.consecutive_voice_frames + 1).min(FRAME_CEILING);
        } else {
            self.consecutive_voice_frames = self.consecutive_voice_frames.saturating_sub(1);
        }

        let was_active = self.is_active;
        if !self.is_active && self.consecutive_voice_frames > ACTIVATE_ABOVE {
            self.is_active = true;
        } else if self.is_active && self.consecutive_voice_frames < DEACTIVATE_BELOW {
            self.is_active = false;
        }

        self.is_active != was_active
    }

    /// Whether voice is currently considered present
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Current counter value (diagnostics and tests)
    pub fn consecutive_voice_frames(&self) -> u32 {
        self.consecutive_voice_frames
    }

    /// Back to the initial state: counter 0, inactive
    pub fn reset(&mut self) {
        self.consecutive_voice_frames = 0;
        self.is_active = false;
    }
}

impl Default for VoiceActivityDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Share of spectral energy inside the voice band, in [0, 1]
///
/// Energy is magnitude squared. A silent or empty frame yields 0.
fn voice_ratio(magnitudes: &[f32], bin_hz: f32) -> f32 {
    if magnitudes.is_empty() || bin_hz <= 0.0 {
        return 0.0;
    }

    let (band_lo, band_hi) = VOICE_BAND_HZ;
    let mut total = 0.0f32;
    let mut voice = 0.0f32;

    for (i, &magnitude) in magnitudes.iter().enumerate() {
        let energy = magnitude * magnitude;
        total += energy;

        let frequency = i as f32 * bin_hz;
        if (band_lo..=band_hi).contains(&frequency) {
            voice += energy;
        }
    }

    if total > 0.0 {
        voice / total
    } else {
        0.0
    }
}
