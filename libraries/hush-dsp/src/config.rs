//! Chain configuration pushed from the settings UI

use serde::{Deserialize, Serialize};

/// Number of equalizer bands. Fixed at construction, never changes at
/// runtime.
pub const BAND_COUNT: usize = 5;

/// Center frequencies of the equalizer bands, ascending (Hz).
pub const BAND_FREQUENCIES: [f32; BAND_COUNT] = [60.0, 250.0, 1000.0, 4000.0, 16000.0];

/// Bandwidth parameter shared by every band. Fixed at construction.
pub const BAND_Q: f32 = 1.0;

/// Per-band gain range in dB.
pub const BAND_GAIN_RANGE_DB: (f32, f32) = (-20.0, 20.0);

/// Configuration for the signal chain
///
/// Pushed as a whole via [`SignalGraph::reconfigure`](crate::SignalGraph::reconfigure).
/// These six fields are the entire contract with the settings UI; nothing
/// else is recognized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Whether the preamp stage is wired into the chain
    pub amp_enabled: bool,

    /// Preamp gain as a linear multiplier (> 0)
    pub amp_gain: f32,

    /// Whether the equalizer bands are wired into the chain
    pub eq_enabled: bool,

    /// Per-band gain in dB, one per entry of [`BAND_FREQUENCIES`]
    pub band_gains: [f32; BAND_COUNT],

    /// Master gain as a linear multiplier (0.0 to 1.0)
    pub master_gain: f32,

    /// Mute state (preserves `master_gain`)
    pub muted: bool,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            amp_enabled: false,
            amp_gain: 1.0,
            eq_enabled: false,
            band_gains: [0.0; BAND_COUNT],
            master_gain: 1.0,
            muted: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_flat() {
        let config = ChainConfig::default();
        assert!(!config.amp_enabled);
        assert_eq!(config.amp_gain, 1.0);
        assert!(!config.eq_enabled);
        assert_eq!(config.band_gains, [0.0; BAND_COUNT]);
        assert_eq!(config.master_gain, 1.0);
        assert!(!config.muted);
    }

    #[test]
    fn band_plan_is_ascending() {
        for pair in BAND_FREQUENCIES.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }
}
