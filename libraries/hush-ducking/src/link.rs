//! The duck link: two booleans, one gain
//!
//! Voice activity and announcement speech both want program audio out of
//! the way. The link ORs the two flags and retargets the chain's ducking
//! gain stage whenever the combined result changes; the stage's own ramp
//! makes the transition click-free.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hush_dsp::GainHandle;
use tracing::debug;

/// Attenuation applied while ducked (about -9.5 dB)
pub const DUCK_GAIN: f32 = 1.0 / 3.0;

struct LinkShared {
    gain: GainHandle,
    voice_active: AtomicBool,
    speaking: AtomicBool,
}

/// Cloneable writer over the ducking gain stage
///
/// The detector side sets `voice_active`; the announcement coordinator sets
/// `speaking`. Neither flag has precedence: either one ducks.
#[derive(Clone)]
pub struct DuckLink {
    shared: Arc<LinkShared>,
}

impl DuckLink {
    pub fn new(gain: GainHandle) -> Self {
        Self {
            shared: Arc::new(LinkShared {
                gain,
                voice_active: AtomicBool::new(false),
                speaking: AtomicBool::new(false),
            }),
        }
    }

    /// Update the voice-activity flag; retargets the gain on change
    pub fn set_voice_active(&self, active: bool) {
        let previous = self.shared.voice_active.swap(active, Ordering::Relaxed);
        if previous != active {
            self.apply();
        }
    }

    /// Update the announcement flag; retargets the gain on change
    pub fn set_speaking(&self, speaking: bool) {
        let previous = self.shared.speaking.swap(speaking, Ordering::Relaxed);
        if previous != speaking {
            self.apply();
        }
    }

    /// Drop the voice flag (announcements are untouched). Used when the
    /// analysis loop shuts down.
    pub fn clear_voice(&self) {
        self.set_voice_active(false);
    }

    pub fn is_ducked(&self) -> bool {
        self.shared.voice_active.load(Ordering::Relaxed)
            || self.shared.speaking.load(Ordering::Relaxed)
    }

    pub fn is_speaking(&self) -> bool {
        self.shared.speaking.load(Ordering::Relaxed)
    }

    /// Recompute the effective gain from the current flags and apply it
    fn apply(&self) {
        let ducked = self.is_ducked();
        let gain = if ducked { DUCK_GAIN } else { 1.0 };
        self.shared.gain.set_gain(gain);
        debug!(ducked, gain, "duck gain retargeted");
    }
}
