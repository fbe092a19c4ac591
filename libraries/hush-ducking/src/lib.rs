//! Adaptive ducking for the Hush player
//!
//! Attenuates program audio when voice-like content is detected in the
//! chain's spectrum tap, and whenever the player's announcement voice is
//! speaking. Talks to `hush-dsp` only through its cloneable handles
//! (`SpectrumReader` in, `GainHandle` out); it never owns chain nodes.
//!
//! Wiring order: build the [`DuckingController`] from a graph's reader and
//! ducking handle, take an [`AnnouncementCoordinator`] from it, then
//! [`start`](DuckingController::start) the analysis worker while playback
//! runs and [`stop`](DuckingController::stop) it when playback stops.

pub mod announce;
pub mod controller;
pub mod detector;
pub mod link;

pub use announce::{AnnouncementCoordinator, AnnouncementToken};
pub use controller::{DuckingConfig, DuckingController};
pub use detector::{
    VoiceActivityDetector, ACTIVATE_ABOVE, DEACTIVATE_BELOW, FRAME_CEILING, RATIO_THRESHOLD,
    VOICE_BAND_HZ,
};
pub use link::{DuckLink, DUCK_GAIN};
