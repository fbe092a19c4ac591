//! Real-time signal chain for the Hush player
//!
//! The chain between decoded audio and the output sink: a preamp, a fixed
//! five-band equalizer, a ducking gain driven externally, a spectrum tap,
//! and a master gain/mute stage. Nodes are constructed once per
//! [`SignalGraph`] and rewired (never reallocated) as the configuration
//! changes; every scalar change ramps so the chain cannot click.
//!
//! The adaptive layer (voice-activity ducking, announcements) lives in the
//! `hush-ducking` crate and talks to this one only through [`SpectrumReader`]
//! and [`GainHandle`].

pub mod bands;
pub mod config;
pub mod context;
pub mod error;
pub mod gain;
pub mod graph;
pub mod probe;

#[cfg(feature = "desktop")]
pub mod sink;

pub use bands::FilterBank;
pub use config::{ChainConfig, BAND_COUNT, BAND_FREQUENCIES, BAND_GAIN_RANGE_DB, BAND_Q};
pub use context::AudioContext;
pub use error::{DspError, Result};
pub use gain::{db_to_linear, linear_to_db, GainHandle, GainStage, GAIN_FLOOR_DB};
pub use graph::{SignalGraph, Stage};
pub use probe::{SpectrumProbe, SpectrumReader, BIN_COUNT, FFT_SIZE};

#[cfg(feature = "desktop")]
pub use sink::DesktopSink;
