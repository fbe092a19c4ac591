//! Periodic analysis loop driving the duck link
//!
//! A worker thread samples the spectrum probe at a fixed period, feeds the
//! detector, and pushes flag changes onto the duck link. The worker parks
//! on a cancellation channel between ticks, so stopping it interrupts a
//! pending sleep immediately instead of waiting the period out. `tick` is
//! public so tests (and embedders with their own scheduler) can drive the
//! controller synchronously.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use hush_dsp::{GainHandle, SpectrumReader};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::announce::AnnouncementCoordinator;
use crate::detector::VoiceActivityDetector;
use crate::link::DuckLink;

/// Ducking feature configuration pushed from the settings UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuckingConfig {
    /// Whether the detector runs at all
    pub enabled: bool,
    /// Analysis period in milliseconds (display-refresh-ish)
    pub tick_period_ms: u64,
}

impl Default for DuckingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_period_ms: 16,
        }
    }
}

struct ControllerShared {
    reader: Mutex<SpectrumReader>,
    detector: Mutex<VoiceActivityDetector>,
    link: DuckLink,
    enabled: AtomicBool,
    bin_hz: f32,
}

struct Worker {
    cancel_tx: Sender<()>,
    handle: JoinHandle<()>,
}

/// Owns the analysis worker and the detector state
///
/// Holds only non-owning handles into the signal chain: a [`SpectrumReader`]
/// for input and (through the [`DuckLink`]) a [`GainHandle`] for output.
pub struct DuckingController {
    shared: Arc<ControllerShared>,
    worker: Option<Worker>,
}

impl DuckingController {
    /// Wire a controller between a spectrum reader and the ducking gain
    ///
    /// `bin_hz` is the reader's bin width
    /// ([`SpectrumReader::bin_hz`]); it fixes which bins fall in the voice
    /// band.
    pub fn new(reader: SpectrumReader, bin_hz: f32, ducking_gain: GainHandle) -> Self {
        Self {
            shared: Arc::new(ControllerShared {
                reader: Mutex::new(reader),
                detector: Mutex::new(VoiceActivityDetector::new()),
                link: DuckLink::new(ducking_gain),
                enabled: AtomicBool::new(true),
                bin_hz,
            }),
            worker: None,
        }
    }

    /// Coordinator for the announcement override, sharing this controller's
    /// duck link
    pub fn announcements(&self) -> AnnouncementCoordinator {
        AnnouncementCoordinator::new(self.shared.link.clone())
    }

    /// One analysis step: sample, detect, retarget on change
    ///
    /// Infallible on every path: an unusable frame counts as silence for
    /// this tick. Callable directly for synchronous driving.
    pub fn tick(&self) {
        Self::tick_shared(&self.shared);
    }

    fn tick_shared(shared: &ControllerShared) {
        if !shared.enabled.load(Ordering::Relaxed) {
            return;
        }

        let magnitudes = match shared.reader.lock() {
            Ok(mut reader) => reader.magnitudes(),
            Err(_) => Vec::new(),
        };

        let Ok(mut detector) = shared.detector.lock() else {
            return;
        };
        if detector.observe(&magnitudes, shared.bin_hz) {
            let active = detector.is_active();
            debug!(active, "voice activity changed");
            shared.link.set_voice_active(active);
        }
    }

    /// Start the periodic worker, cancelling any previous one first
    ///
    /// Exactly one loop runs after this returns; calling `start` again
    /// replaces the worker rather than stacking a second one.
    pub fn start(&mut self, period: Duration) {
        self.cancel_worker();

        let (cancel_tx, cancel_rx) = bounded::<()>(1);
        let shared = Arc::clone(&self.shared);
        let handle = thread::spawn(move || {
            debug!(period_ms = period.as_millis() as u64, "analysis worker started");
            loop {
                match cancel_rx.recv_timeout(period) {
                    Err(RecvTimeoutError::Timeout) => Self::tick_shared(&shared),
                    // Cancelled, or the controller is gone
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            debug!("analysis worker stopped");
        });

        self.worker = Some(Worker { cancel_tx, handle });
    }

    /// Stop the worker, clear any active voice duck, and reset the detector
    ///
    /// Called when playback stops, the feature turns off, or the audio
    /// subsystem goes away. Announcements are unaffected.
    pub fn stop(&mut self) {
        self.cancel_worker();
        if let Ok(mut detector) = self.shared.detector.lock() {
            detector.reset();
        }
        self.shared.link.clear_voice();
    }

    /// Enable or disable the detection feature
    ///
    /// Disabling cancels the analysis worker, resets the detector, and
    /// clears any active voice duck. Re-enabling does not spawn a worker
    /// by itself; call [`start`](Self::start) (or
    /// [`apply_config`](Self::apply_config)) for that.
    pub fn set_enabled(&mut self, enabled: bool) {
        let previous = self.shared.enabled.swap(enabled, Ordering::Relaxed);
        if previous && !enabled {
            self.cancel_worker();
            if let Ok(mut detector) = self.shared.detector.lock() {
                detector.reset();
            }
            self.shared.link.clear_voice();
        }
    }

    /// Apply a configuration snapshot from the settings UI
    ///
    /// Enabling (re)starts the worker at the configured period; disabling
    /// shuts the feature down as [`set_enabled`](Self::set_enabled) does.
    pub fn apply_config(&mut self, config: &DuckingConfig) {
        if config.enabled {
            self.shared.enabled.store(true, Ordering::Relaxed);
            self.start(Duration::from_millis(config.tick_period_ms));
        } else {
            self.set_enabled(false);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::Relaxed)
    }

    /// Whether the detector currently considers voice present
    pub fn voice_active(&self) -> bool {
        self.shared
            .detector
            .lock()
            .map(|d| d.is_active())
            .unwrap_or(false)
    }

    /// Whether the running worker exists (not whether voice is active)
    pub fn is_running(&self) -> bool {
        self.worker.is_some()
    }

    fn cancel_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.cancel_tx.send(());
            let _ = worker.handle.join();
        }
    }
}

impl Drop for DuckingController {
    fn drop(&mut self) {
        self.cancel_worker();
    }
}
