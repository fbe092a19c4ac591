//! Shared audio-subsystem handle
//!
//! One explicitly constructed context per process. The offline constructor
//! serves tests and embedders that drive the chain themselves; the desktop
//! constructor probes the platform's default output device and carries its
//! sample rate. There is no module-level global and no implicit lifecycle.

use crate::error::{DspError, Result};

/// Handle to the audio subsystem the signal graph is built against
#[derive(Debug, Clone)]
pub struct AudioContext {
    sample_rate: u32,
}

impl AudioContext {
    /// Context with no platform device behind it
    ///
    /// The caller drives [`SignalGraph::process`](crate::SignalGraph::process)
    /// directly at this sample rate.
    pub fn offline(sample_rate: u32) -> Result<Self> {
        if sample_rate == 0 {
            return Err(DspError::UnsupportedPlatform(
                "sample rate must be nonzero".to_string(),
            ));
        }
        Ok(Self { sample_rate })
    }

    /// Context backed by the platform's default output device
    ///
    /// Fails when no output device exists or its configuration cannot be
    /// read; the failure is surfaced once and never retried here.
    #[cfg(feature = "desktop")]
    pub fn desktop() -> Result<Self> {
        use cpal::traits::{DeviceTrait, HostTrait};

        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            DspError::UnsupportedPlatform("no default output device".to_string())
        })?;
        let config = device
            .default_output_config()
            .map_err(|e| DspError::UnsupportedPlatform(e.to_string()))?;

        Ok(Self {
            sample_rate: config.sample_rate().0,
        })
    }

    /// Sample rate the graph will run at (Hz)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
