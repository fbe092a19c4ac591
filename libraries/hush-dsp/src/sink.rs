//! cpal-backed desktop output sink
//!
//! A dedicated audio thread owns the cpal `Stream`; the caller talks to it
//! over a command channel, which sidesteps the platform-dependent Send/Sync
//! story of cpal's stream type. The device callback copies program audio
//! from the current buffer and runs it through the signal graph in place,
//! so every configured stage (and the ducking gain) applies at render time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::{bounded, Receiver, Sender};
use tracing::{debug, warn};

use crate::error::{DspError, Result};
use crate::graph::SignalGraph;

/// Commands for the audio thread
enum SinkCommand {
    /// Swap in a new program buffer and play it from the start
    Play { samples: Arc<Vec<f32>> },
    Pause,
    Resume,
    Stop,
    Shutdown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransportState {
    Stopped,
    Playing,
    Paused,
}

/// State shared between the caller, the audio thread, and the callback
struct SinkState {
    /// Interleaved stereo program audio; Arc so the callback reads without
    /// holding the lock
    buffer: Mutex<Arc<Vec<f32>>>,
    /// Playback position in samples
    position: AtomicUsize,
    transport: Mutex<TransportState>,
    graph: Mutex<SignalGraph>,
}

/// Desktop output sink driving a [`SignalGraph`]
///
/// Construction fails with [`DspError::UnsupportedPlatform`] when no output
/// device exists or the stream cannot be built; on failure nothing is
/// half-wired and audio stays silent.
pub struct DesktopSink {
    command_tx: Sender<SinkCommand>,
    sample_rate: u32,
    state: Arc<SinkState>,
    _audio_thread: Option<JoinHandle<()>>,
}

impl DesktopSink {
    /// Open the default output device and wire the graph behind it
    ///
    /// The graph must have been built at this device's sample rate (use
    /// [`AudioContext::desktop`](crate::AudioContext::desktop)).
    pub fn open(graph: SignalGraph) -> Result<Self> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or_else(|| {
            DspError::UnsupportedPlatform("no default output device".to_string())
        })?;
        let config = device
            .default_output_config()
            .map_err(|e| DspError::UnsupportedPlatform(e.to_string()))?;

        let sample_rate = config.sample_rate().0;
        let config = config.config();

        let state = Arc::new(SinkState {
            buffer: Mutex::new(Arc::new(Vec::new())),
            position: AtomicUsize::new(0),
            transport: Mutex::new(TransportState::Stopped),
            graph: Mutex::new(graph),
        });

        let (command_tx, command_rx) = bounded::<SinkCommand>(32);
        // The thread reports stream construction through this handshake so
        // a build failure surfaces here, not as silent dead audio.
        let (ready_tx, ready_rx) = bounded::<std::result::Result<(), String>>(1);

        let state_clone = Arc::clone(&state);
        let audio_thread = thread::spawn(move || {
            Self::audio_thread_run(&device, &config, &state_clone, &command_rx, &ready_tx);
        });

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(message)) => return Err(DspError::UnsupportedPlatform(message)),
            Err(_) => {
                return Err(DspError::UnsupportedPlatform(
                    "audio thread exited during stream setup".to_string(),
                ))
            }
        }

        debug!(sample_rate, "desktop sink opened");

        Ok(Self {
            command_tx,
            sample_rate,
            state,
            _audio_thread: Some(audio_thread),
        })
    }

    /// Sample rate of the output device (Hz)
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Begin playing an interleaved stereo buffer from the start
    pub fn play(&self, samples: Vec<f32>) -> Result<()> {
        self.send(SinkCommand::Play {
            samples: Arc::new(samples),
        })
    }

    /// Pause, retaining the buffer and position
    pub fn pause(&self) -> Result<()> {
        self.send(SinkCommand::Pause)
    }

    /// Resume from the paused position
    pub fn resume(&self) -> Result<()> {
        self.send(SinkCommand::Resume)
    }

    /// Stop and rewind
    pub fn stop(&self) -> Result<()> {
        self.send(SinkCommand::Stop)
    }

    /// Run a closure against the graph behind this sink (reconfiguration,
    /// handle extraction). Blocks at most one device callback.
    pub fn with_graph<T>(&self, f: impl FnOnce(&mut SignalGraph) -> T) -> T {
        let mut graph = match self.state.graph.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut graph)
    }

    fn send(&self, command: SinkCommand) -> Result<()> {
        self.command_tx.send(command).map_err(|_| {
            DspError::UnsupportedPlatform("audio thread is gone".to_string())
        })
    }

    /// Audio thread main loop; owns the cpal stream
    fn audio_thread_run(
        device: &Device,
        config: &StreamConfig,
        state: &Arc<SinkState>,
        command_rx: &Receiver<SinkCommand>,
        ready_tx: &Sender<std::result::Result<(), String>>,
    ) {
        let state_for_callback = Arc::clone(state);
        let stream: Stream = match device.build_output_stream(
            config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                Self::render(data, &state_for_callback);
            },
            |err| warn!(error = %err, "audio stream error"),
            None,
        ) {
            Ok(stream) => stream,
            Err(e) => {
                let _ = ready_tx.send(Err(e.to_string()));
                return;
            }
        };

        if let Err(e) = stream.play() {
            let _ = ready_tx.send(Err(e.to_string()));
            return;
        }
        let _ = ready_tx.send(Ok(()));

        while let Ok(command) = command_rx.recv() {
            match command {
                SinkCommand::Play { samples } => {
                    if let Ok(mut buffer) = state.buffer.lock() {
                        *buffer = samples;
                    }
                    state.position.store(0, Ordering::Relaxed);
                    Self::set_transport(state, TransportState::Playing);
                    if let Ok(mut graph) = state.graph.lock() {
                        graph.reset();
                    }
                }
                SinkCommand::Pause => Self::set_transport(state, TransportState::Paused),
                SinkCommand::Resume => Self::set_transport(state, TransportState::Playing),
                SinkCommand::Stop => {
                    Self::set_transport(state, TransportState::Stopped);
                    state.position.store(0, Ordering::Relaxed);
                }
                SinkCommand::Shutdown => break,
            }
        }

        drop(stream);
        debug!("audio thread shut down");
    }

    fn set_transport(state: &SinkState, transport: TransportState) {
        if let Ok(mut guard) = state.transport.lock() {
            *guard = transport;
        }
    }

    /// Device callback: copy program audio, then run the graph over it
    fn render(output: &mut [f32], state: &SinkState) {
        let playing = state
            .transport
            .lock()
            .map(|t| *t == TransportState::Playing)
            .unwrap_or(false);
        if !playing {
            output.fill(0.0);
            return;
        }

        let buffer = match state.buffer.lock() {
            Ok(guard) => Arc::clone(&guard),
            Err(_) => {
                output.fill(0.0);
                return;
            }
        };

        let mut pos = state.position.load(Ordering::Relaxed);
        for out_sample in output.iter_mut() {
            *out_sample = if pos < buffer.len() {
                let s = buffer[pos];
                pos += 1;
                s
            } else {
                0.0
            };
        }
        state.position.store(pos, Ordering::Relaxed);

        // A contended lock (reconfigure in flight) passes this buffer
        // through unprocessed; one stale buffer is tolerated.
        if let Ok(mut graph) = state.graph.try_lock() {
            graph.process(output);
        }

        if pos >= buffer.len() && !buffer.is_empty() {
            Self::set_transport(state, TransportState::Stopped);
        }
    }
}

impl Drop for DesktopSink {
    fn drop(&mut self) {
        let _ = self.command_tx.send(SinkCommand::Shutdown);
    }
}
