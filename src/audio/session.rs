//! Capture session state machine.
//!
//! [`CaptureSession`] wraps the platform capture primitive behind an explicit
//! state machine driven by discrete operations, independent of any UI
//! lifecycle:
//!
//! ```text
//! Idle ──start──▶ AwaitingPermission ──granted──▶ Recording
//!                        │                           │
//!                        └──denied──▶ Idle           └──stop──▶ Stopping
//!                                                                 │
//!                              Stopped(→Idle on next start) ◀──assembled
//! ```
//!
//! Guarantees:
//!
//! * `start()` while already recording (or mid-permission) is a no-op.
//! * `stop()` twice in a row yields exactly one assembled blob.
//! * `stop()` releases the device track immediately — the microphone never
//!   stays hot after a stop.
//! * a stop issued while the permission prompt is still pending (via
//!   [`StopSignal`]) still leaves the session `Idle` with the device
//!   released once the prompt resolves.

use std::io::Cursor;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hound::{SampleFormat, WavSpec, WavWriter};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::audio::device::{AudioCaptureDevice, AudioChunk};
use crate::audio::permission::{classify, PermissionGate};
use crate::notify::{self, SharedNotifications};

// ---------------------------------------------------------------------------
// RecordingState
// ---------------------------------------------------------------------------

/// States of the capture session.  Owned exclusively by [`CaptureSession`];
/// transitions happen only through its public operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordingState {
    /// Waiting for the user to start a recording.
    Idle,
    /// The platform permission request is in flight.
    AwaitingPermission,
    /// The device is capturing; chunks are accumulating.
    Recording,
    /// Stop was requested; chunks are being assembled.
    Stopping,
    /// A blob has been assembled.  Behaves like `Idle` for the next start.
    Stopped,
}

impl RecordingState {
    /// Short human-readable label suitable for a status line.
    pub fn label(&self) -> &'static str {
        match self {
            RecordingState::Idle => "Idle",
            RecordingState::AwaitingPermission => "Waiting for permission",
            RecordingState::Recording => "Recording",
            RecordingState::Stopping => "Stopping",
            RecordingState::Stopped => "Stopped",
        }
    }
}

// ---------------------------------------------------------------------------
// StopSignal
// ---------------------------------------------------------------------------

/// Out-of-band stop request, deliverable while a `start()` is still awaiting
/// the platform permission prompt.
///
/// Cheap to clone; the session checks (and consumes) the flag once the
/// pending request resolves.
#[derive(Clone, Default)]
pub struct StopSignal {
    flag: Arc<AtomicBool>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request that the in-flight start settles back to `Idle`.
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Consume the flag, returning whether it was set.
    fn take(&self) -> bool {
        self.flag.swap(false, Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// RecordedBlob
// ---------------------------------------------------------------------------

/// One finished recording: the accumulated chunks assembled into a single
/// audio container (32-bit float WAV, lossless w.r.t. the captured samples).
#[derive(Debug, Clone)]
pub struct RecordedBlob {
    /// Complete container bytes, ready for decode or direct playback.
    pub bytes: Vec<u8>,
}

/// Concatenate ordered chunks into one float-WAV container.
///
/// The container parameters come from the first chunk; an empty recording
/// produces a valid zero-sample container.
fn assemble(chunks: &[AudioChunk]) -> Result<RecordedBlob, hound::Error> {
    let (sample_rate, channels) = chunks
        .first()
        .map(|c| (c.sample_rate, c.channels))
        .unwrap_or((44_100, 1));

    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };

    let mut bytes = Vec::new();
    {
        let mut writer = WavWriter::new(Cursor::new(&mut bytes), spec)?;
        for chunk in chunks {
            if chunk.sample_rate != sample_rate || chunk.channels != channels {
                log::warn!(
                    "assemble: chunk format changed mid-recording ({} Hz {} ch → {} Hz {} ch)",
                    sample_rate,
                    channels,
                    chunk.sample_rate,
                    chunk.channels
                );
            }
            for &sample in &chunk.samples {
                writer.write_sample(sample)?;
            }
        }
        writer.finalize()?;
    }

    Ok(RecordedBlob { bytes })
}

// ---------------------------------------------------------------------------
// CaptureSession
// ---------------------------------------------------------------------------

/// State machine wrapping an [`AudioCaptureDevice`].
///
/// At most one session should exist per device; starting a new recording
/// while one is in progress is an idempotent no-op rather than a second
/// session.
pub struct CaptureSession {
    state: RecordingState,
    gate: PermissionGate,
    device: Box<dyn AudioCaptureDevice>,
    rx: Option<UnboundedReceiver<AudioChunk>>,
    stop_signal: StopSignal,
    notify: SharedNotifications,
}

impl CaptureSession {
    pub fn new(device: Box<dyn AudioCaptureDevice>, notify: SharedNotifications) -> Self {
        Self::with_stop_signal(device, notify, StopSignal::new())
    }

    /// Construct with an externally created [`StopSignal`] so callers can
    /// wire the signal into UI handlers before the session exists.
    pub fn with_stop_signal(
        device: Box<dyn AudioCaptureDevice>,
        notify: SharedNotifications,
        stop_signal: StopSignal,
    ) -> Self {
        Self {
            state: RecordingState::Idle,
            gate: PermissionGate::new(notify.clone()),
            device,
            rx: None,
            stop_signal,
            notify,
        }
    }

    /// Current state of the session.
    pub fn state(&self) -> RecordingState {
        self.state
    }

    /// Clone of the out-of-band stop signal.
    pub fn stop_signal(&self) -> StopSignal {
        self.stop_signal.clone()
    }

    /// Begin a recording.
    ///
    /// No-op if a recording (or a permission request) is already in
    /// progress.  Fails silently when permission is denied — the gate has
    /// already posted the notification.
    pub async fn start(&mut self) {
        match self.state {
            RecordingState::Recording
            | RecordingState::AwaitingPermission
            | RecordingState::Stopping => {
                log::debug!("capture: start() ignored in state {:?}", self.state);
                return;
            }
            RecordingState::Idle | RecordingState::Stopped => {}
        }

        self.state = RecordingState::AwaitingPermission;
        let granted = self.gate.ensure_access(self.device.as_mut()).await;
        if !granted {
            self.state = RecordingState::Idle;
            return;
        }

        // A stop may have arrived while the prompt was pending; honour it by
        // releasing the device and settling back to Idle.
        if self.stop_signal.take() {
            log::info!("capture: stop arrived during permission request");
            self.device.stop();
            self.state = RecordingState::Idle;
            return;
        }

        match self.device.start() {
            Ok(rx) => {
                self.rx = Some(rx);
                self.state = RecordingState::Recording;
                log::info!("capture: recording on '{}'", self.device.name());
            }
            Err(e) => {
                log::warn!("capture: failed to start stream: {e}");
                notify::post(&self.notify, classify(&e));
                self.state = RecordingState::Idle;
            }
        }
    }

    /// Stop the recording and assemble the accumulated chunks.
    ///
    /// Returns the assembled blob, or `None` when there was nothing to stop
    /// (idempotent) or assembly failed.  The device track is released before
    /// assembly begins.
    pub async fn stop(&mut self) -> Option<RecordedBlob> {
        match self.state {
            RecordingState::AwaitingPermission => {
                self.stop_signal.trigger();
                return None;
            }
            RecordingState::Recording => {}
            _ => {
                log::debug!("capture: stop() ignored in state {:?}", self.state);
                return None;
            }
        }

        self.state = RecordingState::Stopping;
        self.device.stop();

        let mut chunks = Vec::new();
        if let Some(mut rx) = self.rx.take() {
            rx.close();
            while let Ok(chunk) = rx.try_recv() {
                chunks.push(chunk);
            }
        }

        // Assembly happens off the stop call's critical path.
        tokio::task::yield_now().await;

        let result = assemble(&chunks);
        self.state = RecordingState::Stopped;

        match result {
            Ok(blob) => {
                log::info!(
                    "capture: assembled {} chunk(s) into {} bytes",
                    chunks.len(),
                    blob.bytes.len()
                );
                Some(blob)
            }
            Err(e) => {
                log::error!("capture: blob assembly failed: {e}");
                None
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
