//! Microphone capture behind the injectable [`AudioCaptureDevice`] trait.
//!
//! The recording pipeline never talks to the platform directly — it drives a
//! `Box<dyn AudioCaptureDevice>` so that tests can substitute a deterministic
//! fake for real hardware.  [`CpalCaptureDevice`] is the production
//! implementation built on `cpal`; it wraps the host/device/stream lifecycle
//! and forwards each hardware buffer as an [`AudioChunk`] over an unbounded
//! channel.
//!
//! Dropping the internal `cpal::Stream` (via [`AudioCaptureDevice::stop`])
//! releases the device track immediately — the microphone must not stay
//! "hot" after a stop.

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use thiserror::Error;
use tokio::sync::mpsc;

// ---------------------------------------------------------------------------
// AudioChunk
// ---------------------------------------------------------------------------

/// A single buffer of raw audio as delivered by the capture callback.
///
/// Samples are interleaved `f32` in the range `[-1.0, 1.0]`.  Chunks are
/// accumulated in order by the capture session and concatenated into one
/// assembled blob when recording stops.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Interleaved PCM samples in `[-1.0, 1.0]`.
    pub samples: Vec<f32>,
    /// Sample rate of this chunk in Hz (e.g. 44100, 48000).
    pub sample_rate: u32,
    /// Number of interleaved channels (1 = mono, 2 = stereo, …).
    pub channels: u16,
}

// ---------------------------------------------------------------------------
// CaptureError
// ---------------------------------------------------------------------------

/// Errors that can occur while requesting access to or running the capture
/// device.  The [`PermissionGate`](crate::audio::PermissionGate) classifies
/// these into user-facing notifications.
#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    /// Microphone access was denied by the user or the platform.
    #[error("microphone access denied by the user or platform")]
    PermissionDenied,

    /// No input device found on the default audio host.
    #[error("no input device found on the default audio host")]
    NoDevice,

    /// Any other capture-device failure.
    #[error("capture device error: {0}")]
    Device(String),
}

/// Sort a backend-specific error message into denied vs. generic failure.
///
/// Desktop hosts report OS-level microphone denial as an opaque backend
/// string, so classification is by message inspection.
fn classify_backend_message(message: String) -> CaptureError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("not permitted")
    {
        CaptureError::PermissionDenied
    } else {
        CaptureError::Device(message)
    }
}

impl From<cpal::DefaultStreamConfigError> for CaptureError {
    fn from(e: cpal::DefaultStreamConfigError) -> Self {
        match e {
            cpal::DefaultStreamConfigError::DeviceNotAvailable => CaptureError::NoDevice,
            other => classify_backend_message(other.to_string()),
        }
    }
}

impl From<cpal::BuildStreamError> for CaptureError {
    fn from(e: cpal::BuildStreamError) -> Self {
        match e {
            cpal::BuildStreamError::DeviceNotAvailable => CaptureError::NoDevice,
            other => classify_backend_message(other.to_string()),
        }
    }
}

impl From<cpal::PlayStreamError> for CaptureError {
    fn from(e: cpal::PlayStreamError) -> Self {
        classify_backend_message(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// AudioCaptureDevice trait
// ---------------------------------------------------------------------------

/// Injectable interface over the platform's audio-capture primitive.
///
/// The trait is `?Send` — the whole pipeline runs on a single-threaded
/// cooperative scheduler and the production implementation holds a
/// `cpal::Stream`, which is not `Send` on every platform.
///
/// # Contract
///
/// - [`request_access`](Self::request_access) must be called (and succeed)
///   before [`start`](Self::start).
/// - [`stop`](Self::stop) releases the underlying track immediately; chunks
///   already delivered remain readable on the receiver returned by `start`.
/// - `stop` on a device that is not capturing is a no-op.
#[async_trait(?Send)]
pub trait AudioCaptureDevice {
    /// Ask the platform for microphone authorization and claim the device.
    async fn request_access(&mut self) -> Result<(), CaptureError>;

    /// `true` while a previously granted device track is still usable.
    ///
    /// Returns `false` when the track has ended (device unplugged, claimed by
    /// another application) — the gate then re-requests access.
    fn is_live(&self) -> bool;

    /// Begin capturing; chunks arrive on the returned receiver.
    fn start(&mut self) -> Result<mpsc::UnboundedReceiver<AudioChunk>, CaptureError>;

    /// Stop capturing and release the device track immediately.
    fn stop(&mut self);

    /// Device name for logging.
    fn name(&self) -> &str;
}

// ---------------------------------------------------------------------------
// CpalCaptureDevice
// ---------------------------------------------------------------------------

/// Production capture device using the system default `cpal` input.
///
/// # Example
///
/// ```rust,no_run
/// use talkplay_audio::audio::{AudioCaptureDevice, CpalCaptureDevice};
///
/// # async fn example() {
/// let mut device = CpalCaptureDevice::new();
/// device.request_access().await.unwrap();
/// let _rx = device.start().unwrap();
/// // chunks arrive on _rx; device.stop() releases the microphone.
/// # }
/// ```
pub struct CpalCaptureDevice {
    device: Option<cpal::Device>,
    config: Option<cpal::StreamConfig>,
    stream: Option<cpal::Stream>,
    sample_rate: u32,
    channels: u16,
}

impl CpalCaptureDevice {
    /// A device wrapper that has not yet requested access.
    pub fn new() -> Self {
        Self {
            device: None,
            config: None,
            stream: None,
            sample_rate: 0,
            channels: 0,
        }
    }

    /// Native sample rate reported by the device, once access is granted.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Native channel count reported by the device, once access is granted.
    pub fn channels(&self) -> u16 {
        self.channels
    }
}

impl Default for CpalCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl AudioCaptureDevice for CpalCaptureDevice {
    async fn request_access(&mut self) -> Result<(), CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or(CaptureError::NoDevice)?;

        let supported = device.default_input_config()?;
        self.channels = supported.channels();
        self.sample_rate = supported.sample_rate().0;
        self.config = Some(supported.into());
        self.device = Some(device);

        log::info!(
            "capture: device claimed ({} Hz, {} ch)",
            self.sample_rate,
            self.channels
        );
        Ok(())
    }

    fn is_live(&self) -> bool {
        // A claimed device whose default config can no longer be queried has
        // been unplugged or reclaimed by the OS.
        match &self.device {
            Some(device) => device.default_input_config().is_ok(),
            None => false,
        }
    }

    fn start(&mut self) -> Result<mpsc::UnboundedReceiver<AudioChunk>, CaptureError> {
        let (device, config) = match (&self.device, &self.config) {
            (Some(d), Some(c)) => (d, c),
            _ => {
                return Err(CaptureError::Device(
                    "start() called before access was granted".into(),
                ))
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let sample_rate = self.sample_rate;
        let channels = self.channels;

        let stream = device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let chunk = AudioChunk {
                    samples: data.to_vec(),
                    sample_rate,
                    channels,
                };
                // Ignore send errors; the receiver may have been dropped.
                let _ = tx.send(chunk);
            },
            |err: cpal::StreamError| {
                log::error!("cpal stream error: {err}");
            },
            None, // no timeout
        )?;

        stream.play()?;
        self.stream = Some(stream);
        Ok(rx)
    }

    fn stop(&mut self) {
        // Dropping the stream stops the hardware callback and releases the
        // track synchronously.
        if self.stream.take().is_some() {
            log::debug!("capture: stream released");
        }
    }

    fn name(&self) -> &str {
        "cpal-default-input"
    }
}

// ---------------------------------------------------------------------------
// MockCaptureDevice  (test-only)
// ---------------------------------------------------------------------------

/// Call counters observable from outside a mock that has been boxed into a
/// session.
#[cfg(test)]
#[derive(Default)]
pub struct MockCounters {
    /// Number of `request_access` calls observed.
    pub access_requests: std::sync::atomic::AtomicUsize,
    /// Number of `stop` calls observed.
    pub stop_calls: std::sync::atomic::AtomicUsize,
}

/// A deterministic capture device for tests: configurable grant/deny result,
/// canned chunks, and an optional hook that fires while the (simulated)
/// permission prompt is open.
#[cfg(test)]
pub struct MockCaptureDevice {
    access: Option<CaptureError>,
    live: bool,
    chunks: Vec<AudioChunk>,
    access_hook: Option<Box<dyn FnMut()>>,
    counters: std::sync::Arc<MockCounters>,
}

#[cfg(test)]
impl MockCaptureDevice {
    /// A device that grants access and delivers `chunks` once started.
    pub fn granted(chunks: Vec<AudioChunk>) -> Self {
        Self {
            access: None,
            live: false,
            chunks,
            access_hook: None,
            counters: Default::default(),
        }
    }

    /// A device whose access request always fails with `error`.
    pub fn failing(error: CaptureError) -> Self {
        Self {
            access: Some(error),
            live: false,
            chunks: Vec::new(),
            access_hook: None,
            counters: Default::default(),
        }
    }

    /// Shared handle to the call counters.
    pub fn counters(&self) -> std::sync::Arc<MockCounters> {
        std::sync::Arc::clone(&self.counters)
    }

    /// Run `hook` while the permission request is pending (used to simulate
    /// a stop arriving mid-prompt).
    pub fn with_access_hook(mut self, hook: impl FnMut() + 'static) -> Self {
        self.access_hook = Some(Box::new(hook));
        self
    }

    /// Force the live/ended state of the (already granted) track.
    pub fn set_live(&mut self, live: bool) {
        self.live = live;
    }
}

#[cfg(test)]
#[async_trait(?Send)]
impl AudioCaptureDevice for MockCaptureDevice {
    async fn request_access(&mut self) -> Result<(), CaptureError> {
        self.counters
            .access_requests
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        if let Some(hook) = &mut self.access_hook {
            hook();
        }
        // Model the platform prompt as a real suspension point.
        tokio::task::yield_now().await;
        match &self.access {
            Some(e) => Err(e.clone()),
            None => {
                self.live = true;
                Ok(())
            }
        }
    }

    fn is_live(&self) -> bool {
        self.live
    }

    fn start(&mut self) -> Result<mpsc::UnboundedReceiver<AudioChunk>, CaptureError> {
        let (tx, rx) = mpsc::unbounded_channel();
        for chunk in self.chunks.drain(..) {
            let _ = tx.send(chunk);
        }
        // Sender drops here; buffered chunks remain readable on the receiver.
        Ok(rx)
    }

    fn stop(&mut self) {
        self.counters
            .stop_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    fn name(&self) -> &str {
        "mock"
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
