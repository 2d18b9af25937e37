//! Audio recording pipeline — permission → capture → trim → encode.
//!
//! # Pipeline
//!
//! ```text
//! AudioCaptureDevice → AudioChunk (mpsc) → CaptureSession (state machine)
//!       → RecordedBlob → decode_wav → SilenceTrimmer → encode_wav_pcm16
//!       → AudioArtifact (ArtifactSlot)
//! ```
//!
//! The device is injectable ([`AudioCaptureDevice`]); everything downstream
//! of it is deterministic and testable without hardware.

pub mod device;
pub mod encode;
pub mod pcm;
pub mod permission;
pub mod session;
pub mod trim;

pub use device::{AudioCaptureDevice, AudioChunk, CaptureError, CpalCaptureDevice};
pub use encode::{encode_wav_pcm16, ArtifactHandle, ArtifactSlot, AudioArtifact};
pub use pcm::{decode_wav, DecodeError, PcmBuffer};
pub use permission::PermissionGate;
pub use session::{CaptureSession, RecordedBlob, RecordingState, StopSignal};
pub use trim::{energy_envelope, SilenceTrimmer, TrimBounds};

#[cfg(test)]
pub use device::MockCaptureDevice;
