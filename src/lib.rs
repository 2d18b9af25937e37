//! TalkPlay audio core — recording, trimming, playback, and read-aloud for a
//! speaking-practice app.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────┐   chunks    ┌────────────────┐   blob   ┌─────────────┐
//! │ capture    │ ──────────► │ CaptureSession │ ───────► │ SilenceTrim │
//! │ device     │             │ (state machine)│          │  + encode   │
//! └───────────┘             └────────────────┘          └──────┬──────┘
//!       ▲                                                      │ artifact
//!       │ permission                                           ▼
//! ┌─────┴─────────┐                                   ┌─────────────────┐
//! │ PermissionGate │                                   │ ArtifactSlot    │
//! └───────────────┘                                   └───────┬─────────┘
//!                                                             │ poll
//! ┌──────────┐  utterance  ┌─────────────┐            ┌───────▼─────────┐
//! │ Speaker   │ ──────────► │ SpeechEngine│            │ PlaybackController │
//! └──────────┘             └─────────────┘            └─────────────────┘
//! ```
//!
//! Every failure is absorbed locally and surfaced through the single-slot
//! [`notify::NotificationChannel`]; nothing here ever aborts the host.
//!
//! The platform seams are two injectable traits —
//! [`audio::AudioCaptureDevice`] and [`speech::SpeechEngine`] — plus the
//! [`playback::AudioPlayer`] output.  Everything between them is
//! deterministic and runs on a single cooperative thread.

pub mod audio;
pub mod config;
pub mod notify;
pub mod pipeline;
pub mod playback;
pub mod speech;
