//! Single-slot user notification channel.
//!
//! Every failure in the recording / playback / speech pipelines is absorbed
//! locally and surfaced to the presentation layer through exactly one
//! [`NotificationChannel`].  The channel holds **at most one** live
//! [`Notification`] — writes are last-write-wins.
//!
//! Two lifetimes exist:
//!
//! * **persistent** — stays until [`NotificationChannel::dismiss`] is called
//!   (used for permission / device failures that block the feature entirely);
//! * **transient** — expires automatically after a fixed TTL (default 10 s),
//!   used for recoverable processing and playback errors.
//!
//! The channel is shared as [`SharedNotifications`]
//! (`Arc<Mutex<NotificationChannel>>`) — cheap to clone, lock only for short
//! critical sections.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

// ---------------------------------------------------------------------------
// Severity / NotificationKind
// ---------------------------------------------------------------------------

/// How serious a notification is, from the user's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Something the user must deal with (blocked feature, failed playback).
    Error,
    /// Informational degradation (e.g. speech synthesis unavailable).
    Warning,
}

/// Classification of what went wrong, used by the presentation layer to pick
/// wording / iconography without parsing message strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Microphone permission was denied by the user or platform.
    Permission,
    /// No capture device could be found.
    NoDevice,
    /// Any other capture-device failure.
    DeviceError,
    /// The recorded blob could not be decoded; playback uses untrimmed audio.
    TrimFailed,
    /// The playback primitive reported an error.
    PlaybackError,
    /// Playback was requested but no artifact ever became available.
    NothingToPlay,
    /// The host offers no speech-synthesis capability.
    SynthesisUnsupported,
}

// ---------------------------------------------------------------------------
// Notification
// ---------------------------------------------------------------------------

/// One user-facing message.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    /// Machine-readable classification.
    pub kind: NotificationKind,
    /// Human-readable message shown to the user.
    pub message: String,
    /// Error vs. warning.
    pub severity: Severity,
    /// `true` → requires explicit dismissal; `false` → expires after the TTL.
    pub persistent: bool,
}

impl Notification {
    /// A persistent error notification.
    pub fn persistent(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            severity: Severity::Error,
            persistent: true,
        }
    }

    /// A transient error notification (expires after the channel TTL).
    pub fn transient(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            severity: Severity::Error,
            persistent: false,
        }
    }

    /// A transient warning notification.
    pub fn warning(kind: NotificationKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            severity: Severity::Warning,
            persistent: false,
        }
    }
}

// ---------------------------------------------------------------------------
// NotificationChannel
// ---------------------------------------------------------------------------

/// Default lifetime of a transient notification.
pub const DEFAULT_TRANSIENT_TTL: Duration = Duration::from_secs(10);

/// Holds at most one live notification.
///
/// # Example
///
/// ```
/// use talkplay_audio::notify::{Notification, NotificationChannel, NotificationKind};
///
/// let mut channel = NotificationChannel::new();
/// channel.post(Notification::persistent(
///     NotificationKind::Permission,
///     "Microphone access was denied.",
/// ));
/// assert!(channel.current().is_some());
/// channel.dismiss();
/// assert!(channel.current().is_none());
/// ```
#[derive(Debug)]
pub struct NotificationChannel {
    slot: Option<(Notification, Instant)>,
    transient_ttl: Duration,
}

impl NotificationChannel {
    /// Channel with the default 10 s transient TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TRANSIENT_TTL)
    }

    /// Channel with a custom transient TTL (tests use short values).
    pub fn with_ttl(transient_ttl: Duration) -> Self {
        Self {
            slot: None,
            transient_ttl,
        }
    }

    /// Replace whatever is currently shown.  Last write wins.
    pub fn post(&mut self, notification: Notification) {
        log::debug!(
            "notify: {:?} ({:?}, persistent={})",
            notification.kind,
            notification.severity,
            notification.persistent
        );
        self.slot = Some((notification, Instant::now()));
    }

    /// The currently live notification, if any.
    ///
    /// Transient notifications older than the TTL are cleared lazily here —
    /// no timer task is needed in the single-threaded cooperative model.
    pub fn current(&mut self) -> Option<&Notification> {
        if let Some((n, posted)) = &self.slot {
            if !n.persistent && posted.elapsed() >= self.transient_ttl {
                self.slot = None;
            }
        }
        self.slot.as_ref().map(|(n, _)| n)
    }

    /// Explicitly clear the slot (persistent notifications require this).
    pub fn dismiss(&mut self) {
        self.slot = None;
    }
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// SharedNotifications
// ---------------------------------------------------------------------------

/// Thread-safe handle to the single notification slot.
///
/// This is the only piece of cross-component mutable state in the crate.
pub type SharedNotifications = Arc<Mutex<NotificationChannel>>;

/// Construct a new [`SharedNotifications`] with the default TTL.
pub fn new_shared_notifications() -> SharedNotifications {
    Arc::new(Mutex::new(NotificationChannel::new()))
}

/// Post through a shared handle, tolerating a poisoned lock.
pub fn post(notify: &SharedNotifications, notification: Notification) {
    if let Ok(mut channel) = notify.lock() {
        channel.post(notification);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
