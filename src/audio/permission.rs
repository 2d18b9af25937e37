//! Microphone-permission tracking and denial classification.
//!
//! [`PermissionGate`] sits between the capture session and the device: it
//! remembers a successful grant, detects when a granted track has since
//! ended (device unplugged, reclaimed by the OS) and re-requests access, and
//! turns every failure into a **persistent** user notification.  Persistent,
//! because a missing or denied microphone blocks the recording feature
//! entirely and needs explicit acknowledgment.

use crate::audio::device::{AudioCaptureDevice, CaptureError};
use crate::notify::{self, Notification, NotificationKind, SharedNotifications};

// ---------------------------------------------------------------------------
// PermissionGate
// ---------------------------------------------------------------------------

/// Requests and tracks microphone-capture authorization.
pub struct PermissionGate {
    granted: bool,
    notify: SharedNotifications,
}

impl PermissionGate {
    pub fn new(notify: SharedNotifications) -> Self {
        Self {
            granted: false,
            notify,
        }
    }

    /// `true` after the most recent request succeeded.
    pub fn granted(&self) -> bool {
        self.granted
    }

    /// Ensure the device is authorized and usable.
    ///
    /// Fast path: a previous grant whose track is still live is reused
    /// without touching the platform.  A grant whose track has ended is
    /// treated as not-yet-granted and re-requested.
    ///
    /// On failure the gate posts a persistent notification classified from
    /// the platform error and returns `false`; callers fail silently.
    pub async fn ensure_access(&mut self, device: &mut dyn AudioCaptureDevice) -> bool {
        if self.granted {
            if device.is_live() {
                return true;
            }
            log::info!(
                "permission: track on '{}' has ended, re-requesting access",
                device.name()
            );
            self.granted = false;
        }

        match device.request_access().await {
            Ok(()) => {
                self.granted = true;
                true
            }
            Err(e) => {
                log::warn!("permission: access request failed: {e}");
                self.granted = false;
                notify::post(&self.notify, classify(&e));
                false
            }
        }
    }
}

/// Map a capture error onto the persistent notification shown to the user.
pub(crate) fn classify(error: &CaptureError) -> Notification {
    match error {
        CaptureError::PermissionDenied => Notification::persistent(
            NotificationKind::Permission,
            "Microphone access was denied. Enable microphone permissions for \
             this app and try again.",
        ),
        CaptureError::NoDevice => Notification::persistent(
            NotificationKind::NoDevice,
            "No microphone was found. Make sure one is plugged in and try again.",
        ),
        CaptureError::Device(_) => Notification::persistent(
            NotificationKind::DeviceError,
            "The microphone could not be started. Try unplugging it and \
             plugging it back in.",
        ),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::device::MockCaptureDevice;
    use crate::notify::new_shared_notifications;

    fn current_kind(shared: &SharedNotifications) -> Option<NotificationKind> {
        shared.lock().unwrap().current().map(|n| n.kind)
    }

    #[tokio::test]
    async fn grant_sets_granted_and_posts_nothing() {
        let shared = new_shared_notifications();
        let mut gate = PermissionGate::new(shared.clone());
        let mut device = MockCaptureDevice::granted(Vec::new());

        assert!(gate.ensure_access(&mut device).await);
        assert!(gate.granted());
        assert!(current_kind(&shared).is_none());
    }

    #[tokio::test]
    async fn denied_posts_persistent_permission_notification() {
        let shared = new_shared_notifications();
        let mut gate = PermissionGate::new(shared.clone());
        let mut device = MockCaptureDevice::failing(CaptureError::PermissionDenied);

        assert!(!gate.ensure_access(&mut device).await);
        assert!(!gate.granted());

        let mut channel = shared.lock().unwrap();
        let n = channel.current().expect("notification");
        assert_eq!(n.kind, NotificationKind::Permission);
        assert!(n.persistent);
    }

    #[tokio::test]
    async fn no_device_posts_no_device_notification() {
        let shared = new_shared_notifications();
        let mut gate = PermissionGate::new(shared.clone());
        let mut device = MockCaptureDevice::failing(CaptureError::NoDevice);

        assert!(!gate.ensure_access(&mut device).await);
        assert_eq!(current_kind(&shared), Some(NotificationKind::NoDevice));
    }

    #[tokio::test]
    async fn other_error_posts_device_error_notification() {
        let shared = new_shared_notifications();
        let mut gate = PermissionGate::new(shared.clone());
        let mut device = MockCaptureDevice::failing(CaptureError::Device("boom".into()));

        assert!(!gate.ensure_access(&mut device).await);
        assert_eq!(current_kind(&shared), Some(NotificationKind::DeviceError));
    }

    #[tokio::test]
    async fn grant_is_reused_while_track_is_live() {
        let shared = new_shared_notifications();
        let mut gate = PermissionGate::new(shared);
        let mut device = MockCaptureDevice::granted(Vec::new());

        let counters = device.counters();

        assert!(gate.ensure_access(&mut device).await);
        assert!(gate.ensure_access(&mut device).await);
        // Second call hit the fast path — only one platform request.
        assert_eq!(
            counters
                .access_requests
                .load(std::sync::atomic::Ordering::SeqCst),
            1
        );
    }

    #[tokio::test]
    async fn ended_track_triggers_re_request() {
        let shared = new_shared_notifications();
        let mut gate = PermissionGate::new(shared);
        let mut device = MockCaptureDevice::granted(Vec::new());
        let counters = device.counters();

        assert!(gate.ensure_access(&mut device).await);
        device.set_live(false); // device unplugged

        assert!(gate.ensure_access(&mut device).await);
        assert_eq!(
            counters
                .access_requests
                .load(std::sync::atomic::Ordering::SeqCst),
            2
        );
    }
}
