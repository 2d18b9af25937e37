//! Exclusive single-session artifact playback.
//!
//! [`PlaybackController`] arbitrates access to the audio output: at most one
//! [`PlaybackSession`] exists at a time, and starting a new one forcibly
//! stops its predecessor.  The controller reads the recording pipeline's
//! [`ArtifactSlot`]; when `play()` races a recording that has not finished
//! producing its artifact, it polls the slot on a bounded schedule before
//! giving up with a "nothing to play" notification.
//!
//! The output device sits behind [`AudioPlayer`] so the arbitration logic is
//! testable without an audio stack; [`RodioPlayer`] is the real
//! implementation.

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use thiserror::Error;

use crate::audio::encode::{ArtifactHandle, ArtifactSlot, AudioArtifact};
use crate::config::PlaybackConfig;
use crate::notify::{self, Notification, NotificationKind, SharedNotifications};

// ---------------------------------------------------------------------------
// PlaybackError
// ---------------------------------------------------------------------------

/// The platform audio output rejected the artifact.
///
/// Never fatal: the active session is destroyed and a transient notification
/// is posted, leaving the controller ready for the next `play()`.
#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("could not open audio output: {0}")]
    Output(#[from] rodio::StreamError),

    #[error("could not start playback: {0}")]
    Sink(#[from] rodio::PlayError),

    #[error("could not decode artifact: {0}")]
    Decode(#[from] rodio::decoder::DecoderError),
}

// ---------------------------------------------------------------------------
// AudioPlayer
// ---------------------------------------------------------------------------

/// Platform audio output.
///
/// Implementations are driven from the single-threaded coordinator and may
/// hold `!Send` platform handles.  `stop()` must halt output synchronously
/// from the caller's perspective.
pub trait AudioPlayer {
    /// Begin playing `artifact` from the start.
    fn play(&mut self, artifact: &AudioArtifact) -> Result<(), PlaybackError>;

    /// Halt output immediately.  Idempotent.
    fn stop(&mut self);

    /// `true` while audio is still being emitted.
    fn is_playing(&self) -> bool;
}

// ---------------------------------------------------------------------------
// RodioPlayer
// ---------------------------------------------------------------------------

/// [`AudioPlayer`] backed by a rodio output stream.
///
/// The output stream is opened lazily on first play and kept for the life of
/// the player; each `play()` replaces the sink.
pub struct RodioPlayer {
    stream: Option<(OutputStream, OutputStreamHandle)>,
    sink: Option<Sink>,
}

impl RodioPlayer {
    pub fn new() -> Self {
        Self {
            stream: None,
            sink: None,
        }
    }

    fn handle(&mut self) -> Result<&OutputStreamHandle, PlaybackError> {
        if self.stream.is_none() {
            let (stream, handle) = OutputStream::try_default()?;
            log::debug!("playback: opened default output stream");
            self.stream = Some((stream, handle));
        }
        Ok(&self.stream.as_ref().unwrap().1)
    }
}

impl Default for RodioPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioPlayer for RodioPlayer {
    fn play(&mut self, artifact: &AudioArtifact) -> Result<(), PlaybackError> {
        self.stop();

        let source = Decoder::new_wav(Cursor::new(Arc::clone(&artifact.bytes)))?;
        let sink = Sink::try_new(self.handle()?)?;
        sink.append(source);
        self.sink = Some(sink);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
    }

    fn is_playing(&self) -> bool {
        self.sink.as_ref().is_some_and(|s| !s.empty())
    }
}

// ---------------------------------------------------------------------------
// PlaybackSession
// ---------------------------------------------------------------------------

/// One live playback of one artifact.  Destroyed on completion, error, or
/// explicit stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaybackSession {
    handle: ArtifactHandle,
}

impl PlaybackSession {
    /// Handle of the artifact being played.
    pub fn artifact(&self) -> ArtifactHandle {
        self.handle
    }
}

// ---------------------------------------------------------------------------
// PlaybackController
// ---------------------------------------------------------------------------

/// Single-slot playback arbiter over an [`ArtifactSlot`].
pub struct PlaybackController {
    player: Box<dyn AudioPlayer>,
    slot: ArtifactSlot,
    session: Option<PlaybackSession>,
    poll_interval: Duration,
    poll_max_attempts: u32,
    notify: SharedNotifications,
}

impl PlaybackController {
    pub fn new(
        player: Box<dyn AudioPlayer>,
        slot: ArtifactSlot,
        config: &PlaybackConfig,
        notify: SharedNotifications,
    ) -> Self {
        Self {
            player,
            slot,
            session: None,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            poll_max_attempts: config.poll_max_attempts,
            notify,
        }
    }

    /// Play the current artifact, stopping any session already in flight.
    ///
    /// When the slot is still empty — typically because the recording that
    /// should fill it has not finished — the controller re-checks it every
    /// poll interval up to the configured ceiling.  Returns `true` when a
    /// session was started.
    pub async fn play(&mut self) -> bool {
        let Some(artifact) = self.wait_for_artifact().await else {
            log::info!("playback: no artifact available, skipping");
            notify::post(
                &self.notify,
                Notification::transient(
                    NotificationKind::NothingToPlay,
                    "Record something first, then press play.",
                ),
            );
            return false;
        };

        if self.session.is_some() {
            log::debug!("playback: interrupting active session");
            self.stop();
        }

        match self.player.play(&artifact) {
            Ok(()) => {
                log::info!("playback: started {}", artifact.handle.uri());
                self.session = Some(PlaybackSession {
                    handle: artifact.handle,
                });
                true
            }
            Err(e) => {
                log::warn!("playback: failed to start ({e})");
                self.session = None;
                notify::post(
                    &self.notify,
                    Notification::transient(
                        NotificationKind::PlaybackError,
                        "Could not play the recording. Try recording again.",
                    ),
                );
                false
            }
        }
    }

    /// Halt playback and destroy the session.  No-op when idle.
    pub fn stop(&mut self) {
        self.player.stop();
        self.session = None;
    }

    /// `true` while a session is live.  A session whose audio has run out is
    /// destroyed here.
    pub fn is_playing(&mut self) -> bool {
        if self.session.is_some() && !self.player.is_playing() {
            log::debug!("playback: session ended");
            self.session = None;
        }
        self.session.is_some()
    }

    /// The live session, refreshed against the player first.
    pub fn session(&mut self) -> Option<PlaybackSession> {
        self.is_playing();
        self.session
    }

    async fn wait_for_artifact(&self) -> Option<AudioArtifact> {
        for attempt in 0..=self.poll_max_attempts {
            if let Some(artifact) = self.slot.current() {
                return Some(artifact);
            }
            if attempt == self.poll_max_attempts {
                break;
            }
            tokio::time::sleep(self.poll_interval).await;
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::new_shared_notifications;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockPlayerState {
        play_calls: AtomicUsize,
        stop_calls: AtomicUsize,
        playing: AtomicBool,
        last_played: Mutex<Option<ArtifactHandle>>,
    }

    struct MockPlayer {
        state: Arc<MockPlayerState>,
        fail: bool,
    }

    impl MockPlayer {
        fn working() -> (Self, Arc<MockPlayerState>) {
            let state = Arc::new(MockPlayerState::default());
            (
                Self {
                    state: Arc::clone(&state),
                    fail: false,
                },
                state,
            )
        }

        fn failing() -> (Self, Arc<MockPlayerState>) {
            let (mut player, state) = Self::working();
            player.fail = true;
            (player, state)
        }
    }

    impl AudioPlayer for MockPlayer {
        fn play(&mut self, artifact: &AudioArtifact) -> Result<(), PlaybackError> {
            self.state.play_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(rodio::PlayError::NoDevice.into());
            }
            *self.state.last_played.lock().unwrap() = Some(artifact.handle);
            self.state.playing.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&mut self) {
            self.state.stop_calls.fetch_add(1, Ordering::SeqCst);
            self.state.playing.store(false, Ordering::SeqCst);
        }

        fn is_playing(&self) -> bool {
            self.state.playing.load(Ordering::SeqCst)
        }
    }

    fn fast_config() -> PlaybackConfig {
        PlaybackConfig {
            poll_interval_ms: 1,
            poll_max_attempts: 3,
        }
    }

    fn controller(
        player: MockPlayer,
        slot: ArtifactSlot,
    ) -> (PlaybackController, SharedNotifications) {
        let notify = new_shared_notifications();
        let controller =
            PlaybackController::new(Box::new(player), slot, &fast_config(), notify.clone());
        (controller, notify)
    }

    #[tokio::test]
    async fn play_with_no_artifact_posts_nothing_to_play() {
        let (player, state) = MockPlayer::working();
        let (mut controller, notify) = controller(player, ArtifactSlot::new());

        assert!(!controller.play().await);
        assert!(!controller.is_playing());
        assert_eq!(state.play_calls.load(Ordering::SeqCst), 0);

        let mut channel = notify.lock().unwrap();
        let n = channel.current().expect("notification");
        assert_eq!(n.kind, NotificationKind::NothingToPlay);
        assert!(!n.persistent);
    }

    #[tokio::test]
    async fn play_starts_session_for_published_artifact() {
        let slot = ArtifactSlot::new();
        let handle = slot.publish(vec![1, 2, 3]);
        let (player, state) = MockPlayer::working();
        let (mut controller, _notify) = controller(player, slot);

        assert!(controller.play().await);
        assert!(controller.is_playing());
        assert_eq!(*state.last_played.lock().unwrap(), Some(handle));
        assert_eq!(controller.session().unwrap().artifact(), handle);
    }

    #[tokio::test]
    async fn play_waits_for_late_artifact() {
        let slot = ArtifactSlot::new();
        let (player, _state) = MockPlayer::working();
        let (mut controller, _notify) = controller(player, slot.clone());

        let publisher = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(2)).await;
            slot.publish(vec![7]);
        });

        assert!(controller.play().await);
        publisher.await.unwrap();
    }

    #[tokio::test]
    async fn second_play_stops_first_session() {
        let slot = ArtifactSlot::new();
        slot.publish(vec![1]);
        let (player, state) = MockPlayer::working();
        let (mut controller, _notify) = controller(player, slot);

        assert!(controller.play().await);
        assert!(controller.play().await);

        // Forced interrupt before restart, never two live sessions.
        assert_eq!(state.play_calls.load(Ordering::SeqCst), 2);
        assert_eq!(state.stop_calls.load(Ordering::SeqCst), 1);
        assert!(controller.is_playing());
    }

    #[tokio::test]
    async fn player_error_destroys_session_and_notifies() {
        let slot = ArtifactSlot::new();
        slot.publish(vec![1]);
        let (player, _state) = MockPlayer::failing();
        let (mut controller, notify) = controller(player, slot);

        assert!(!controller.play().await);
        assert!(!controller.is_playing());

        let mut channel = notify.lock().unwrap();
        let n = channel.current().expect("notification");
        assert_eq!(n.kind, NotificationKind::PlaybackError);
    }

    #[tokio::test]
    async fn ended_audio_destroys_session() {
        let slot = ArtifactSlot::new();
        slot.publish(vec![1]);
        let (player, state) = MockPlayer::working();
        let (mut controller, _notify) = controller(player, slot);

        controller.play().await;
        assert!(controller.is_playing());

        state.playing.store(false, Ordering::SeqCst);
        assert!(!controller.is_playing());
        assert!(controller.session().is_none());
    }

    #[tokio::test]
    async fn stop_is_synchronous_and_idempotent() {
        let slot = ArtifactSlot::new();
        slot.publish(vec![1]);
        let (player, state) = MockPlayer::working();
        let (mut controller, _notify) = controller(player, slot);

        controller.play().await;
        controller.stop();
        assert!(!controller.is_playing());
        controller.stop();
        assert_eq!(state.stop_calls.load(Ordering::SeqCst), 2);
    }
}
