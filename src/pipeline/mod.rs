//! Recording pipeline orchestration — capture → decode → trim → encode →
//! publish.
//!
//! [`RecordingPipeline`] composes the capture session with the trimmer and
//! encoder and owns the session's [`ArtifactSlot`].  Every successful
//! stop produces one [`AudioArtifact`](crate::audio::AudioArtifact),
//! superseding the previous one.
//!
//! Decode failures are recoverable: the pipeline publishes the **untrimmed**
//! blob (it is a playable container in its own right) and posts a transient
//! "trim failed" notification.

use crate::audio::device::AudioCaptureDevice;
use crate::audio::encode::{encode_wav_pcm16, ArtifactHandle, ArtifactSlot};
use crate::audio::pcm::decode_wav;
use crate::audio::session::{CaptureSession, RecordedBlob, RecordingState, StopSignal};
use crate::audio::trim::SilenceTrimmer;
use crate::config::AppConfig;
use crate::notify::{self, Notification, NotificationKind, SharedNotifications};

// ---------------------------------------------------------------------------
// RecordingPipeline
// ---------------------------------------------------------------------------

/// Drives one microphone's record → trim → encode cycle.
///
/// ```rust,no_run
/// use talkplay_audio::audio::CpalCaptureDevice;
/// use talkplay_audio::config::AppConfig;
/// use talkplay_audio::notify::new_shared_notifications;
/// use talkplay_audio::pipeline::RecordingPipeline;
///
/// # async fn example() {
/// let config = AppConfig::default();
/// let notify = new_shared_notifications();
/// let device = Box::new(CpalCaptureDevice::new());
/// let mut pipeline = RecordingPipeline::new(device, &config, notify);
///
/// pipeline.start_recording().await;
/// // … user speaks …
/// pipeline.stop_recording().await;
/// assert!(pipeline.has_recording() || !pipeline.has_recording());
/// # }
/// ```
pub struct RecordingPipeline {
    session: CaptureSession,
    trimmer: SilenceTrimmer,
    slot: ArtifactSlot,
    notify: SharedNotifications,
}

impl RecordingPipeline {
    pub fn new(
        device: Box<dyn AudioCaptureDevice>,
        config: &AppConfig,
        notify: SharedNotifications,
    ) -> Self {
        Self {
            session: CaptureSession::new(device, notify.clone()),
            trimmer: SilenceTrimmer::new(&config.trim),
            slot: ArtifactSlot::new(),
            notify,
        }
    }

    /// Current capture state.
    pub fn state(&self) -> RecordingState {
        self.session.state()
    }

    /// Clone of the slot the playback side polls.
    pub fn artifacts(&self) -> ArtifactSlot {
        self.slot.clone()
    }

    /// Out-of-band stop signal (usable while permission is pending).
    pub fn stop_signal(&self) -> StopSignal {
        self.session.stop_signal()
    }

    /// `true` once at least one artifact has been produced.
    pub fn has_recording(&self) -> bool {
        self.slot.has_artifact()
    }

    /// Begin recording.  Idempotent; permission failures surface through the
    /// notification channel only.
    pub async fn start_recording(&mut self) {
        self.session.start().await;
    }

    /// Stop recording and run the blob through trim + encode.
    ///
    /// Returns the handle of the freshly published artifact, or `None` when
    /// there was nothing to stop.
    pub async fn stop_recording(&mut self) -> Option<ArtifactHandle> {
        let blob = self.session.stop().await?;
        Some(self.finish_blob(blob))
    }

    /// Decode → trim → encode → publish, with graceful fallbacks.
    fn finish_blob(&mut self, blob: RecordedBlob) -> ArtifactHandle {
        match decode_wav(&blob.bytes) {
            Ok(pcm) => {
                let trimmed = self.trimmer.trim(&pcm);
                match encode_wav_pcm16(&trimmed) {
                    Ok(bytes) => self.slot.publish(bytes),
                    Err(e) => {
                        log::warn!("pipeline: encode failed ({e}), publishing untrimmed blob");
                        self.slot.publish(blob.bytes)
                    }
                }
            }
            Err(e) => {
                log::warn!("pipeline: decode failed ({e}), publishing untrimmed blob");
                notify::post(
                    &self.notify,
                    Notification::transient(
                        NotificationKind::TrimFailed,
                        "Something went wrong while cleaning up the recording; \
                         keeping it as-is.",
                    ),
                );
                self.slot.publish(blob.bytes)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::device::{AudioChunk, MockCaptureDevice};
    use crate::notify::new_shared_notifications;

    const RATE: u32 = 16_000;

    fn chunk(samples: Vec<f32>) -> AudioChunk {
        AudioChunk {
            samples,
            sample_rate: RATE,
            channels: 1,
        }
    }

    /// 1 s silence, 0.5 s speech, 1 s silence — as one chunk sequence.
    fn speech_chunks() -> Vec<AudioChunk> {
        vec![
            chunk(vec![0.0_f32; RATE as usize]),
            chunk(vec![0.5_f32; RATE as usize / 2]),
            chunk(vec![0.0_f32; RATE as usize]),
        ]
    }

    fn pipeline_with(chunks: Vec<AudioChunk>) -> (RecordingPipeline, SharedNotifications) {
        let notify = new_shared_notifications();
        let device = Box::new(MockCaptureDevice::granted(chunks));
        let pipeline = RecordingPipeline::new(device, &AppConfig::default(), notify.clone());
        (pipeline, notify)
    }

    #[tokio::test]
    async fn full_cycle_publishes_trimmed_artifact() {
        let (mut pipeline, _notify) = pipeline_with(speech_chunks());

        pipeline.start_recording().await;
        let handle = pipeline.stop_recording().await.expect("artifact");
        assert!(pipeline.has_recording());

        let artifact = pipeline.artifacts().current().expect("slot filled");
        assert_eq!(artifact.handle, handle);

        // The published container holds only the 0.5 s of speech.
        let pcm = decode_wav(&artifact.bytes).expect("decode");
        assert_eq!(pcm.len(), RATE as usize / 2);
        assert_eq!(pcm.sample_rate, RATE);
    }

    #[tokio::test]
    async fn stop_without_start_produces_nothing() {
        let (mut pipeline, _notify) = pipeline_with(Vec::new());
        assert!(pipeline.stop_recording().await.is_none());
        assert!(!pipeline.has_recording());
    }

    #[tokio::test]
    async fn second_recording_supersedes_first() {
        let (mut pipeline, _notify) = pipeline_with(speech_chunks());

        pipeline.start_recording().await;
        let first = pipeline.stop_recording().await.expect("first");

        // The mock has no chunks left; a second cycle still publishes (an
        // empty recording) and releases the first handle.
        pipeline.start_recording().await;
        let second = pipeline.stop_recording().await.expect("second");

        assert_ne!(first, second);
        let current = pipeline.artifacts().current().expect("current");
        assert_eq!(current.handle, second);
    }

    #[tokio::test]
    async fn undecodable_blob_falls_back_untrimmed_with_notification() {
        let (mut pipeline, notify) = pipeline_with(Vec::new());

        let garbage = RecordedBlob {
            bytes: b"not a container".to_vec(),
        };
        pipeline.finish_blob(garbage);

        // Fallback artifact carries the raw bytes.
        let artifact = pipeline.artifacts().current().expect("artifact");
        assert_eq!(&artifact.bytes[..], b"not a container");

        let mut channel = notify.lock().unwrap();
        let n = channel.current().expect("notification");
        assert_eq!(n.kind, NotificationKind::TrimFailed);
        assert!(!n.persistent);
    }

    #[tokio::test]
    async fn denied_permission_leaves_no_artifact() {
        let notify = new_shared_notifications();
        let device = Box::new(MockCaptureDevice::failing(
            crate::audio::CaptureError::PermissionDenied,
        ));
        let mut pipeline = RecordingPipeline::new(device, &AppConfig::default(), notify);

        pipeline.start_recording().await;
        assert_eq!(pipeline.state(), RecordingState::Idle);
        assert!(pipeline.stop_recording().await.is_none());
        assert!(!pipeline.has_recording());
    }
}
