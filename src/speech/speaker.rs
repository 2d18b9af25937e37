//! Text-to-speech front door.
//!
//! [`Speaker`] owns the engine, the cached voice catalog, and the
//! cancel-before-speak discipline: at most one utterance is ever in flight,
//! and a `speak()` on an unsupported host degrades to a warning notification
//! instead of an error.

use crate::config::SpeechConfig;
use crate::notify::{self, Notification, NotificationKind, SharedNotifications};
use crate::speech::engine::{SpeechEngine, SpeechError, Utterance, Voice};
use crate::speech::select::{select_voice, EngineFamily, VoiceTable};

// ---------------------------------------------------------------------------
// Speaker
// ---------------------------------------------------------------------------

/// Fire-and-forget speech requests over an injected [`SpeechEngine`].
pub struct Speaker {
    engine: Box<dyn SpeechEngine>,
    family: EngineFamily,
    table: VoiceTable,
    voices: Vec<Voice>,
    volume: f32,
    voice_override: Option<String>,
    notify: SharedNotifications,
}

impl Speaker {
    pub fn new(
        engine: Box<dyn SpeechEngine>,
        config: &SpeechConfig,
        notify: SharedNotifications,
    ) -> Self {
        let family = EngineFamily::classify(engine.fingerprint());
        log::debug!(
            "speech: engine '{}' classified as {:?}",
            engine.fingerprint(),
            family
        );
        Self {
            engine,
            family,
            table: VoiceTable::default(),
            voices: Vec::new(),
            volume: config.volume,
            voice_override: config.voice_override.clone(),
            notify,
        }
    }

    /// (Re)load the voice catalog.  Call once at startup and again whenever
    /// the engine signals a catalog change.
    pub async fn refresh_voices(&mut self) {
        self.voices = self.engine.load_voices().await;
        log::debug!("speech: catalog refreshed, {} voices", self.voices.len());
    }

    /// Speak `text`, canceling any utterance already in flight.
    ///
    /// Never returns an error: an unsupported host posts a non-persistent
    /// warning, engine failures are logged and absorbed.
    pub fn speak(&mut self, text: &str) {
        if !self.engine.is_supported() {
            log::warn!("speech: synthesis not supported on this host");
            notify::post(
                &self.notify,
                Notification::warning(
                    NotificationKind::SynthesisUnsupported,
                    "Read-aloud is not available on this device.",
                ),
            );
            return;
        }

        self.engine.cancel();

        // The catalog may not have loaded yet; fall back to whatever the
        // engine can produce synchronously.
        if self.voices.is_empty() {
            let snapshot = self.engine.voice_snapshot();
            if !snapshot.is_empty() {
                self.voices = snapshot;
            }
        }

        let voice = self.pick_voice().cloned();
        let prefs = self.table.preferences(self.family);
        let utterance = Utterance {
            text: text.to_string(),
            voice,
            rate: prefs.rate,
            pitch: prefs.pitch,
            volume: self.volume,
        };

        match self.engine.speak(&utterance) {
            Ok(()) => log::debug!("speech: speaking {} chars", text.len()),
            Err(SpeechError::Unsupported) => {
                notify::post(
                    &self.notify,
                    Notification::warning(
                        NotificationKind::SynthesisUnsupported,
                        "Read-aloud is not available on this device.",
                    ),
                );
            }
            Err(e) => log::warn!("speech: utterance failed ({e})"),
        }
    }

    /// Cancel the current utterance, if any.
    pub fn stop(&mut self) {
        self.engine.cancel();
    }

    /// `true` while an utterance is audible.
    pub fn is_speaking(&mut self) -> bool {
        self.engine.is_speaking()
    }

    fn pick_voice(&self) -> Option<&Voice> {
        if let Some(wanted) = &self.voice_override {
            let wanted = wanted.to_ascii_lowercase();
            if let Some(voice) = self
                .voices
                .iter()
                .find(|v| v.name.to_ascii_lowercase().contains(&wanted))
            {
                return Some(voice);
            }
            log::warn!("speech: configured voice '{wanted}' not in catalog, using heuristic");
        }
        select_voice(&self.table, self.family, &self.voices)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
