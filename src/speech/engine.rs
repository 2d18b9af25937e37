//! Speech synthesis engine abstraction.
//!
//! [`SpeechEngine`] hides the platform's synthesizer behind an injectable
//! trait so the [`Speaker`](crate::speech::Speaker) can be driven with a
//! deterministic fake in tests.  [`EspeakEngine`] is the shipped
//! implementation, wrapping the `espeak-ng` command-line synthesizer.

use std::process::{Child, Command, Stdio};

use async_trait::async_trait;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Voice / Utterance
// ---------------------------------------------------------------------------

/// One entry of the engine's voice catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voice {
    /// Engine-specific identifier passed back when speaking.
    pub id: String,
    /// Human-readable name, used for preference matching.
    pub name: String,
    /// BCP-47-style language tag, e.g. `en-US`.
    pub language: String,
}

impl Voice {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            language: language.into(),
        }
    }

    /// `true` for any English language tag (`en`, `en-US`, `en_GB`, …).
    pub fn is_english(&self) -> bool {
        let lang = self.language.to_ascii_lowercase();
        lang == "en" || lang.starts_with("en-") || lang.starts_with("en_")
    }
}

/// One request to vocalize a string with specific voice parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// `None` falls through to the platform default voice.
    pub voice: Option<Voice>,
    /// Speaking rate relative to the engine's normal speed (1.0 = normal).
    pub rate: f32,
    /// Pitch multiplier (1.0 = normal).
    pub pitch: f32,
    /// Output volume in `[0.0, 1.0]`.
    pub volume: f32,
}

// ---------------------------------------------------------------------------
// SpeechError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SpeechError {
    /// The host offers no synthesis capability at all.
    #[error("speech synthesis is not available on this system")]
    Unsupported,

    #[error("speech engine failed: {0}")]
    Engine(String),

    #[error("could not run synthesizer: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// SpeechEngine
// ---------------------------------------------------------------------------

/// Injectable synthesizer backend.
///
/// Engines are `!Send` by design; everything runs on the coordinator thread.
#[async_trait(?Send)]
pub trait SpeechEngine {
    /// Capability/identity fingerprint, e.g. `"espeak-ng 1.51"`.  Used to
    /// classify the engine for voice selection.
    fn fingerprint(&self) -> &str;

    /// `false` when the host offers no synthesis capability.
    fn is_supported(&self) -> bool;

    /// Load the voice catalog.  May be slow (subprocess, IPC); call again
    /// to pick up catalog changes.
    async fn load_voices(&mut self) -> Vec<Voice>;

    /// Whatever catalog is available right now, without waiting for a load.
    fn voice_snapshot(&self) -> Vec<Voice>;

    /// Begin speaking.  Any prior utterance must already be canceled by the
    /// caller.
    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError>;

    /// Silence the current utterance, if any.  Idempotent.
    fn cancel(&mut self);

    /// `true` while an utterance is audible.
    fn is_speaking(&mut self) -> bool;
}

// ---------------------------------------------------------------------------
// EspeakEngine
// ---------------------------------------------------------------------------

/// espeak-ng normal speaking rate in words per minute.
const ESPEAK_BASE_WPM: f32 = 175.0;
/// espeak-ng pitch midpoint on its 0–99 scale.
const ESPEAK_BASE_PITCH: f32 = 50.0;

/// [`SpeechEngine`] backed by the `espeak-ng` binary.
///
/// One child process per utterance; `cancel()` kills it.
pub struct EspeakEngine {
    fingerprint: String,
    available: bool,
    catalog: Vec<Voice>,
    child: Option<Child>,
}

impl EspeakEngine {
    /// Probe for `espeak-ng` on the host.  A missing binary is not an
    /// error — the engine reports itself unsupported instead.
    pub fn new() -> Self {
        let probe = Command::new("espeak-ng")
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .output();

        match probe {
            Ok(out) if out.status.success() => {
                let version = String::from_utf8_lossy(&out.stdout);
                let fingerprint = version
                    .split_whitespace()
                    .take(2)
                    .collect::<Vec<_>>()
                    .join(" ");
                log::info!("speech: found {fingerprint}");
                Self {
                    fingerprint,
                    available: true,
                    catalog: Vec::new(),
                    child: None,
                }
            }
            _ => {
                log::warn!("speech: espeak-ng not found, synthesis unavailable");
                Self {
                    fingerprint: String::from("espeak-ng (unavailable)"),
                    available: false,
                    catalog: Vec::new(),
                    child: None,
                }
            }
        }
    }

    /// Parse `espeak-ng --voices` output.
    ///
    /// Columns: `Pty Language Age/Gender VoiceName File Other Languages`.
    fn parse_voices(listing: &str) -> Vec<Voice> {
        listing
            .lines()
            .skip(1) // header row
            .filter_map(|line| {
                let fields: Vec<&str> = line.split_whitespace().collect();
                if fields.len() < 4 {
                    return None;
                }
                let language = fields[1].to_string();
                let name = fields[3].to_string();
                Some(Voice {
                    id: language.clone(),
                    name,
                    language,
                })
            })
            .collect()
    }
}

impl Default for EspeakEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl SpeechEngine for EspeakEngine {
    fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    fn is_supported(&self) -> bool {
        self.available
    }

    async fn load_voices(&mut self) -> Vec<Voice> {
        if !self.available {
            return Vec::new();
        }

        let listing = tokio::task::spawn_blocking(|| {
            Command::new("espeak-ng")
                .arg("--voices")
                .stderr(Stdio::null())
                .output()
        })
        .await;

        match listing {
            Ok(Ok(out)) if out.status.success() => {
                self.catalog = Self::parse_voices(&String::from_utf8_lossy(&out.stdout));
                log::debug!("speech: loaded {} voices", self.catalog.len());
            }
            _ => log::warn!("speech: voice catalog load failed"),
        }
        self.catalog.clone()
    }

    fn voice_snapshot(&self) -> Vec<Voice> {
        self.catalog.clone()
    }

    fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError> {
        if !self.available {
            return Err(SpeechError::Unsupported);
        }

        let wpm = (utterance.rate * ESPEAK_BASE_WPM).round() as i32;
        let pitch = (utterance.pitch * ESPEAK_BASE_PITCH).round().clamp(0.0, 99.0) as i32;
        let amplitude = (utterance.volume * 100.0).round().clamp(0.0, 200.0) as i32;

        let mut cmd = Command::new("espeak-ng");
        cmd.arg("-s")
            .arg(wpm.to_string())
            .arg("-p")
            .arg(pitch.to_string())
            .arg("-a")
            .arg(amplitude.to_string());
        if let Some(voice) = &utterance.voice {
            cmd.arg("-v").arg(&voice.id);
        }
        cmd.arg("--").arg(&utterance.text);
        cmd.stdout(Stdio::null()).stderr(Stdio::null());

        self.child = Some(cmd.spawn()?);
        Ok(())
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                log::debug!("speech: cancel of finished utterance ({e})");
            }
            let _ = child.wait();
        }
    }

    fn is_speaking(&mut self) -> bool {
        match &mut self.child {
            Some(child) => match child.try_wait() {
                Ok(None) => true,
                _ => {
                    self.child = None;
                    false
                }
            },
            None => false,
        }
    }
}

impl Drop for EspeakEngine {
    fn drop(&mut self) {
        self.cancel();
    }
}

// ---------------------------------------------------------------------------
// MockSpeechEngine
// ---------------------------------------------------------------------------

#[cfg(test)]
pub use mock::{MockEngineState, MockSpeechEngine};

#[cfg(test)]
mod mock {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Shared observation point for a [`MockSpeechEngine`] boxed away inside
    /// a speaker.
    #[derive(Debug, Default)]
    pub struct MockEngineState {
        pub cancel_calls: AtomicUsize,
        pub spoken: Mutex<Vec<Utterance>>,
    }

    impl MockEngineState {
        pub fn cancels(&self) -> usize {
            self.cancel_calls.load(Ordering::SeqCst)
        }

        pub fn spoken(&self) -> Vec<Utterance> {
            self.spoken.lock().unwrap().clone()
        }
    }

    pub struct MockSpeechEngine {
        fingerprint: String,
        supported: bool,
        catalog: Vec<Voice>,
        loaded: bool,
        state: Arc<MockEngineState>,
    }

    impl MockSpeechEngine {
        pub fn with_voices(fingerprint: &str, catalog: Vec<Voice>) -> Self {
            Self {
                fingerprint: fingerprint.to_string(),
                supported: true,
                catalog,
                loaded: false,
                state: Arc::default(),
            }
        }

        pub fn unsupported() -> Self {
            let mut engine = Self::with_voices("none", Vec::new());
            engine.supported = false;
            engine
        }

        pub fn state(&self) -> Arc<MockEngineState> {
            Arc::clone(&self.state)
        }
    }

    #[async_trait(?Send)]
    impl SpeechEngine for MockSpeechEngine {
        fn fingerprint(&self) -> &str {
            &self.fingerprint
        }

        fn is_supported(&self) -> bool {
            self.supported
        }

        async fn load_voices(&mut self) -> Vec<Voice> {
            tokio::task::yield_now().await;
            self.loaded = true;
            self.catalog.clone()
        }

        fn voice_snapshot(&self) -> Vec<Voice> {
            self.catalog.clone()
        }

        fn speak(&mut self, utterance: &Utterance) -> Result<(), SpeechError> {
            if !self.supported {
                return Err(SpeechError::Unsupported);
            }
            self.state.spoken.lock().unwrap().push(utterance.clone());
            Ok(())
        }

        fn cancel(&mut self) {
            self.state.cancel_calls.fetch_add(1, Ordering::SeqCst);
        }

        fn is_speaking(&mut self) -> bool {
            false
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
