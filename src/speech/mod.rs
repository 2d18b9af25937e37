//! Text-to-speech: engine abstraction, voice selection, and the speaker.
//!
//! ```text
//! Speaker ── cancel-before-speak ──► SpeechEngine (espeak-ng / mock)
//!    │
//!    └─ select_voice(VoiceTable, EngineFamily, catalog)
//! ```

pub mod engine;
pub mod select;
pub mod speaker;

pub use engine::{EspeakEngine, SpeechEngine, SpeechError, Utterance, Voice};
pub use select::{select_voice, EngineFamily, VoicePreferences, VoiceTable};
pub use speaker::Speaker;

#[cfg(test)]
pub use engine::MockSpeechEngine;
