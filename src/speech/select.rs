//! Engine-aware voice selection.
//!
//! Picking a pleasant voice is a heuristic over engine-specific catalog
//! names, so the preference data lives in a [`VoiceTable`] keyed by a coarse
//! [`EngineFamily`] classification rather than being scattered through the
//! selection logic.  Extending support for a new engine means adding a table
//! row, not touching [`select_voice`].
//!
//! Selection tiers, first hit wins:
//!
//! 1. English-tagged voice whose name contains a preferred substring
//!    (case-insensitive, in preference order);
//! 2. any English-tagged voice;
//! 3. the first catalog entry;
//! 4. none — the engine's default voice applies.

use crate::speech::engine::Voice;

// ---------------------------------------------------------------------------
// EngineFamily
// ---------------------------------------------------------------------------

/// Coarse classification of the synthesis engine, derived from its
/// capability fingerprint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineFamily {
    /// espeak-ng and relatives.
    Espeak,
    /// macOS `say` / AVSpeechSynthesizer.
    MacSay,
    /// Windows SAPI.
    Sapi,
    /// Anything unrecognized.
    Generic,
}

impl EngineFamily {
    /// Classify an engine fingerprint by case-insensitive substring match.
    pub fn classify(fingerprint: &str) -> Self {
        let fp = fingerprint.to_ascii_lowercase();
        if fp.contains("espeak") {
            Self::Espeak
        } else if fp.contains("say") || fp.contains("avspeech") {
            Self::MacSay
        } else if fp.contains("sapi") {
            Self::Sapi
        } else {
            Self::Generic
        }
    }
}

// ---------------------------------------------------------------------------
// VoicePreferences / VoiceTable
// ---------------------------------------------------------------------------

/// Preference row for one engine family.
#[derive(Debug, Clone)]
pub struct VoicePreferences {
    /// Voice-name substrings in preference order, matched case-insensitively.
    pub name_substrings: Vec<String>,
    /// Speaking rate relative to normal.
    pub rate: f32,
    /// Pitch multiplier.
    pub pitch: f32,
}

impl VoicePreferences {
    fn new(substrings: &[&str], rate: f32, pitch: f32) -> Self {
        Self {
            name_substrings: substrings.iter().map(|s| s.to_string()).collect(),
            rate,
            pitch,
        }
    }
}

/// Per-family preference table.
///
/// The defaults favor warm female voices at a slightly slow, slightly high
/// delivery that suits read-aloud for young listeners.
#[derive(Debug, Clone)]
pub struct VoiceTable {
    espeak: VoicePreferences,
    mac_say: VoicePreferences,
    sapi: VoicePreferences,
    generic: VoicePreferences,
}

impl VoiceTable {
    /// Preferences for `family`.
    pub fn preferences(&self, family: EngineFamily) -> &VoicePreferences {
        match family {
            EngineFamily::Espeak => &self.espeak,
            EngineFamily::MacSay => &self.mac_say,
            EngineFamily::Sapi => &self.sapi,
            EngineFamily::Generic => &self.generic,
        }
    }
}

impl Default for VoiceTable {
    fn default() -> Self {
        Self {
            espeak: VoicePreferences::new(&["female", "en-us", "en-gb"], 0.8, 1.1),
            mac_say: VoicePreferences::new(&["samantha", "female"], 0.8, 1.1),
            sapi: VoicePreferences::new(&["zira", "female"], 0.8, 1.1),
            generic: VoicePreferences::new(&["female", "samantha", "zira"], 0.8, 1.1),
        }
    }
}

// ---------------------------------------------------------------------------
// select_voice
// ---------------------------------------------------------------------------

/// Pick a voice from `catalog` for `family` using `table`.
pub fn select_voice<'a>(
    table: &VoiceTable,
    family: EngineFamily,
    catalog: &'a [Voice],
) -> Option<&'a Voice> {
    let prefs = table.preferences(family);

    for substring in &prefs.name_substrings {
        let wanted = substring.to_ascii_lowercase();
        if let Some(voice) = catalog
            .iter()
            .find(|v| v.is_english() && v.name.to_ascii_lowercase().contains(&wanted))
        {
            return Some(voice);
        }
    }

    catalog
        .iter()
        .find(|v| v.is_english())
        .or_else(|| catalog.first())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
