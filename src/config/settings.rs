//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across
//! components.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// TrimConfig
// ---------------------------------------------------------------------------

/// Settings for the silence trimmer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrimConfig {
    /// RMS threshold below which a window is considered silence (0.0 – 1.0).
    pub silence_threshold: f32,
    /// Minimum silence duration in seconds before an edge is trimmed at all.
    ///
    /// Prevents over-aggressive trimming of naturally quiet speech onsets.
    pub min_silence_secs: f32,
    /// Analysis window length in seconds.
    pub window_secs: f32,
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 0.01,
            min_silence_secs: 0.5,
            window_secs: 0.01,
        }
    }
}

// ---------------------------------------------------------------------------
// PlaybackConfig
// ---------------------------------------------------------------------------

/// Settings for playback, including the bounded wait for an artifact that is
/// still being assembled when `play` is called.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Milliseconds between artifact-availability polls.
    pub poll_interval_ms: u64,
    /// Maximum number of polls before giving up with a "nothing to play"
    /// notification.
    pub poll_max_attempts: u32,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
            poll_max_attempts: 20,
        }
    }
}

// ---------------------------------------------------------------------------
// SpeechConfig
// ---------------------------------------------------------------------------

/// Settings for speech synthesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Utterance volume (0.0 – 1.0).
    pub volume: f32,
    /// Force a specific voice by name instead of the engine-family heuristic.
    pub voice_override: Option<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            volume: 1.0,
            voice_override: None,
        }
    }
}

// ---------------------------------------------------------------------------
// NotifyConfig
// ---------------------------------------------------------------------------

/// Settings for the user notification channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Seconds before a transient notification self-dismisses.
    pub transient_ttl_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            transient_ttl_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use talkplay_audio::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Silence-trimmer settings.
    pub trim: TrimConfig,
    /// Playback / artifact-wait settings.
    pub playback: PlaybackConfig,
    /// Speech-synthesis settings.
    pub speech: SpeechConfig,
    /// Notification channel settings.
    pub notify: NotifyConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
