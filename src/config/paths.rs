//! Cross-platform application paths using the `dirs` crate.
//!
//! Layout:
//!
//! Config dir (settings):
//!   Windows: %APPDATA%\talkplay\
//!   macOS:   ~/Library/Application Support/talkplay/
//!   Linux:   ~/.config/talkplay/
//!
//! Data dir (saved recordings exported by the demo binary):
//!   Windows: %LOCALAPPDATA%\talkplay\
//!   macOS:   ~/Library/Application Support/talkplay/
//!   Linux:   ~/.local/share/talkplay/

use std::path::PathBuf;

/// Holds all resolved application directory/file paths.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Directory for `settings.toml`.
    pub config_dir: PathBuf,
    /// Full path to `settings.toml`.
    pub settings_file: PathBuf,
    /// Directory where the demo binary saves exported recordings.
    pub recordings_dir: PathBuf,
}

impl AppPaths {
    const APP_NAME: &'static str = "talkplay";

    /// Resolves all paths using the `dirs` crate.
    ///
    /// Falls back to the current directory if the platform cannot provide a
    /// standard path (should be extremely rare in practice).
    pub fn new() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(Self::APP_NAME);

        let settings_file = config_dir.join("settings.toml");
        let recordings_dir = data_dir.join("recordings");

        Self {
            config_dir,
            settings_file,
            recordings_dir,
        }
    }
}

impl Default for AppPaths {
    fn default() -> Self {
        Self::new()
    }
}
