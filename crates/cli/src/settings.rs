use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use focustrack_core::shared::constants::DEFAULT_REFRESH_HZ;

/// Persistent CLI defaults. Command-line flags take precedence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub input_format: Option<String>,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub participant_id: Option<String>,
    #[serde(default = "default_refresh_hz")]
    pub refresh_hz: u32,
}

fn default_refresh_hz() -> u32 {
    DEFAULT_REFRESH_HZ
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            device: None,
            input_format: None,
            endpoint: None,
            api_key: None,
            participant_id: None,
            refresh_hz: default_refresh_hz(),
        }
    }
}

impl Settings {
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("FocusTrack").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .map(|path| Self::load_from(&path))
            .unwrap_or_default()
    }

    /// Missing or unreadable files yield the defaults.
    pub fn load_from(path: &Path) -> Self {
        fs::read_to_string(path)
            .ok()
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let path = Self::config_path().ok_or("could not determine config directory")?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("settings.json"));
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.refresh_hz, 60);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("FocusTrack").join("settings.json");
        let settings = Settings {
            endpoint: Some("https://db.example.com".into()),
            api_key: Some("anon".into()),
            participant_id: Some("p-1".into()),
            refresh_hz: 30,
            ..Settings::default()
        };
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path), settings);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{"device": "/dev/video2"}"#).unwrap();

        let settings = Settings::load_from(&path);
        assert_eq!(settings.device.as_deref(), Some("/dev/video2"));
        assert_eq!(settings.refresh_hz, 60);
        assert!(settings.endpoint.is_none());
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();
        assert_eq!(Settings::load_from(&path), Settings::default());
    }
}
