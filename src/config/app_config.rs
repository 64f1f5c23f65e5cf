use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "quote-along.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub settings_path: PathBuf,
    pub score_server_url: Option<String>,
    pub nickname: Option<String>,
    pub verbose: bool,
    pub log_file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            settings_path: PathBuf::from("settings.json"),
            score_server_url: None,
            nickname: None,
            verbose: false,
            log_file: None,
        }
    }
}

impl AppConfig {
    /// Read the config at `path`, falling back to defaults when there is no file.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write config {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.settings_path, PathBuf::from("settings.json"));
        assert!(config.score_server_url.is_none());
        assert!(config.nickname.is_none());
        assert!(!config.verbose);
        assert!(config.log_file.is_none());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config: AppConfig = serde_json::from_str(r#"{"nickname": "ada"}"#).unwrap();
        assert_eq!(config.nickname.as_deref(), Some("ada"));
        assert_eq!(config.settings_path, PathBuf::from("settings.json"));
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("quote-along.json");

        let config = AppConfig {
            settings_path: PathBuf::from("clips/intro.json"),
            score_server_url: Some("http://localhost:8080".to_string()),
            nickname: Some("Player1".to_string()),
            verbose: true,
            log_file: Some(PathBuf::from("run.log")),
        };

        config.save_to(&file_path).unwrap();
        let loaded = AppConfig::load_from(&file_path).unwrap();

        assert_eq!(config, loaded);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("absent.json");

        let config = AppConfig::load_from(&file_path).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_invalid_json_fails() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("broken.json");
        fs::write(&file_path, "not json").unwrap();

        assert!(AppConfig::load_from(&file_path).is_err());
    }
}
