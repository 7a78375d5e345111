//! Runtime configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Export (burn-in) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Interval between progress samples in milliseconds
    pub progress_interval_ms: u64,

    /// libx264 constant rate factor
    pub crf: u8,

    /// libx264 preset
    pub preset: String,

    /// Bitrate in bps for encoders that don't support CRF
    pub fallback_bitrate: usize,

    /// Frame rate assumed when the source stream reports none
    pub default_frame_rate: u32,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            progress_interval_ms: 100,
            crf: 17,
            preset: "slow".to_string(),
            fallback_bitrate: 8_000_000,
            default_frame_rate: 30,
        }
    }
}

impl ExportConfig {
    /// Progress sampling interval as a `Duration`
    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms.max(1))
    }
}

/// Font lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontConfig {
    /// Font file used for "System Default" and whenever a family can't be found
    pub default_font: Option<PathBuf>,

    /// Bold font file paired with `default_font`
    pub default_bold_font: Option<PathBuf>,

    /// Directories searched (recursively) for `<family>.ttf` style files
    pub search_dirs: Vec<PathBuf>,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            default_font: None,
            default_bold_font: None,
            search_dirs: vec![
                PathBuf::from("/usr/share/fonts"),
                PathBuf::from("/usr/local/share/fonts"),
                PathBuf::from("/System/Library/Fonts"),
                PathBuf::from("/Library/Fonts"),
                PathBuf::from("C:\\Windows\\Fonts"),
            ],
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Export configuration
    pub export: ExportConfig,

    /// Font configuration
    pub fonts: FontConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file(&self, path: &str) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.export.progress_interval_ms, 100);
        assert_eq!(config.export.default_frame_rate, 30);
        assert_eq!(config.logging.level, "info");
        assert!(!config.fonts.search_dirs.is_empty());
    }

    #[test]
    fn test_progress_interval_never_zero() {
        let export = ExportConfig {
            progress_interval_ms: 0,
            ..Default::default()
        };
        assert_eq!(export.progress_interval(), Duration::from_millis(1));
    }

    #[test]
    fn test_to_file_and_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.toml");
        let path = path.to_str().unwrap();

        let mut config = AppConfig::default();
        config.export.crf = 20;
        config.to_file(path).unwrap();

        let loaded = AppConfig::from_file(path).unwrap();
        assert_eq!(loaded.export.crf, 20);
        assert_eq!(loaded.export.preset, "slow");
    }
}
