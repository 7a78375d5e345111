//! Configuration file support
//!
//! Loads the host configuration from TOML files. Every section is optional so
//! a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::{AppConfig, ExportConfig, FontConfig, LoggingConfig};

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Export settings
    pub export: Option<ExportSettings>,
    /// Font settings
    pub fonts: Option<FontSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSettings {
    /// Progress sampling interval in milliseconds
    pub progress_interval_ms: Option<u64>,
    /// libx264 constant rate factor
    pub crf: Option<u8>,
    /// libx264 preset
    pub preset: Option<String>,
    /// Bitrate for non-CRF encoders
    pub fallback_bitrate: Option<usize>,
    /// Frame rate when the source reports none
    pub default_frame_rate: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FontSettings {
    /// Default regular font file
    pub default_font: Option<PathBuf>,
    /// Default bold font file
    pub default_bold_font: Option<PathBuf>,
    /// Font search directories, replacing the built-in list
    pub search_dirs: Option<Vec<PathBuf>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Generate default configuration file
    pub fn default_config() -> Self {
        let export = ExportConfig::default();
        let fonts = FontConfig::default();
        Self {
            export: Some(ExportSettings {
                progress_interval_ms: Some(export.progress_interval_ms),
                crf: Some(export.crf),
                preset: Some(export.preset),
                fallback_bitrate: Some(export.fallback_bitrate),
                default_frame_rate: Some(export.default_frame_rate),
            }),
            fonts: Some(FontSettings {
                default_font: None,
                default_bold_font: None,
                search_dirs: Some(fonts.search_dirs),
            }),
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                format: Some("pretty".to_string()),
            }),
        }
    }

    /// Convert to AppConfig
    pub fn into_app_config(self) -> AppConfig {
        let export_defaults = ExportConfig::default();
        let export = match self.export {
            Some(e) => ExportConfig {
                progress_interval_ms: e
                    .progress_interval_ms
                    .unwrap_or(export_defaults.progress_interval_ms),
                crf: e.crf.unwrap_or(export_defaults.crf),
                preset: e.preset.unwrap_or(export_defaults.preset),
                fallback_bitrate: e
                    .fallback_bitrate
                    .unwrap_or(export_defaults.fallback_bitrate),
                default_frame_rate: e
                    .default_frame_rate
                    .unwrap_or(export_defaults.default_frame_rate),
            },
            None => export_defaults,
        };

        let fonts = match self.fonts {
            Some(f) => FontConfig {
                default_font: f.default_font,
                default_bold_font: f.default_bold_font,
                search_dirs: f
                    .search_dirs
                    .unwrap_or_else(|| FontConfig::default().search_dirs),
            },
            None => FontConfig::default(),
        };

        let logging = self
            .logging
            .map(|l| LoggingConfig {
                json: l.format.as_deref() == Some("json"),
                level: l.level,
            })
            .unwrap_or_default();

        AppConfig {
            export,
            fonts,
            logging,
        }
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}
