//! Application configuration
//!
//! Everything is read from a single TOML file at startup. Missing sections fall
//! back to their defaults, and a missing file falls back to the full default
//! configuration. Nothing is written back.
//!
//! ```toml
//! [mapping]
//! turntable_mode = "axis"
//!
//! [mapping.buttons]
//! B1 = 0
//! E1 = 8
//!
//! [mapping.axes]
//! TurntableAxis = 0
//!
//! [meter]
//! count_long_releases = true
//! play_side = "2p"
//!
//! [driver]
//! frame_interval_ms = 16
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::controller::{MappingConfig, MappingError, MappingTable, ReaderSettings};
use crate::meter::MeterSettings;

const CONFIG_DIR: &str = "sevenkey-meter";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Invalid mapping: {0}")]
    Mapping(#[from] MappingError),
}

/// Frame loop and device selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverSettings {
    pub frame_interval_ms: u64,
    /// Registry id of the device to bind; the first connected one when unset
    pub preferred_device: Option<usize>,
    /// Default tracing level when `RUST_LOG` is not set
    pub log_level: String,
}

impl Default for DriverSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
            preferred_device: None,
            log_level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mapping: MappingConfig,
    pub reader: ReaderSettings,
    pub meter: MeterSettings,
    pub driver: DriverSettings,
}

impl AppConfig {
    /// `<config dir>/sevenkey-meter/config.toml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|mut path| {
            path.push(CONFIG_DIR);
            path.push(CONFIG_FILE);
            path
        })
    }

    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        // Reject bad mappings at load time rather than on first use
        config.mapping_table()?;
        Ok(config)
    }

    pub async fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config = Self::from_toml(&content, path)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Like [`AppConfig::load`], but a file that does not exist yields the defaults
    pub async fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let exists = tokio::fs::try_exists(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        if exists {
            Self::load(path).await
        } else {
            warn!(
                "Config file {} does not exist, using defaults",
                path.display()
            );
            Ok(Self::default())
        }
    }

    pub fn mapping_table(&self) -> Result<MappingTable, ConfigError> {
        Ok(MappingTable::from_config(&self.mapping)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{LogicalControl, TurntableMode};
    use crate::meter::PlaySide;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("sevenkey-meter-{}-{}", std::process::id(), name));
        path
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = AppConfig::from_toml("", Path::new("empty.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.mapping_table().unwrap(), MappingTable::default_layout());
        assert_eq!(config.meter.short_release_ms, 200);
        assert_eq!(config.reader.turntable_gain, 2.0);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let text = r#"
            [meter]
            count_long_releases = true
            play_side = "2p"

            [reader]
            digital_speed_deg_per_sec = 540.0

            [driver]
            preferred_device = 2
        "#;
        let config = AppConfig::from_toml(text, Path::new("partial.toml")).unwrap();
        assert!(config.meter.count_long_releases);
        assert_eq!(config.meter.play_side, PlaySide::P2);
        assert_eq!(config.meter.note_window_ms, 1000);
        assert_eq!(config.reader.digital_speed_deg_per_sec, 540.0);
        assert_eq!(config.reader.axis_to_degrees, -360.0);
        assert_eq!(config.driver.preferred_device, Some(2));
        assert_eq!(config.driver.frame_interval_ms, 16);
    }

    #[test]
    fn mapping_section_replaces_the_layout() {
        let text = r#"
            [mapping]
            turntable_mode = "digital"

            [mapping.buttons]
            B1 = 1
            TT_Left = 15
            TT_Right = 16
        "#;
        let config = AppConfig::from_toml(text, Path::new("digital.toml")).unwrap();
        let table = config.mapping_table().unwrap();
        assert_eq!(table.turntable_mode(), TurntableMode::Digital);
        assert_eq!(table.button_index(LogicalControl::B1), Some(1));
        assert_eq!(table.button_index(LogicalControl::B2), None);
    }

    #[test]
    fn wrong_kind_mapping_is_rejected() {
        let text = r#"
            [mapping.axes]
            B1 = 0
        "#;
        let err = AppConfig::from_toml(text, Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Mapping(_)));
    }

    #[test]
    fn unknown_control_is_a_parse_error() {
        let text = r#"
            [mapping.buttons]
            B9 = 0
        "#;
        let err = AppConfig::from_toml(text, Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[tokio::test]
    async fn missing_file_falls_back_to_defaults() {
        let path = temp_path("missing.toml");
        let config = AppConfig::load_or_default(&path).await.unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn existing_file_is_loaded() {
        let path = temp_path("present.toml");
        tokio::fs::write(&path, "[driver]\nframe_interval_ms = 8\n")
            .await
            .unwrap();
        let config = AppConfig::load_or_default(&path).await;
        tokio::fs::remove_file(&path).await.unwrap();
        assert_eq!(config.unwrap().driver.frame_interval_ms, 8);
    }
}
