//! User configuration, stored as YAML in the platform config directory.

use crate::error::{PickerError, PickerResult};
use crate::hotkey::{HotkeyChord, DEFAULT_HOTKEY};
use crate::magnifier::{normalize_side, DEFAULT_MAGNIFIER_SIDE};
use crate::overlay::IndicatorStyle;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const CONFIG_FILE: &str = "config.yaml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickerConfig {
    /// Save chord, tokens joined by `" + "`.
    pub hotkey: String,
    /// Side of the magnified capture square, in points.
    pub magnifier_side: u32,
    pub indicator: IndicatorStyle,
    /// Used when a monitor does not report its refresh rate.
    pub fallback_refresh_hz: f64,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Also write a daily log file under the data directory.
    pub log_to_file: bool,
}

impl Default for PickerConfig {
    fn default() -> Self {
        Self {
            hotkey: DEFAULT_HOTKEY.to_string(),
            magnifier_side: DEFAULT_MAGNIFIER_SIDE,
            indicator: IndicatorStyle::default(),
            fallback_refresh_hz: 60.0,
            log_filter: "pipette=info,pipette_core=info,pipette_platform=info".to_string(),
            log_to_file: false,
        }
    }
}

impl PickerConfig {
    /// The configured chord, or the default one when it does not parse.
    pub fn hotkey_chord(&self) -> HotkeyChord {
        match HotkeyChord::parse(&self.hotkey) {
            Ok(chord) => chord,
            Err(e) => {
                warn!(hotkey = %self.hotkey, error = %e, "invalid hotkey in config, using default");
                HotkeyChord::default()
            }
        }
    }

    pub fn magnifier_side(&self) -> u32 {
        normalize_side(self.magnifier_side)
    }

    /// Parse YAML text.
    pub fn from_yaml(content: &str) -> PickerResult<Self> {
        serde_yaml::from_str(content).map_err(|e| PickerError::Config(e.to_string()))
    }

    pub fn to_yaml(&self) -> PickerResult<String> {
        serde_yaml::to_string(self).map_err(|e| PickerError::Config(e.to_string()))
    }

    /// Load from `path`. A missing or unreadable file yields defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            debug!(?path, "no config file, using defaults");
            return Self::default();
        }
        let loaded = fs::read_to_string(path)
            .map_err(|e| PickerError::Config(e.to_string()))
            .and_then(|content| Self::from_yaml(&content));
        match loaded {
            Ok(config) => {
                info!(?path, "loaded config");
                config
            }
            Err(e) => {
                warn!(?path, error = %e, "failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Load from the default location.
    pub fn load() -> Self {
        Self::load_from(&config_path())
    }

    /// Write to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> PickerResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| PickerError::Config(e.to_string()))?;
        }
        fs::write(path, self.to_yaml()?).map_err(|e| PickerError::Config(e.to_string()))?;
        debug!(?path, "saved config");
        Ok(())
    }
}

/// Config directory for pipette.
pub fn config_dir() -> PathBuf {
    let base = dirs_next::config_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("pipette")
}

/// Data directory for pipette (logs).
pub fn data_dir() -> PathBuf {
    let base = dirs_next::data_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("pipette")
}

pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE)
}
