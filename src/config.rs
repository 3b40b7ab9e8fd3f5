//! Client configuration
//!
//! A single [`ClientConfig`] stored as pretty-printed JSON. Missing keys take
//! their defaults, so an empty object is a valid config file.

use std::fs;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::lib3270::display::ScreenSize;

/// Line terminator written into ASCII transfers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LineTerminator {
    #[default]
    Lf,
    CrLf,
}

impl LineTerminator {
    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Self::Lf => b"\n",
            Self::CrLf => b"\r\n",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Geometry used by Erase/Write
    pub primary_model: ScreenSize,
    /// Geometry used by Erase/Write Alternate
    pub alternate_model: ScreenSize,
    /// Top-level qualifier prefixed to host data set names that lack one
    pub tlq: Option<String>,
    pub line_terminator: LineTerminator,
    /// Root directory for received files
    pub transfer_root: PathBuf,
    /// Per-site subfolder under `transfer_root`
    pub site_folder: Option<String>,
    pub max_transfer_bytes: usize,
    /// Labels that mark the command-entry field
    pub command_prompts: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            primary_model: ScreenSize::Model2,
            alternate_model: ScreenSize::Model2,
            tlq: None,
            line_terminator: LineTerminator::default(),
            transfer_root: default_transfer_root(),
            site_folder: None,
            max_transfer_bytes: 16 * 1024 * 1024,
            command_prompts: vec!["===>".to_string()],
        }
    }
}

impl ClientConfig {
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::File {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Load from `path`, falling back to defaults when the file is missing
    /// or unusable
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(err) => {
                warn!("ignoring config file {}: {err}", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let file_error = |source| ConfigError::File {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                fs::create_dir_all(parent).map_err(file_error)?;
            }
        }
        fs::write(path, self.to_json()?).map_err(file_error)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.alternate_model.buffer_size() < self.primary_model.buffer_size() {
            return Err(ConfigError::InvalidParameter {
                parameter: "alternate_model",
                reason: format!(
                    "{:?} is smaller than primary model {:?}",
                    self.alternate_model, self.primary_model
                ),
            });
        }

        if let Some(tlq) = &self.tlq {
            let valid = !tlq.is_empty()
                && tlq.len() <= 8
                && tlq.chars().all(|c| c.is_ascii_alphanumeric() || "@#$".contains(c));
            if !valid {
                return Err(ConfigError::InvalidParameter {
                    parameter: "tlq",
                    reason: format!("'{tlq}' is not a valid qualifier"),
                });
            }
        }

        if self.max_transfer_bytes == 0 {
            return Err(ConfigError::InvalidParameter {
                parameter: "max_transfer_bytes",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.command_prompts.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigError::InvalidParameter {
                parameter: "command_prompts",
                reason: "prompts must not be blank".to_string(),
            });
        }

        Ok(())
    }
}

/// Determine the config file path.
/// Priority:
/// 1) TN3270R_CONFIG env var
/// 2) platform config dir, e.g. ~/.config/tn3270r/config.json
/// 3) ./config.json
pub fn default_config_path() -> PathBuf {
    if let Ok(p) = std::env::var("TN3270R_CONFIG") {
        return PathBuf::from(p);
    }

    dirs::config_dir()
        .map(|base| base.join("tn3270r").join("config.json"))
        .unwrap_or_else(|| PathBuf::from("config.json"))
}

fn default_transfer_root() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("tn3270r").join("files"))
        .unwrap_or_else(|| PathBuf::from("files"))
}
