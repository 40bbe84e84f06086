use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::constants::DEFAULT_JPEG_QUALITY;
use crate::encryption::EncryptionKey;
use crate::error::DrmError;
use crate::watermark_task::{OriginX, OriginY, Placement};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse settings YAML: {0}")]
    Parse(String),
    #[error("Invalid key in settings: {0}")]
    Key(DrmError),
}

/// Watermark defaults, usually loaded from a YAML file.
///
/// Origins are numeric like on the C side: `0` for Left/Top, anything else
/// for Right/Bottom.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// 64 hex digits.
    pub key: Option<String>,
    pub x: u32,
    pub y: u32,
    pub origin_x: u8,
    pub origin_y: u8,
    pub jpeg_quality: u8,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            key: None,
            x: 0,
            y: 0,
            origin_x: 0,
            origin_y: 0,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl Settings {
    pub fn from_yaml(yaml: &str) -> Result<Self, SettingsError> {
        serde_yml::from_str(yaml).map_err(|e| SettingsError::Parse(e.to_string()))
    }

    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    pub fn key(&self) -> Result<Option<EncryptionKey>, SettingsError> {
        self.key
            .as_deref()
            .map(EncryptionKey::from_hex)
            .transpose()
            .map_err(SettingsError::Key)
    }

    pub fn placement(&self) -> Placement {
        Placement::new(
            self.x,
            self.y,
            OriginX::from(self.origin_x),
            OriginY::from(self.origin_y),
        )
    }
}
