use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::Path;

use super::error::ContainerError;

/// The physical container formats written by the acquisition system.
///
/// The format is always derived from the file suffix; there is no sniffing of
/// file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    #[default]
    Hdf5,
    #[serde(rename = "txt")]
    Text,
}

impl ContainerFormat {
    /// Determine the format of a container from its suffix
    pub fn from_path(path: &Path) -> Result<Self, ContainerError> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("hdf5") | Some("h5") => Ok(Self::Hdf5),
            Some("txt") => Ok(Self::Text),
            _ => Err(ContainerError::UnsupportedFormat(path.to_path_buf())),
        }
    }

    /// Whether `path` carries one of this format's suffixes
    pub fn matches(&self, path: &Path) -> bool {
        matches!(Self::from_path(path), Ok(format) if format == *self)
    }
}

impl Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hdf5 => write!(f, "hdf5"),
            Self::Text => write!(f, "txt"),
        }
    }
}
