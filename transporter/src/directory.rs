//! Sources of tunnel records.

use std::fs;
use std::path::{Path, PathBuf};

use tunnel::TunnelConfig;

use crate::error::DirectoryError;

/// Supplies the full set of tunnel records on demand.
pub trait Directory: Send {
    fn load(&self) -> Result<Vec<TunnelConfig>, DirectoryError>;
}

/// Tunnel records kept as a JSON array in a file.
#[derive(Debug, Clone)]
pub struct JsonDirectory {
    path: PathBuf,
}

impl JsonDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Directory for JsonDirectory {
    fn load(&self) -> Result<Vec<TunnelConfig>, DirectoryError> {
        let text = fs::read_to_string(&self.path).map_err(|source| DirectoryError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| DirectoryError::Parse {
            path: self.path.clone(),
            source,
        })
    }
}

/// A fixed set of records.
#[derive(Debug, Clone, Default)]
pub struct StaticDirectory {
    pub tunnels: Vec<TunnelConfig>,
}

impl Directory for StaticDirectory {
    fn load(&self) -> Result<Vec<TunnelConfig>, DirectoryError> {
        Ok(self.tunnels.clone())
    }
}
