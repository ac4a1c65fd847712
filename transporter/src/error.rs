//! Error types for the transporter runtime.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Result type for transporter operations.
pub type TransporterResult<T> = Result<T, TransporterError>;

/// Failures loading tunnel records.
#[derive(Debug)]
pub enum DirectoryError {
    Io { path: PathBuf, source: io::Error },
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Failures that stop the transporter.
#[derive(Debug)]
pub enum TransporterError {
    Bind { addr: SocketAddr, source: io::Error },
    Socket(io::Error),
    Directory(DirectoryError),
    Spawn { name: &'static str, source: io::Error },
    /// A worker thread ended while the transporter was running.
    WorkerStopped {
        name: &'static str,
        source: Option<io::Error>,
    },
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read tunnel directory {}: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "invalid tunnel directory {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for DirectoryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
        }
    }
}

impl fmt::Display for TransporterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bind { addr, source } => write!(f, "failed to bind {addr}: {source}"),
            Self::Socket(source) => write!(f, "socket setup failed: {source}"),
            Self::Directory(err) => write!(f, "{err}"),
            Self::Spawn { name, source } => {
                write!(f, "failed to start {name} thread: {source}")
            }
            Self::WorkerStopped { name, source: None } => write!(f, "{name} thread stopped"),
            Self::WorkerStopped {
                name,
                source: Some(source),
            } => write!(f, "{name} thread failed: {source}"),
        }
    }
}

impl std::error::Error for TransporterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Bind { source, .. } | Self::Spawn { source, .. } | Self::Socket(source) => {
                Some(source)
            }
            Self::Directory(err) => Some(err),
            Self::WorkerStopped { source, .. } => source
                .as_ref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
        }
    }
}

impl From<DirectoryError> for TransporterError {
    fn from(err: DirectoryError) -> Self {
        Self::Directory(err)
    }
}
