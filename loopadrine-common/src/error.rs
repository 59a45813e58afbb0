//! Common error types for Loopadrine

use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::track::TrackStage;

/// Common result type for Loopadrine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the Loopadrine crates
#[derive(Error, Debug)]
pub enum Error {
    /// A file or directory operation failed on a specific path
    #[error("Filesystem error: failed to {operation} {}: {source}", path.display())]
    Filesystem {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O operation error without a path (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Track was asked to move between stages that have no direct transition
    #[error("Invalid transition for '{track}': {from:?} -> {to:?}")]
    InvalidTransition {
        track: String,
        from: TrackStage,
        to: TrackStage,
    },

    /// External tool could not be started or exited unsuccessfully
    #[error("{tool} failed: {message}")]
    Collaborator { tool: String, message: String },

    /// External tool exceeded its invocation timeout and was killed
    #[error("{tool} did not finish within {after:?}")]
    Timeout { tool: String, after: Duration },

    /// Invalid user input or argument
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl Error {
    /// Build a `map_err` adapter that tags an io::Error with the operation and path
    pub fn fs<'a>(
        operation: &'static str,
        path: &'a Path,
    ) -> impl FnOnce(std::io::Error) -> Error + 'a {
        move |source| Error::Filesystem {
            operation,
            path: path.to_path_buf(),
            source,
        }
    }

    /// True when this is a filesystem error caused by a missing path
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Filesystem { source, .. } | Error::Io(source) => {
                source.kind() == std::io::ErrorKind::NotFound
            }
            _ => false,
        }
    }
}
