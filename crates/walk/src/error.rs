use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error returned when traversal fails.
#[derive(Debug, Error)]
pub enum WalkError {
    /// The traversal root could not be inspected.
    #[error("failed to walk '{}': {source}", .path.display())]
    Root {
        /// Requested root.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// A directory listing failed part way through the walk.
    #[error("failed to list '{}': {source}", .path.display())]
    ReadDir {
        /// Directory being listed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// An entry vanished or became unreadable between listing and `lstat`.
    #[error("failed to stat '{}': {source}", .path.display())]
    Stat {
        /// Entry being inspected.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
}

impl WalkError {
    /// Path whose inspection failed.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Root { path, .. } | Self::ReadDir { path, .. } | Self::Stat { path, .. } => path,
        }
    }

    /// The operating system error behind the failure.
    #[must_use]
    pub const fn io_error(&self) -> &io::Error {
        match self {
            Self::Root { source, .. }
            | Self::ReadDir { source, .. }
            | Self::Stat { source, .. } => source,
        }
    }
}
