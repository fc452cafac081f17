use std::io;
use std::path::PathBuf;

use checksums::RollingError;
use thiserror::Error;

/// Failure while matching a destination file against a source file.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Opening or inspecting the destination failed.
    #[error("failed to {action} '{}': {source}", .path.display())]
    Io {
        /// What was being attempted.
        action: &'static str,
        /// Destination path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Reading the destination stream failed.
    #[error("failed to read destination stream: {0}")]
    Read(#[source] io::Error),
    /// The destination exists but is not a regular file.
    #[error("'{}' is not a regular file", .0.display())]
    NotRegularFile(PathBuf),
    /// The source node handed to the matcher is not a file.
    #[error("match source is not a file node")]
    SourceNotFile,
    /// The rolling checksum was advanced over an empty window.
    #[error(transparent)]
    Rolling(#[from] RollingError),
}
