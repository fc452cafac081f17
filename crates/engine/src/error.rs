//! Error type shared by stores, planning and execution.

use std::io;
use std::path::PathBuf;

use checksums::Strong;
use matching::MatchError;
use thiserror::Error;
use tree::{IndexError, Kind};
use walk::WalkError;

use crate::command::Command;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors raised while reading stores, planning or executing a patch.
#[derive(Debug, Error)]
pub enum EngineError {
    /// An I/O operation on `path` failed.
    #[error("failed to {action} '{}': {source}", .path.display())]
    Io {
        /// What was being attempted.
        action: &'static str,
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// No node with the requested identity exists in the store.
    #[error("{kind} with strong checksum {strong} not found")]
    NotFound {
        /// Kind of node that was looked up.
        kind: Kind,
        /// Identity that was looked up.
        strong: Strong,
    },
    /// A regular file was expected.
    #[error("'{}' is not a regular file", .0.display())]
    NotRegularFile(PathBuf),
    /// A directory was expected.
    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),
    /// The path cannot be relocated or resolved inside a store.
    #[error("'{}' is not a relative path below the store root", .0.display())]
    InvalidPath(PathBuf),
    /// More transfers ran from a path than the plan accounted for.
    #[error("cannot transfer '{}': reference count underflow", .0.display())]
    RefCountUnderflow(PathBuf),
    /// The source ended before the requested range was copied.
    #[error("short read from '{}': copied {copied} of {expected} bytes", .path.display())]
    ShortRead {
        /// File being read.
        path: PathBuf,
        /// Bytes requested.
        expected: u64,
        /// Bytes actually copied.
        copied: u64,
    },
    /// Source and destination roots nest inside each other.
    #[error("source '{}' and destination '{}' overlap", .src.display(), .dst.display())]
    OverlappingRoots {
        /// Source root as given.
        src: PathBuf,
        /// Destination root as given.
        dst: PathBuf,
    },
    /// A temp-file command ran without its `LocalTemp` being open.
    #[error("temporary file #{0} is not open")]
    TempNotOpen(usize),
    /// A plan command failed; nothing after it ran.
    #[error("command {index} failed ({command}): {source}")]
    ExecFailure {
        /// Position of the failing command in the plan.
        index: usize,
        /// The failing command.
        command: Box<Command>,
        /// Why it failed.
        #[source]
        source: Box<EngineError>,
    },
    /// Matching a destination file failed while planning.
    #[error(transparent)]
    Match(#[from] MatchError),
    /// Indexing a tree failed.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// Walking the destination failed.
    #[error(transparent)]
    Walk(#[from] WalkError),
}

impl EngineError {
    /// Constructs an I/O error with action context.
    #[must_use]
    pub fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }

    /// Position and command of a failed plan step.
    #[must_use]
    pub fn failed_command(&self) -> Option<(usize, &Command)> {
        match self {
            Self::ExecFailure { index, command, .. } => Some((*index, command)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn io_errors_name_action_and_path() {
        let error = EngineError::io(
            "open",
            "/tmp/missing",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        assert_eq!(error.to_string(), "failed to open '/tmp/missing': gone");
        assert!(error.source().is_some());
    }

    #[test]
    fn not_found_names_kind_and_identity() {
        let strong = checksums::strong_checksum(b"");
        let error = EngineError::NotFound {
            kind: Kind::File,
            strong,
        };
        assert_eq!(
            error.to_string(),
            "file with strong checksum da39a3ee5e6b4b0d3255bfef95601890afd80709 not found"
        );
    }
}
