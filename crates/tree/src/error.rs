use std::io;
use std::path::PathBuf;

use thiserror::Error;
use walk::WalkError;

use crate::node::Kind;

/// Structural misuse of a [`Tree`](crate::Tree).
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TreeError {
    /// The operation needs a different kind of node.
    #[error("expected a {expected} node, found a {found}")]
    WrongKind {
        /// Kind required by the operation.
        expected: Kind,
        /// Kind actually present.
        found: Kind,
    },
    /// The root directory cannot be detached from its own tree.
    #[error("the root directory cannot be removed")]
    RemoveRoot,
    /// The node was removed earlier.
    #[error("node has been removed from the tree")]
    Detached,
}

/// Failure while indexing a filesystem subtree.
#[derive(Debug, Error)]
pub enum IndexError {
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
    /// A file was expected but something else was found.
    #[error("'{}' is not a regular file", .0.display())]
    NotRegularFile(PathBuf),
    /// A directory was expected but something else was found.
    #[error("'{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),
    /// Traversal failed.
    #[error(transparent)]
    Walk(#[from] WalkError),
    /// Inserting into the repository failed.
    #[error(transparent)]
    Tree(#[from] TreeError),
}

impl IndexError {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

/// Failure while encoding or decoding the flat record stream.
#[derive(Debug, Error)]
pub enum RecordError {
    /// Reading or writing the stream failed.
    #[error("record stream I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The leading tag byte is not a known record type.
    #[error("unknown record tag {tag} at record {index}")]
    UnknownTag {
        /// Offending tag value.
        tag: u8,
        /// Zero-based record number.
        index: u64,
    },
    /// The stream ended inside a record.
    #[error("record {index} truncated after {read} of {expected} bytes")]
    Truncated {
        /// Zero-based record number.
        index: u64,
        /// Bytes available.
        read: usize,
        /// Bytes required.
        expected: usize,
    },
    /// The writer thread stopped before the stream was complete.
    #[error("record writer thread terminated unexpectedly")]
    WriterGone,
}
