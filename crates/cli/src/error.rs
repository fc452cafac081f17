use std::io;
use std::path::PathBuf;

use engine::EngineError;
use thiserror::Error;
use tree::{IndexError, RecordError};

/// Failures surfaced by a subcommand.
#[derive(Debug, Error)]
pub enum CliError {
    /// Planning or executing a sync failed.
    #[error(transparent)]
    Engine(#[from] EngineError),
    /// Indexing a directory failed.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// Writing the record stream failed.
    #[error("failed to write records: {0}")]
    Records(#[from] RecordError),
    /// The record output file could not be created.
    #[error("failed to create '{}': {source}", .path.display())]
    Create {
        /// Requested output path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// Writing to standard output failed.
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}
