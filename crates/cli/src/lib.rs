#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `cli` is the command-line front end of `dirsync`. It understands two
//! subcommands:
//!
//! - `dirsync index <PATH> <OUTPUT>` indexes a directory and writes its flat
//!   29-byte record stream to `OUTPUT`;
//! - `dirsync sync [-v]... [-n] [--no-delete] [--no-perms] <SRC> <DST>` makes
//!   `DST` a copy of `SRC`, reusing whatever content `DST` already holds.
//!
//! # Design
//!
//! [`run`] accepts an iterator of arguments together with handles for standard
//! output and error and returns the process exit code, so the binary stays a
//! one-liner and tests can drive the whole front end in memory. Parsing uses a
//! [`clap`] builder command; the repeated `-v` flag feeds
//! [`logging::VerbosityConfig`].
//!
//! # Errors
//!
//! Usage errors exit with `2` and clap's rendering. Any failure while indexing
//! or synchronising is printed as `dirsync: <error>` on standard error and
//! exits with `1`.
//!
//! # Examples
//!
//! ```
//! let mut stdout = Vec::new();
//! let mut stderr = Vec::new();
//! let status = cli::run(["dirsync", "--version"], &mut stdout, &mut stderr);
//!
//! assert_eq!(status, 0);
//! assert!(String::from_utf8_lossy(&stdout).starts_with("dirsync "));
//! assert!(stderr.is_empty());
//! ```

mod arguments;
mod error;

use std::ffi::OsString;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use engine::{SyncOptions, SyncSummary};
use logging::{VerbosityConfig, init_tracing, trace_index};
use tree::{Indexer, Repository};
use tree::records::{spawn_writer, tree_records};

pub use arguments::{Action, PROGRAM_NAME, ParsedArgs, parse_args};
pub use error::CliError;

/// Maximum exit code representable by a Unix process.
const MAX_EXIT_CODE: i32 = u8::MAX as i32;

/// Records buffered between the indexer and the writer thread.
const RECORD_QUEUE_DEPTH: usize = 1024;

/// Runs the CLI using the provided argument iterator and output handles.
///
/// Returns the exit code the process should use: `0` on success, `1` when the
/// requested operation failed, `2` for usage errors.
pub fn run<I, S, Out, Err>(arguments: I, stdout: &mut Out, stderr: &mut Err) -> i32
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
    Out: Write,
    Err: Write,
{
    let parsed = match parse_args(arguments) {
        Ok(parsed) => parsed,
        Err(error) => {
            let rendered = error.render().to_string();
            let written = if error.use_stderr() {
                stderr.write_all(rendered.as_bytes())
            } else {
                stdout.write_all(rendered.as_bytes())
            };
            if written.is_err() {
                return 1;
            }
            return error.exit_code();
        }
    };

    init_tracing(VerbosityConfig::from_verbose_level(parsed.verbose));

    match execute(&parsed, stdout) {
        Ok(()) => 0,
        Err(error) => {
            let _ = writeln!(stderr, "{PROGRAM_NAME}: {error}");
            1
        }
    }
}

fn execute<Out: Write>(parsed: &ParsedArgs, stdout: &mut Out) -> Result<(), CliError> {
    match &parsed.action {
        Action::Index { path, output } => index(path, output, stdout),
        Action::Sync { src, dst, options } => sync(src, dst, options, parsed.verbose, stdout),
    }
}

fn index<Out: Write>(path: &Path, output: &Path, stdout: &mut Out) -> Result<(), CliError> {
    let repo = Indexer::new(path).index()?;
    let file = File::create(output).map_err(|source| CliError::Create {
        path: output.to_path_buf(),
        source,
    })?;

    let sink = spawn_writer(file, RECORD_QUEUE_DEPTH);
    for record in tree_records(repo.tree()) {
        sink.send(record)?;
    }
    let (file, written) = sink.finish()?;
    file.sync_all().map_err(tree::RecordError::Io)?;

    trace_index!(records = written, output = %output.display(), "record stream written");
    writeln!(stdout, "{written} records written to {}", output.display())?;
    Ok(())
}

fn sync<Out: Write>(
    src: &Path,
    dst: &Path,
    options: &SyncOptions,
    verbose: u8,
    stdout: &mut Out,
) -> Result<(), CliError> {
    let summary = engine::sync(src, dst, options)?;
    if options.is_dry_run() || verbose > 0 {
        report(&summary, options, stdout)?;
    }
    Ok(())
}

fn report<Out: Write>(
    summary: &SyncSummary,
    options: &SyncOptions,
    stdout: &mut Out,
) -> Result<(), CliError> {
    write!(stdout, "{}", summary.plan())?;
    let verb = if options.is_dry_run() {
        "Would remove"
    } else {
        "Removed"
    };
    for path in summary.removed() {
        writeln!(stdout, "{verb} {}", path.display())?;
    }
    if let Some(stats) = summary.exec() {
        writeln!(
            stdout,
            "{} commands, {} bytes from source, {} bytes reused, {} removed",
            stats.commands,
            stats.source_bytes,
            stats.local_bytes,
            summary.removed().len()
        )?;
    }
    Ok(())
}

/// Converts a numeric exit code into an [`std::process::ExitCode`].
#[must_use]
pub fn exit_code_from(status: i32) -> std::process::ExitCode {
    let clamped = status.clamp(0, MAX_EXIT_CODE);
    std::process::ExitCode::from(u8::try_from(clamped).unwrap_or(u8::MAX))
}

#[cfg(test)]
mod tests;
