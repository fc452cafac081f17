//! Argument parsing for the `dirsync` front end.

use std::ffi::OsString;
use std::path::PathBuf;

use clap::{Arg, ArgAction, Command, builder::PathBufValueParser};
use engine::SyncOptions;

/// Program name used when the argument list is empty.
pub const PROGRAM_NAME: &str = "dirsync";

/// A parsed command line.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedArgs {
    /// Number of `-v` flags.
    pub verbose: u8,
    /// The requested subcommand.
    pub action: Action,
}

/// What the invocation asks for.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Action {
    /// Write the record stream of `path` to `output`.
    Index {
        /// Directory to index.
        path: PathBuf,
        /// File receiving the records.
        output: PathBuf,
    },
    /// Make `dst` a copy of `src`.
    Sync {
        /// Source directory.
        src: PathBuf,
        /// Destination directory.
        dst: PathBuf,
        /// Engine options derived from the flags.
        options: SyncOptions,
    },
}

/// Builds the `clap` command used for parsing.
fn clap_command() -> Command {
    Command::new(PROGRAM_NAME)
        .version(env!("CARGO_PKG_VERSION"))
        .about("Synchronise directories by reusing content the destination already has.")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Increase logging verbosity; repeat for more detail.")
                .action(ArgAction::Count)
                .global(true),
        )
        .subcommand(
            Command::new("index")
                .about("Write the flat record stream of an indexed directory.")
                .arg(
                    Arg::new("path")
                        .value_name("PATH")
                        .help("Directory to index.")
                        .required(true)
                        .value_parser(PathBufValueParser::new()),
                )
                .arg(
                    Arg::new("output")
                        .value_name("OUTPUT")
                        .help("File receiving the records.")
                        .required(true)
                        .value_parser(PathBufValueParser::new()),
                ),
        )
        .subcommand(
            Command::new("sync")
                .about("Make DST a copy of SRC.")
                .arg(
                    Arg::new("dry-run")
                        .long("dry-run")
                        .short('n')
                        .help("Print the plan without modifying the destination.")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("no-delete")
                        .long("no-delete")
                        .help("Keep destination entries that are absent from the source.")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("no-perms")
                        .long("no-perms")
                        .help("Do not copy permission bits from the source.")
                        .action(ArgAction::SetTrue),
                )
                .arg(
                    Arg::new("src")
                        .value_name("SRC")
                        .help("Source directory.")
                        .required(true)
                        .value_parser(PathBufValueParser::new()),
                )
                .arg(
                    Arg::new("dst")
                        .value_name("DST")
                        .help("Destination directory; created when missing.")
                        .required(true)
                        .value_parser(PathBufValueParser::new()),
                ),
        )
}

/// Parses command-line arguments into [`ParsedArgs`].
pub fn parse_args<I, S>(arguments: I) -> Result<ParsedArgs, clap::Error>
where
    I: IntoIterator<Item = S>,
    S: Into<OsString>,
{
    let mut args: Vec<OsString> = arguments.into_iter().map(Into::into).collect();
    if args.is_empty() {
        args.push(OsString::from(PROGRAM_NAME));
    }

    let mut matches = clap_command().try_get_matches_from(args)?;
    let mut verbose = matches.get_count("verbose");
    let action = match matches.remove_subcommand() {
        Some((name, mut sub)) if name == "index" => {
            verbose = verbose.max(sub.get_count("verbose"));
            Action::Index {
                path: sub.remove_one::<PathBuf>("path").unwrap_or_default(),
                output: sub.remove_one::<PathBuf>("output").unwrap_or_default(),
            }
        }
        Some((_, mut sub)) => {
            verbose = verbose.max(sub.get_count("verbose"));
            let options = SyncOptions::new()
                .dry_run(sub.get_flag("dry-run"))
                .prune(!sub.get_flag("no-delete"))
                .preserve_modes(!sub.get_flag("no-perms"));
            Action::Sync {
                src: sub.remove_one::<PathBuf>("src").unwrap_or_default(),
                dst: sub.remove_one::<PathBuf>("dst").unwrap_or_default(),
                options,
            }
        }
        None => {
            return Err(clap_command().error(
                clap::error::ErrorKind::MissingSubcommand,
                "a subcommand is required",
            ));
        }
    };

    Ok(ParsedArgs { verbose, action })
}
