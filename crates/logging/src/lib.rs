#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` holds the diagnostic plumbing shared by the dirsync crates. Every
//! crate emits structured events through the [`tracing`] facade using one of
//! the `trace_*` macros exported here; each macro pins the event to a
//! subsystem target such as `dirsync::plan` so verbosity can be tuned per
//! subsystem.
//!
//! # Design
//!
//! - [`Subsystem`] enumerates the targets and their string names.
//! - [`VerbosityConfig`] stores one level per subsystem and maps the CLI's
//!   repeated `-v` flag onto those levels.
//! - [`init_tracing`] installs a `tracing-subscriber` formatter on standard
//!   error whose filter is derived from the configuration. When `RUST_LOG` is
//!   set it takes precedence over the computed directives.
//!
//! # Examples
//!
//! ```
//! use logging::{Subsystem, VerbosityConfig};
//!
//! let config = VerbosityConfig::from_verbose_level(1);
//! assert_eq!(config.level(Subsystem::Plan), tracing::Level::INFO);
//! assert!(config.directives().contains("dirsync::plan=info"));
//! ```

mod config;
mod levels;
mod tracing_bridge;
mod tracing_macros;

pub use config::VerbosityConfig;
pub use levels::{Subsystem, SubsystemLevels};
pub use tracing_bridge::{build_filter, init_tracing, init_tracing_with_writer};
