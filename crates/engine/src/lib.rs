#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `engine` turns a destination directory into a copy of a source directory
//! while reusing whatever content the destination already holds. Both sides
//! are indexed into content-addressed trees; a [`PatchPlan`] lists the
//! [`Command`]s that get from one to the other, and [`PatchPlan::exec`]
//! applies them.
//!
//! # Design
//!
//! - [`BlockStore`] is the read side: any store able to hand out file byte
//!   ranges by strong checksum can act as a source. [`LocalStore`] is the
//!   on-disk implementation and also the only writable destination.
//! - Planning walks the source breadth-first. Subtrees already present in the
//!   destination (anywhere) become `Keep` or `Transfer` commands and are not
//!   descended into. Changed files are patched from matching destination
//!   blocks; files with nothing to reuse are downloaded whole.
//! - Destination entries in the way of the new layout are relocated aside by
//!   `Conflict` commands and deleted only after every command has succeeded.
//! - [`clean`] prunes what the source lacks and [`set_mode`] copies
//!   permission bits; [`sync`] runs the whole pipeline.
//!
//! # Examples
//!
//! ```
//! use std::fs;
//! use engine::{LocalStore, PatchPlan};
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let src = tempfile::tempdir()?;
//! let dst = tempfile::tempdir()?;
//! fs::write(src.path().join("a.txt"), b"moved")?;
//! fs::write(dst.path().join("b.txt"), b"moved")?;
//!
//! let source = LocalStore::open(src.path())?;
//! let mut target = LocalStore::open_destination(dst.path())?;
//! let plan = PatchPlan::new(&source, &target)?;
//! assert_eq!(plan.to_string(), "Transfer file b.txt to a.txt\n");
//!
//! plan.exec(&source, &mut target)?;
//! assert_eq!(fs::read(dst.path().join("a.txt"))?, b"moved");
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```

mod clean;
mod command;
mod error;
mod exec;
mod fsutil;
mod mode;
mod plan;
mod store;
mod sync;

pub use clean::{clean, extraneous};
pub use command::{
    Command, Conflict, Keep, LocalTemp, LocalTempCopy, Occupant, ReplaceWithTemp,
    SrcFileDownload, SrcTempCopy, TempId, Transfer,
};
pub use error::{EngineError, EngineResult};
pub use exec::ExecStats;
pub use mode::{ModeStats, create_missing_dirs, set_mode};
pub use plan::PatchPlan;
pub use store::{BlockStore, LocalStore};
pub use sync::{SyncOptions, SyncSummary, sync};
