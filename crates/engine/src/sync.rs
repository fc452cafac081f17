//! One-call synchronisation of a destination directory from a source directory.
//!
//! # Example
//!
//! ```rust
//! use engine::{SyncOptions, sync};
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let src = tempfile::tempdir()?;
//! let dst = tempfile::tempdir()?;
//! std::fs::write(src.path().join("notes.txt"), b"hello")?;
//!
//! let options = SyncOptions::new().preserve_modes(false);
//! let summary = sync(src.path(), dst.path(), &options)?;
//! assert_eq!(summary.plan().len(), 1);
//! assert_eq!(std::fs::read(dst.path().join("notes.txt"))?, b"hello");
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use logging::trace_plan;
use tree::{DirInfo, MemRepo};

use crate::clean::{clean, extraneous};
use crate::error::{EngineError, EngineResult};
use crate::exec::ExecStats;
use crate::mode::{ModeStats, create_missing_dirs, set_mode};
use crate::plan::PatchPlan;
use crate::store::{BlockStore, LocalStore};

/// Options controlling [`sync`]. The default mirrors the source exactly.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SyncOptions {
    prune: bool,
    preserve_modes: bool,
    dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            prune: true,
            preserve_modes: true,
            dry_run: false,
        }
    }
}

impl SyncOptions {
    /// Mirror semantics: prune extraneous entries and copy modes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes destination entries the source lacks after a successful run.
    #[must_use]
    pub const fn prune(mut self, prune: bool) -> Self {
        self.prune = prune;
        self
    }

    /// Applies source permission bits after a successful run.
    #[must_use]
    pub const fn preserve_modes(mut self, preserve: bool) -> Self {
        self.preserve_modes = preserve;
        self
    }

    /// Plans without touching the destination.
    #[must_use]
    pub const fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Whether extraneous entries are removed.
    #[must_use]
    pub const fn prunes(&self) -> bool {
        self.prune
    }

    /// Whether modes are copied.
    #[must_use]
    pub const fn preserves_modes(&self) -> bool {
        self.preserve_modes
    }

    /// Whether the destination is left untouched.
    #[must_use]
    pub const fn is_dry_run(&self) -> bool {
        self.dry_run
    }
}

/// Outcome of [`sync`].
#[derive(Clone, Debug)]
pub struct SyncSummary {
    plan: PatchPlan,
    exec: Option<ExecStats>,
    removed: Vec<PathBuf>,
    modes: Option<ModeStats>,
    created_dirs: usize,
}

impl SyncSummary {
    /// The plan that was computed.
    #[must_use]
    pub const fn plan(&self) -> &PatchPlan {
        &self.plan
    }

    /// Execution counters, absent for dry runs.
    #[must_use]
    pub const fn exec(&self) -> Option<&ExecStats> {
        self.exec.as_ref()
    }

    /// Paths removed by pruning, or that would be removed in a dry run.
    #[must_use]
    pub fn removed(&self) -> &[PathBuf] {
        &self.removed
    }

    /// Mode counters when modes were applied.
    #[must_use]
    pub const fn modes(&self) -> Option<&ModeStats> {
        self.modes.as_ref()
    }

    /// Empty source directories created in the destination.
    #[must_use]
    pub const fn created_dirs(&self) -> usize {
        self.created_dirs
    }
}

/// Canonical form of `path`; missing trailing components are appended to the
/// canonical form of the deepest existing ancestor.
fn canonical(path: &Path) -> EngineResult<PathBuf> {
    let mut existing = path;
    let mut missing = Vec::new();
    loop {
        match fs::canonicalize(existing) {
            Ok(real) => return Ok(missing.iter().rev().fold(real, |acc, name| acc.join(name))),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                match (existing.parent(), existing.file_name()) {
                    (Some(parent), Some(name)) => {
                        missing.push(name.to_owned());
                        existing = if parent.as_os_str().is_empty() {
                            Path::new(".")
                        } else {
                            parent
                        };
                    }
                    _ => return Err(EngineError::io("resolve", path, error)),
                }
            }
            Err(error) => return Err(EngineError::io("resolve", path, error)),
        }
    }
}

/// Opens the destination store; a missing destination is treated as empty
/// for dry runs and created otherwise.
fn open_destination(dst: &Path, dry_run: bool) -> EngineResult<LocalStore> {
    match fs::symlink_metadata(dst) {
        Ok(metadata) if !metadata.is_dir() => Err(EngineError::NotADirectory(dst.to_path_buf())),
        Ok(_) => LocalStore::open_destination(dst),
        Err(error) if error.kind() == io::ErrorKind::NotFound && dry_run => {
            let root = DirInfo {
                name: dst.file_name().map(ToOwned::to_owned).unwrap_or_default(),
                mode: 0o755,
            };
            Ok(LocalStore::with_repository(dst, MemRepo::new(root)))
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            crate::fsutil::create_dir_all(dst)?;
            LocalStore::open_destination(dst)
        }
        Err(error) => Err(EngineError::io("inspect", dst, error)),
    }
}

/// Makes `dst` a copy of `src`.
///
/// Indexes both directories, plans, executes, then optionally prunes and
/// applies modes. Overlapping source and destination roots are rejected.
pub fn sync(src: &Path, dst: &Path, options: &SyncOptions) -> EngineResult<SyncSummary> {
    let (src_real, dst_real) = (canonical(src)?, canonical(dst)?);
    if src_real.starts_with(&dst_real) || dst_real.starts_with(&src_real) {
        return Err(EngineError::OverlappingRoots {
            src: src.to_path_buf(),
            dst: dst.to_path_buf(),
        });
    }
    let src_store = LocalStore::open(src)?;
    let mut dst_store = open_destination(dst, options.dry_run)?;

    let plan = PatchPlan::new(&src_store, &dst_store)?;
    trace_plan!(
        src = %src.display(),
        dst = %dst.display(),
        commands = plan.len(),
        "planned sync"
    );

    if options.dry_run {
        let removed = if options.prune && dst.exists() {
            extraneous(src_store.tree(), dst)?
        } else {
            Vec::new()
        };
        return Ok(SyncSummary {
            plan,
            exec: None,
            removed,
            modes: None,
            created_dirs: 0,
        });
    }

    let stats = plan.exec(&src_store, &mut dst_store)?;
    let removed = if options.prune {
        clean(src_store.tree(), dst)?
    } else {
        Vec::new()
    };
    let (modes, created_dirs) = if options.preserve_modes {
        let modes = set_mode(src_store.tree(), dst)?;
        (Some(modes), modes.created)
    } else {
        (None, create_missing_dirs(src_store.tree(), dst)?)
    };

    Ok(SyncSummary {
        plan,
        exec: Some(stats),
        removed,
        modes,
        created_dirs,
    })
}
