//! Propagating source permission bits to the destination.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use logging::trace_mode;
use tree::{NodeKind, Tree};

use crate::error::{EngineError, EngineResult};
use crate::fsutil::create_dir_all;

/// Counters reported by [`set_mode`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ModeStats {
    /// Files whose mode was applied.
    pub files: usize,
    /// Directories whose mode was applied, including the root.
    pub dirs: usize,
    /// Directories that had to be created first.
    pub created: usize,
}

fn src_dirs(src: &Tree) -> Vec<(PathBuf, u32)> {
    src.bfs_fs(src.root())
        .filter_map(|id| match src.node(id) {
            NodeKind::Dir(dir) => Some((src.path(id), dir.info.mode)),
            _ => None,
        })
        .collect()
}

/// Creates every source directory missing below `dst_root`, shallowest first.
///
/// Empty source directories produce no plan commands, so this is what
/// mirrors them.
pub fn create_missing_dirs(src: &Tree, dst_root: &Path) -> EngineResult<usize> {
    let mut created = 0;
    for (rel, _) in src_dirs(src) {
        let path = dst_root.join(&rel);
        match fs::symlink_metadata(&path) {
            Ok(_) => {}
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                trace_mode!(path = %rel.display(), "creating missing directory");
                create_dir_all(&path)?;
                created += 1;
            }
            Err(error) => return Err(EngineError::io("inspect", path, error)),
        }
    }
    Ok(created)
}

/// Applies source modes: files first, then directories deepest first, so a
/// restrictive directory mode never blocks work beneath it.
pub fn set_mode(src: &Tree, dst_root: &Path) -> EngineResult<ModeStats> {
    let mut stats = ModeStats {
        created: create_missing_dirs(src, dst_root)?,
        ..ModeStats::default()
    };

    for id in src.bfs_fs(src.root()) {
        if let NodeKind::File(file) = src.node(id)
            && apply(&dst_root.join(src.path(id)), file.info.mode, false)?
        {
            stats.files += 1;
        }
    }

    let mut dirs = src_dirs(src);
    dirs.sort_by_key(|(rel, _)| std::cmp::Reverse(rel.components().count()));
    for (rel, mode) in dirs {
        if apply(&dst_root.join(rel), mode, true)? {
            stats.dirs += 1;
        }
    }

    trace_mode!(
        files = stats.files,
        dirs = stats.dirs,
        created = stats.created,
        "modes applied"
    );
    Ok(stats)
}

/// Sets `mode` on `path` if it is an entry of the expected kind.
fn apply(path: &Path, mode: u32, dir: bool) -> EngineResult<bool> {
    let metadata = match fs::symlink_metadata(path) {
        Ok(metadata) => metadata,
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Ok(false),
        Err(error) => return Err(EngineError::io("inspect", path, error)),
    };
    let file_type = metadata.file_type();
    if (dir && !file_type.is_dir()) || (!dir && !file_type.is_file()) {
        trace_mode!(path = %path.display(), "kind differs, leaving mode alone");
        return Ok(false);
    }
    let mut permissions = metadata.permissions();
    set_permission_bits(&mut permissions, mode);
    fs::set_permissions(path, permissions)
        .map_err(|error| EngineError::io("set permissions", path, error))?;
    Ok(true)
}

#[cfg(unix)]
fn set_permission_bits(permissions: &mut fs::Permissions, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    permissions.set_mode(mode);
}

#[cfg(not(unix))]
fn set_permission_bits(permissions: &mut fs::Permissions, mode: u32) {
    permissions.set_readonly(mode & 0o222 == 0);
}
