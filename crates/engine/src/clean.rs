//! Pruning destination entries the source does not have.

use std::path::{Path, PathBuf};

use logging::trace_clean;
use tree::{Kind, Tree, is_internal_path};
use walk::WalkBuilder;

use crate::error::EngineResult;
use crate::fsutil::remove_all;

/// Destination paths, relative to `dst_root`, with no entry of the same kind
/// at the same path in `src`.
///
/// Only the outermost extraneous path of a subtree is reported. Relocated
/// originals and temp files are never reported.
pub fn extraneous(src: &Tree, dst_root: &Path) -> EngineResult<Vec<PathBuf>> {
    let walker = WalkBuilder::new(dst_root)
        .include_root(false)
        .exclude(is_internal_path)
        .build()?;
    let mut found: Vec<PathBuf> = Vec::new();
    for entry in walker {
        let entry = entry?;
        let rel = entry.relative_path();
        if found.last().is_some_and(|parent| rel.starts_with(parent)) {
            continue;
        }
        let wanted = match src.lookup(rel).map(|id| src.kind(id)) {
            Some(Kind::Dir) => entry.is_dir(),
            Some(Kind::File) => entry.is_file(),
            Some(Kind::Block) | None => false,
        };
        if !wanted {
            found.push(rel.to_path_buf());
        }
    }
    Ok(found)
}

/// Removes every [`extraneous`] destination path, returning what was removed.
pub fn clean(src: &Tree, dst_root: &Path) -> EngineResult<Vec<PathBuf>> {
    let removed = extraneous(src, dst_root)?;
    for rel in &removed {
        trace_clean!(path = %rel.display(), "removing");
        remove_all(&dst_root.join(rel))?;
    }
    trace_clean!(removed = removed.len(), "clean complete");
    Ok(removed)
}
