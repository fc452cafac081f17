use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use tree::TEMP_PREFIX;

use crate::error::{EngineError, EngineResult};

static NEXT_TEMP_FILE_ID: AtomicUsize = AtomicUsize::new(0);

/// Mode of directories created on the way to a write target.
pub(crate) const PARENT_DIR_MODE: u32 = 0o755;

/// Removes a non-directory entry at `path` if one exists.
pub(crate) fn remove_existing_destination(path: &Path) -> EngineResult<()> {
    match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => Ok(()),
        Ok(_) => fs::remove_file(path)
            .map_err(|error| EngineError::io("remove existing destination", path, error)),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(EngineError::io("inspect", path, error)),
    }
}

/// Removes whatever is at `path`, recursively for directories. Missing paths are fine.
pub(crate) fn remove_all(path: &Path) -> EngineResult<()> {
    let result = match fs::symlink_metadata(path) {
        Ok(metadata) if metadata.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(error) => Err(error),
    };
    match result {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => Err(EngineError::io("remove", path, error)),
    }
}

pub(crate) fn create_dir_all(path: &Path) -> EngineResult<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(PARENT_DIR_MODE);
    }
    builder
        .create(path)
        .map_err(|error| EngineError::io("create directory", path, error))
}

pub(crate) fn create_parent_dirs(path: &Path) -> EngineResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Copies a file, or a directory recursively. Symbolic links are recreated on Unix.
pub(crate) fn copy_recursive(from: &Path, to: &Path) -> EngineResult<u64> {
    let metadata =
        fs::symlink_metadata(from).map_err(|error| EngineError::io("inspect", from, error))?;
    let file_type = metadata.file_type();
    if file_type.is_dir() {
        create_dir_all(to)?;
        let mut names = fs::read_dir(from)
            .map_err(|error| EngineError::io("read directory", from, error))?
            .map(|entry| entry.map(|entry| entry.file_name()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| EngineError::io("read directory", from, error))?;
        names.sort();
        let mut copied = 0;
        for name in names {
            copied += copy_recursive(&from.join(&name), &to.join(&name))?;
        }
        fs::set_permissions(to, metadata.permissions())
            .map_err(|error| EngineError::io("set permissions", to, error))?;
        Ok(copied)
    } else if file_type.is_file() {
        remove_existing_destination(to)?;
        fs::copy(from, to).map_err(|error| EngineError::io("copy", from, error))
    } else {
        copy_special(from, to)
    }
}

#[cfg(unix)]
fn copy_special(from: &Path, to: &Path) -> EngineResult<u64> {
    if let Ok(target) = fs::read_link(from) {
        remove_existing_destination(to)?;
        std::os::unix::fs::symlink(&target, to)
            .map_err(|error| EngineError::io("create symlink", to, error))?;
    }
    Ok(0)
}

#[cfg(not(unix))]
fn copy_special(_from: &Path, _to: &Path) -> EngineResult<u64> {
    Ok(0)
}

/// Renames `from` to `to`, replacing a file at `to` and falling back to
/// copy-then-remove across filesystems.
pub(crate) fn move_path(from: &Path, to: &Path) -> EngineResult<()> {
    remove_existing_destination(to)?;
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(error) if error.kind() == io::ErrorKind::CrossesDevices => {
            copy_recursive(from, to)?;
            remove_all(from)
        }
        Err(error) => Err(EngineError::io("rename", from, error)),
    }
}

/// A uniquely named file created beside its eventual destination.
///
/// Dropping an uncommitted temp file removes it.
#[derive(Debug)]
pub(crate) struct TempFile {
    path: PathBuf,
    file: Option<File>,
    committed: bool,
}

impl TempFile {
    pub(crate) fn beside(destination: &Path) -> EngineResult<Self> {
        let dir = destination
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let stem = destination
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        loop {
            let unique = NEXT_TEMP_FILE_ID.fetch_add(1, AtomicOrdering::Relaxed);
            let path = dir.join(format!("{TEMP_PREFIX}{stem}.{}.{unique}", process::id()));
            match fs::OpenOptions::new()
                .read(true)
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(file) => {
                    return Ok(Self {
                        path,
                        file: Some(file),
                        committed: false,
                    });
                }
                Err(error) if error.kind() == io::ErrorKind::AlreadyExists => {}
                Err(error) => return Err(EngineError::io("create temporary file", path, error)),
            }
        }
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    pub(crate) fn file_mut(&mut self) -> EngineResult<&mut File> {
        let path = &self.path;
        self.file.as_mut().ok_or_else(|| {
            EngineError::io(
                "write temporary file",
                path,
                io::Error::other("handle already closed"),
            )
        })
    }

    /// Closes the handle and renames the temp file over `destination`.
    pub(crate) fn commit(mut self, destination: &Path) -> EngineResult<()> {
        if let Some(file) = self.file.take() {
            file.sync_all()
                .map_err(|error| EngineError::io("flush temporary file", &self.path, error))?;
        }
        remove_existing_destination(destination)?;
        match fs::rename(&self.path, destination) {
            Ok(()) => {}
            Err(error) if error.kind() == io::ErrorKind::CrossesDevices => {
                fs::copy(&self.path, destination).map_err(|copy_error| {
                    EngineError::io("finalise temporary file", destination, copy_error)
                })?;
                fs::remove_file(&self.path).map_err(|remove_error| {
                    EngineError::io("finalise temporary file", &self.path, remove_error)
                })?;
            }
            Err(error) => {
                return Err(EngineError::io(
                    "finalise temporary file",
                    &self.path,
                    error,
                ));
            }
        }
        self.committed = true;
        Ok(())
    }
}

impl Drop for TempFile {
    fn drop(&mut self) {
        self.file = None;
        if !self.committed {
            let _ = fs::remove_file(&self.path);
        }
    }
}
