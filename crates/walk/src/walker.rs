use std::ffi::OsString;
use std::fs;
use std::path::PathBuf;

use logging::trace_walk;

use crate::builder::ExcludeFn;
use crate::entry::WalkEntry;
use crate::error::WalkError;

/// Iterator that yields filesystem entries in name-sorted depth-first order.
pub struct Walker {
    root: PathBuf,
    root_metadata: Option<fs::Metadata>,
    include_root: bool,
    exclude: Option<ExcludeFn>,
    stack: Vec<DirectoryState>,
    finished: bool,
}

impl Walker {
    pub(crate) fn new(
        root: PathBuf,
        metadata: fs::Metadata,
        include_root: bool,
        exclude: Option<ExcludeFn>,
    ) -> Result<Self, WalkError> {
        let mut walker = Self {
            root,
            root_metadata: None,
            include_root,
            exclude,
            stack: Vec::new(),
            finished: false,
        };

        if metadata.file_type().is_dir() {
            let state = walker.read_directory(walker.root.clone(), PathBuf::new(), 0)?;
            walker.stack.push(state);
        }
        walker.root_metadata = Some(metadata);
        Ok(walker)
    }

    fn read_directory(
        &self,
        fs_path: PathBuf,
        relative_prefix: PathBuf,
        depth: usize,
    ) -> Result<DirectoryState, WalkError> {
        let read_dir =
            fs::read_dir(&fs_path).map_err(|error| WalkError::ReadDir {
                path: fs_path.clone(),
                source: error,
            })?;
        let mut entries = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|error| WalkError::ReadDir {
                path: fs_path.clone(),
                source: error,
            })?;
            let name = entry.file_name();
            if self
                .exclude
                .as_ref()
                .is_some_and(|skip| skip(&relative_prefix.join(&name)))
            {
                trace_walk!(path = %fs_path.join(&name).display(), "excluded");
                continue;
            }
            entries.push(name);
        }
        entries.sort();
        Ok(DirectoryState {
            fs_path,
            relative_prefix,
            depth,
            entries,
            index: 0,
        })
    }

    fn next_child(&mut self) -> Option<Result<WalkEntry, WalkError>> {
        loop {
            let state = self.stack.last_mut()?;
            let Some(name) = state.next_name() else {
                self.stack.pop();
                continue;
            };

            let full_path = state.fs_path.join(&name);
            let relative_path = state.relative_prefix.join(&name);
            let depth = state.depth + 1;

            let metadata = match fs::symlink_metadata(&full_path) {
                Ok(metadata) => metadata,
                Err(error) => return Some(Err(WalkError::Stat {
                        path: full_path,
                        source: error,
                    })),
            };

            if metadata.file_type().is_dir() {
                match self.read_directory(full_path.clone(), relative_path.clone(), depth) {
                    Ok(state) => self.stack.push(state),
                    Err(error) => return Some(Err(error)),
                }
            }

            return Some(Ok(WalkEntry {
                full_path,
                relative_path,
                metadata,
                depth,
                is_root: false,
            }));
        }
    }
}

impl Iterator for Walker {
    type Item = Result<WalkEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if let Some(metadata) = self.root_metadata.take() {
            if self.include_root {
                return Some(Ok(WalkEntry {
                    full_path: self.root.clone(),
                    relative_path: PathBuf::new(),
                    metadata,
                    depth: 0,
                    is_root: true,
                }));
            }
        }

        match self.next_child() {
            Some(Err(error)) => {
                self.finished = true;
                Some(Err(error))
            }
            Some(entry) => Some(entry),
            None => {
                self.finished = true;
                None
            }
        }
    }
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("root", &self.root)
            .field("include_root", &self.include_root)
            .field("pending_dirs", &self.stack.len())
            .field("finished", &self.finished)
            .finish()
    }
}

struct DirectoryState {
    fs_path: PathBuf,
    relative_prefix: PathBuf,
    depth: usize,
    entries: Vec<OsString>,
    index: usize,
}

impl DirectoryState {
    fn next_name(&mut self) -> Option<OsString> {
        let name = self.entries.get(self.index)?.clone();
        self.index += 1;
        Some(name)
    }
}
