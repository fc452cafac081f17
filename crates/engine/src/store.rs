//! Byte access to an indexed directory.

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Component, Path, PathBuf};

use checksums::Strong;
use logging::trace_store;
use tree::{BlockIndex, Indexer, Kind, MemRepo, RELOC_PREFIX, Repository, Tree};

use crate::error::{EngineError, EngineResult};

/// Read access to the bytes behind an indexed tree.
///
/// This is the only way planning and execution obtain source content.
pub trait BlockStore {
    /// The indexed tree.
    fn tree(&self) -> &Tree;

    /// Lookup tables over [`BlockStore::tree`].
    fn index(&self) -> &BlockIndex;

    /// Bytes of the block with identity `strong`.
    fn read_block(&self, strong: &Strong) -> EngineResult<Vec<u8>> {
        let block = self.index().block(strong).ok_or(EngineError::NotFound {
            kind: Kind::Block,
            strong: *strong,
        })?;
        let tree = self.tree();
        let (Some(file), Some(info)) = (tree.block_file(block), tree.block(block)) else {
            return Err(EngineError::NotFound {
                kind: Kind::Block,
                strong: *strong,
            });
        };
        let len = tree.block_len(block);
        let mut buf = Vec::with_capacity(len as usize);
        self.read_into(&tree.strong(file), info.offset(), len, &mut buf)?;
        Ok(buf)
    }

    /// Copies `len` bytes starting at `from` of the file with identity
    /// `strong` into `out`, returning the bytes written.
    fn read_into(&self, strong: &Strong, from: u64, len: u64, out: &mut dyn Write)
    -> EngineResult<u64>;
}

/// A [`BlockStore`] over a directory on the local filesystem.
///
/// Besides reading, a local store can move entries out of the way: a
/// relocated path keeps resolving to its new location for reads until the
/// relocations are cleared, while writes keep targeting the plain path.
#[derive(Debug)]
pub struct LocalStore<R: Repository = MemRepo> {
    root: PathBuf,
    repo: R,
    index: BlockIndex,
    relocations: Vec<(PathBuf, PathBuf)>,
    next_reloc: usize,
    skip_internal: bool,
}

impl LocalStore<MemRepo> {
    /// Indexes every entry of the directory at `root` into memory.
    pub fn open(root: impl Into<PathBuf>) -> EngineResult<Self> {
        Self::open_with(root.into(), false)
    }

    /// Indexes a sync destination, leaving out relocation directories and
    /// temp files an interrupted run left behind.
    pub fn open_destination(root: impl Into<PathBuf>) -> EngineResult<Self> {
        Self::open_with(root.into(), true)
    }

    fn open_with(root: PathBuf, skip_internal: bool) -> EngineResult<Self> {
        let repo = Indexer::new(&root).skip_internal(skip_internal).index()?;
        let mut store = Self::with_repository(root, repo);
        store.skip_internal = skip_internal;
        Ok(store)
    }

    /// Re-indexes the directory, discarding the previous tree.
    pub fn reindex(&mut self) -> EngineResult<()> {
        self.repo = Indexer::new(&self.root)
            .skip_internal(self.skip_internal)
            .index()?;
        self.index = BlockIndex::new(self.repo.tree());
        Ok(())
    }
}

impl<R: Repository> LocalStore<R> {
    /// Wraps an already populated repository describing `root`.
    pub fn with_repository(root: impl Into<PathBuf>, repo: R) -> Self {
        let index = BlockIndex::new(repo.tree());
        Self {
            root: root.into(),
            repo,
            index,
            relocations: Vec::new(),
            next_reloc: 0,
            skip_internal: false,
        }
    }

    /// Directory the store describes.
    pub fn root_path(&self) -> &Path {
        &self.root
    }

    /// Underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Plain location of `rel`, ignoring relocations.
    pub fn local_path(&self, rel: &Path) -> PathBuf {
        if rel.as_os_str().is_empty() {
            self.root.clone()
        } else {
            self.root.join(rel)
        }
    }

    /// Current location of the original entry at `rel`.
    ///
    /// Paths at or below a relocated path map into the relocated copy; the
    /// deepest relocation wins.
    pub fn resolve(&self, rel: &Path) -> PathBuf {
        let found = self
            .relocations
            .iter()
            .filter(|(original, _)| rel.starts_with(original))
            .max_by_key(|(original, _)| original.components().count());
        match found {
            Some((original, relocated)) => match rel.strip_prefix(original) {
                Ok(rest) if !rest.as_os_str().is_empty() => relocated.join(rest),
                _ => relocated.clone(),
            },
            None => self.local_path(rel),
        }
    }

    /// Moves the entry at `rel` to a fresh `_reloc` name in the store root
    /// and returns the new location.
    pub fn relocate(&mut self, rel: &Path) -> EngineResult<PathBuf> {
        let valid = !rel.as_os_str().is_empty()
            && rel
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !valid {
            return Err(EngineError::InvalidPath(rel.to_path_buf()));
        }

        let target = loop {
            let candidate = self.root.join(format!("{RELOC_PREFIX}{}", self.next_reloc));
            self.next_reloc += 1;
            match fs::symlink_metadata(&candidate) {
                Ok(_) => {}
                Err(error) if error.kind() == io::ErrorKind::NotFound => break candidate,
                Err(error) => return Err(EngineError::io("inspect", candidate, error)),
            }
        };
        let source = self.local_path(rel);
        fs::rename(&source, &target).map_err(|error| EngineError::io("relocate", &source, error))?;
        trace_store!(
            path = %rel.display(),
            relocated = %target.display(),
            "relocated entry"
        );
        self.relocations.push((rel.to_path_buf(), target.clone()));
        Ok(target)
    }

    /// Relative paths currently relocated, with their locations.
    pub fn relocations(&self) -> impl Iterator<Item = (&Path, &Path)> {
        self.relocations
            .iter()
            .map(|(original, relocated)| (original.as_path(), relocated.as_path()))
    }

    /// Forgets every relocation, returning the relocated locations.
    pub fn clear_relocations(&mut self) -> Vec<PathBuf> {
        self.relocations
            .drain(..)
            .map(|(_, relocated)| relocated)
            .collect()
    }
}

impl<R: Repository> BlockStore for LocalStore<R> {
    fn tree(&self) -> &Tree {
        self.repo.tree()
    }

    fn index(&self) -> &BlockIndex {
        &self.index
    }

    fn read_into(
        &self,
        strong: &Strong,
        from: u64,
        len: u64,
        out: &mut dyn Write,
    ) -> EngineResult<u64> {
        let file = self.index.file(strong).ok_or(EngineError::NotFound {
            kind: Kind::File,
            strong: *strong,
        })?;
        let path = self.resolve(&self.tree().path(file));
        let mut reader = File::open(&path).map_err(|error| EngineError::io("open", &path, error))?;
        reader
            .seek(SeekFrom::Start(from))
            .map_err(|error| EngineError::io("seek", &path, error))?;
        let copied = io::copy(&mut reader.take(len), out)
            .map_err(|error| EngineError::io("copy from", &path, error))?;
        if copied < len {
            return Err(EngineError::ShortRead {
                path,
                expected: len,
                copied,
            });
        }
        trace_store!(path = %path.display(), from, len, "read range");
        Ok(copied)
    }
}

#[cfg(test)]
mod tests {
    use checksums::strong_checksum;
    use tempfile::tempdir;

    use super::*;

    fn store_with(files: &[(&str, &[u8])]) -> (tempfile::TempDir, LocalStore) {
        let temp = tempdir().expect("tempdir");
        for (name, contents) in files {
            let path = temp.path().join(name);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).expect("mkdir");
            }
            fs::write(path, contents).expect("write");
        }
        let store = LocalStore::open(temp.path()).expect("open store");
        (temp, store)
    }

    #[test]
    fn reads_ranges_of_indexed_files() {
        let (_temp, store) = store_with(&[("a/b.txt", b"hello world")]);
        let strong = strong_checksum(b"hello world");
        let mut out = Vec::new();
        let copied = store.read_into(&strong, 6, 5, &mut out).expect("read");
        assert_eq!(copied, 5);
        assert_eq!(out, b"world");
    }

    #[test]
    fn reads_blocks_by_identity() {
        let (_temp, store) = store_with(&[("f", b"tiny")]);
        let block = store
            .read_block(&strong_checksum(b"tiny"))
            .expect("single block file");
        assert_eq!(block, b"tiny");
    }

    #[test]
    fn unknown_identity_is_not_found() {
        let (_temp, store) = store_with(&[("f", b"x")]);
        let missing = strong_checksum(b"absent");
        let error = store
            .read_into(&missing, 0, 1, &mut Vec::new())
            .expect_err("absent");
        assert!(matches!(
            error,
            EngineError::NotFound {
                kind: Kind::File,
                ..
            }
        ));
    }

    #[test]
    fn reading_past_the_end_is_a_short_read() {
        let (_temp, store) = store_with(&[("f", b"abc")]);
        let error = store
            .read_into(&strong_checksum(b"abc"), 1, 10, &mut Vec::new())
            .expect_err("short");
        assert!(matches!(error, EngineError::ShortRead { copied: 2, .. }));
    }

    #[test]
    fn relocation_redirects_reads_below_the_relocated_path() {
        let (temp, mut store) = store_with(&[("dir/inner/file", b"payload")]);
        let relocated = store.relocate(Path::new("dir")).expect("relocate");

        assert!(!temp.path().join("dir").exists());
        assert!(relocated.starts_with(temp.path()));
        assert!(
            relocated
                .file_name()
                .expect("name")
                .to_string_lossy()
                .starts_with(RELOC_PREFIX)
        );
        assert_eq!(
            store.resolve(Path::new("dir/inner/file")),
            relocated.join("inner/file")
        );
        assert_eq!(store.resolve(Path::new("dir")), relocated);
        assert_eq!(store.resolve(Path::new("other")), temp.path().join("other"));

        let mut out = Vec::new();
        store
            .read_into(&strong_checksum(b"payload"), 0, 7, &mut out)
            .expect("reads follow relocation");
        assert_eq!(out, b"payload");

        assert_eq!(store.clear_relocations(), vec![relocated.clone()]);
        assert_eq!(
            store.resolve(Path::new("dir/inner/file")),
            temp.path().join("dir/inner/file")
        );
        assert!(relocated.join("inner/file").exists());
    }

    #[test]
    fn deepest_relocation_wins() {
        let (_temp, mut store) = store_with(&[("a/b/c", b"1"), ("a/d", b"2")]);
        let inner = store.relocate(Path::new("a/b")).expect("relocate inner");
        let outer = store.relocate(Path::new("a")).expect("relocate outer");
        assert_ne!(inner, outer);
        assert_eq!(store.resolve(Path::new("a/b/c")), inner.join("c"));
        assert_eq!(store.resolve(Path::new("a/d")), outer.join("d"));
    }

    #[test]
    fn destinations_leave_out_leftover_relocations() {
        let (temp, _) = store_with(&[("_reloc0/old", b"stale"), ("_relocate.txt", b"mine")]);
        let destination = LocalStore::open_destination(temp.path()).expect("open");
        let tree = destination.tree();
        assert!(tree.lookup(Path::new("_reloc0")).is_none());
        assert!(tree.lookup(Path::new("_relocate.txt")).is_some());

        let plain = LocalStore::open(temp.path()).expect("open");
        assert!(plain.tree().lookup(Path::new("_reloc0")).is_some());
    }

    #[test]
    fn root_and_parent_paths_cannot_be_relocated() {
        let (_temp, mut store) = store_with(&[("f", b"x")]);
        assert!(matches!(
            store.relocate(Path::new("")),
            Err(EngineError::InvalidPath(_))
        ));
        assert!(matches!(
            store.relocate(Path::new("../f")),
            Err(EngineError::InvalidPath(_))
        ));
    }
}
