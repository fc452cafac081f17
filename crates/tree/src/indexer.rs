//! Builds a [`Repository`] from a directory on disk.
//!
//! Indexing happens in three phases: a name-sorted walk collects the
//! directories and regular files, every file is hashed (concurrently with the
//! `parallel` feature), and the results are inserted into the repository in
//! walk order. Directory digests are refreshed once at the end.

use std::ffi::OsStr;
use std::fs::{self, File, Metadata};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use checksums::{BLOCK_SIZE, StrongHasher, strong_checksum, weak_checksum};
use logging::trace_index;
use rustc_hash::FxHashMap;
use walk::WalkBuilder;

use crate::error::IndexError;
use crate::node::{BlockInfo, DirInfo, FileInfo, NodeId};
use crate::repository::{MemRepo, Repository};

/// Name prefix of entries relocated out of the way during plan execution.
pub const RELOC_PREFIX: &str = "_reloc";

/// Name prefix of temporary files created while patching.
pub const TEMP_PREFIX: &str = ".dirsync-tmp-";

fn all_digits(bytes: &[u8]) -> bool {
    !bytes.is_empty() && bytes.iter().all(u8::is_ascii_digit)
}

/// `true` for a relocation directory: `_reloc<n>` directly under the root.
fn is_relocation(rel: &Path) -> bool {
    let mut components = rel.components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => name
            .as_encoded_bytes()
            .strip_prefix(RELOC_PREFIX.as_bytes())
            .is_some_and(all_digits),
        _ => false,
    }
}

/// `true` for a patch temp file: `.dirsync-tmp-<name>.<pid>.<n>`.
fn is_temp_file(rel: &Path) -> bool {
    let Some(rest) = rel
        .file_name()
        .and_then(|name| name.as_encoded_bytes().strip_prefix(TEMP_PREFIX.as_bytes()))
    else {
        return false;
    };
    let mut parts = rest.rsplitn(3, |&byte| byte == b'.');
    let (Some(unique), Some(pid), Some(_stem)) = (parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    all_digits(unique) && all_digits(pid)
}

/// `true` for root-relative paths the engine creates in a destination for
/// its own bookkeeping.
#[must_use]
pub fn is_internal_path(rel: &Path) -> bool {
    is_relocation(rel) || is_temp_file(rel)
}

/// Counters reported after indexing.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct IndexStats {
    /// Directories inserted, excluding the root.
    pub dirs: u64,
    /// Regular files inserted.
    pub files: u64,
    /// Blocks inserted.
    pub blocks: u64,
    /// Bytes hashed.
    pub bytes: u64,
    /// Entries skipped because they are neither files nor directories.
    pub skipped: u64,
}

#[cfg(unix)]
fn mode_of(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn mode_of(metadata: &Metadata) -> u32 {
    match (metadata.is_dir(), metadata.permissions().readonly()) {
        (true, _) => 0o755,
        (false, true) => 0o444,
        (false, false) => 0o644,
    }
}

fn entry_name(path: &Path) -> std::ffi::OsString {
    path.file_name().map(OsStr::to_os_string).unwrap_or_default()
}

/// Fills `buf` as far as the reader allows, returning the bytes read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(error) if error.kind() == io::ErrorKind::Interrupted => {}
            Err(error) => return Err(error),
        }
    }
    Ok(filled)
}

/// Hashes a regular file into its identity and blocks.
pub fn index_file(path: &Path) -> Result<(FileInfo, Vec<BlockInfo>), IndexError> {
    let metadata =
        fs::metadata(path).map_err(|error| IndexError::io("inspect", path, error))?;
    if !metadata.is_file() {
        return Err(IndexError::NotRegularFile(path.to_path_buf()));
    }
    let mut file = File::open(path).map_err(|error| IndexError::io("open", path, error))?;

    let mut whole = StrongHasher::new();
    let mut blocks = Vec::new();
    let mut buf = vec![0_u8; BLOCK_SIZE];
    let mut size = 0_u64;
    loop {
        let n = read_full(&mut file, &mut buf).map_err(|error| IndexError::io("read", path, error))?;
        if n == 0 {
            break;
        }
        let chunk = &buf[..n];
        whole.update(chunk);
        blocks.push(BlockInfo {
            position: blocks.len() as u32,
            weak: weak_checksum(chunk),
            strong: strong_checksum(chunk),
        });
        size += n as u64;
        if n < BLOCK_SIZE {
            break;
        }
    }

    let info = FileInfo {
        name: entry_name(path),
        mode: mode_of(&metadata),
        size,
        strong: whole.finalize(),
    };
    Ok((info, blocks))
}

enum Pending {
    Dir { rel: PathBuf, info: DirInfo },
    File { rel: PathBuf, full: PathBuf },
}

/// Walks and hashes a directory into a repository.
#[derive(Clone, Debug)]
pub struct Indexer {
    root: PathBuf,
    skip_internal: bool,
}

impl Indexer {
    /// Creates an indexer for the directory at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            skip_internal: false,
        }
    }

    /// Leaves out relocation directories and temp files left behind by an
    /// interrupted sync. Only destinations should be indexed this way.
    #[must_use]
    pub const fn skip_internal(mut self, skip: bool) -> Self {
        self.skip_internal = skip;
        self
    }

    /// Directory being indexed.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Metadata of the root directory as a [`DirInfo`].
    pub fn root_info(&self) -> Result<DirInfo, IndexError> {
        let metadata = fs::metadata(&self.root)
            .map_err(|error| IndexError::io("inspect", &self.root, error))?;
        if !metadata.is_dir() {
            return Err(IndexError::NotADirectory(self.root.clone()));
        }
        Ok(DirInfo {
            name: entry_name(&self.root),
            mode: mode_of(&metadata),
        })
    }

    /// Indexes into a fresh [`MemRepo`].
    pub fn index(&self) -> Result<MemRepo, IndexError> {
        let mut repo = MemRepo::new(self.root_info()?);
        self.index_into(&mut repo)?;
        Ok(repo)
    }

    /// Indexes the directory contents beneath the root of `repo`.
    pub fn index_into<R: Repository>(&self, repo: &mut R) -> Result<IndexStats, IndexError> {
        let mut stats = IndexStats::default();
        let pending = self.collect(&mut stats)?;
        let hashed = hash_files(&pending);

        let root = repo.root();
        let mut dirs: FxHashMap<PathBuf, NodeId> = FxHashMap::default();
        let parent_of = |dirs: &FxHashMap<PathBuf, NodeId>, rel: &Path| {
            rel.parent()
                .filter(|parent| !parent.as_os_str().is_empty())
                .and_then(|parent| dirs.get(parent).copied())
                .unwrap_or(root)
        };

        for (entry, hashed) in pending.into_iter().zip(hashed) {
            match (entry, hashed) {
                (Pending::Dir { rel, info }, _) => {
                    let parent = parent_of(&dirs, &rel);
                    let id = repo.add_dir(parent, info)?;
                    dirs.insert(rel, id);
                    stats.dirs += 1;
                }
                (Pending::File { rel, .. }, Some(result)) => {
                    let (info, blocks) = result?;
                    let parent = parent_of(&dirs, &rel);
                    stats.files += 1;
                    stats.blocks += blocks.len() as u64;
                    stats.bytes += info.size;
                    repo.add_file(parent, info, blocks)?;
                }
                (Pending::File { .. }, None) => {}
            }
        }

        let strong = repo.update_strong(root);
        trace_index!(
            root = %self.root.display(),
            %strong,
            dirs = stats.dirs,
            files = stats.files,
            blocks = stats.blocks,
            "indexed tree"
        );
        Ok(stats)
    }

    fn collect(&self, stats: &mut IndexStats) -> Result<Vec<Pending>, IndexError> {
        self.root_info()?;
        let mut builder = WalkBuilder::new(&self.root).include_root(false);
        if self.skip_internal {
            builder = builder.exclude(is_internal_path);
        }
        let walker = builder.build()?;
        let mut pending = Vec::new();
        for entry in walker {
            let entry = entry?;
            let rel = entry.relative_path().to_path_buf();
            if entry.is_dir() {
                pending.push(Pending::Dir {
                    info: DirInfo {
                        name: entry_name(&rel),
                        mode: mode_of(entry.metadata()),
                    },
                    rel,
                });
            } else if entry.is_file() {
                pending.push(Pending::File {
                    rel,
                    full: entry.full_path().to_path_buf(),
                });
            } else {
                stats.skipped += 1;
                trace_index!(path = %entry.full_path().display(), "skipping special entry");
            }
        }
        Ok(pending)
    }
}

type Hashed = Option<Result<(FileInfo, Vec<BlockInfo>), IndexError>>;

fn hash_one(entry: &Pending) -> Hashed {
    match entry {
        Pending::Dir { .. } => None,
        Pending::File { full, .. } => Some(index_file(full)),
    }
}

#[cfg(feature = "parallel")]
fn hash_files(pending: &[Pending]) -> Vec<Hashed> {
    use rayon::prelude::*;
    pending.par_iter().map(hash_one).collect()
}

#[cfg(not(feature = "parallel"))]
fn hash_files(pending: &[Pending]) -> Vec<Hashed> {
    pending.iter().map(hash_one).collect()
}

/// Indexes the directory at `path` into a fresh [`MemRepo`].
pub fn index_dir(path: &Path) -> Result<MemRepo, IndexError> {
    Indexer::new(path).index()
}
