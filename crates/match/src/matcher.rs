use std::fs::{self, File};
use std::io::{self, BufReader, Read};
use std::path::Path;

use checksums::{BLOCK_SIZE, RollingChecksum};
use logging::trace_match;
use tree::{BlockIndex, NodeId, Tree};

use crate::error::MatchError;
use crate::file_match::{BlockMatch, FileMatch};
use crate::window::Window;

/// Scans destination streams for the blocks of an indexed source.
#[derive(Debug)]
pub struct Matcher<'a> {
    tree: &'a Tree,
    index: BlockIndex,
    src_size: u64,
}

impl<'a> Matcher<'a> {
    /// Matches against the blocks of a single source file.
    pub fn for_file(tree: &'a Tree, file: NodeId) -> Result<Self, MatchError> {
        let node = tree.file(file).ok_or(MatchError::SourceNotFile)?;
        Ok(Self {
            tree,
            index: BlockIndex::of_subtree(tree, file),
            src_size: node.info.size,
        })
    }

    /// Matches against an arbitrary prebuilt index.
    #[must_use]
    pub const fn with_index(tree: &'a Tree, index: BlockIndex, src_size: u64) -> Self {
        Self {
            tree,
            index,
            src_size,
        }
    }

    /// Scans the regular file at `path`.
    pub fn match_path(&self, path: &Path) -> Result<FileMatch, MatchError> {
        let io_error = |action, source| MatchError::Io {
            action,
            path: path.to_path_buf(),
            source,
        };
        let metadata = fs::symlink_metadata(path).map_err(|e| io_error("inspect", e))?;
        if !metadata.file_type().is_file() {
            return Err(MatchError::NotRegularFile(path.to_path_buf()));
        }
        let file = File::open(path).map_err(|e| io_error("open", e))?;
        self.match_reader(BufReader::new(file))
    }

    /// Scans `reader` to its end.
    ///
    /// Each scan step loads a fresh chunk of up to [`BLOCK_SIZE`] bytes. When
    /// the window's weak checksum has candidates and its strong digest equals
    /// a candidate's, a match is recorded for every agreeing block and the
    /// scan continues with the next chunk. Otherwise the window slides
    /// forward by one byte. The scan ends when no further byte can be read.
    pub fn match_reader<R: Read>(&self, mut reader: R) -> Result<FileMatch, MatchError> {
        let mut result = FileMatch {
            src_size: self.src_size,
            ..FileMatch::default()
        };
        let mut chunk = vec![0_u8; BLOCK_SIZE];
        let mut window = Window::with_capacity(BLOCK_SIZE);
        let mut checksum = RollingChecksum::new();
        let mut offset = 0_u64;

        'scan: loop {
            let n = read_full(&mut reader, &mut chunk).map_err(MatchError::Read)?;
            if n == 0 {
                break;
            }
            result.dst_size += n as u64;
            window.load(&chunk[..n]);
            checksum.reset();
            checksum.update(&chunk[..n]);

            loop {
                if self.record_matches(&window, &checksum, offset, &mut result.block_matches) {
                    offset += window.len() as u64;
                    continue 'scan;
                }
                let mut byte = [0_u8; 1];
                if read_full(&mut reader, &mut byte).map_err(MatchError::Read)? == 0 {
                    break 'scan;
                }
                result.dst_size += 1;
                match window.push_back(byte[0]) {
                    Some(removed) => {
                        checksum.roll(removed, byte[0])?;
                        offset += 1;
                    }
                    None => checksum.update(&byte),
                }
            }
        }

        trace_match!(
            src_size = result.src_size,
            dst_size = result.dst_size,
            matches = result.block_matches.len(),
            "scan complete"
        );
        Ok(result)
    }

    fn record_matches(
        &self,
        window: &Window,
        checksum: &RollingChecksum,
        offset: u64,
        out: &mut Vec<BlockMatch>,
    ) -> bool {
        let candidates = self.index.weak_blocks(checksum.value());
        if candidates.is_empty() {
            return false;
        }
        let strong = window.strong();
        let len = window.len() as u64;
        let mut found = false;
        for &candidate in candidates {
            let Some(block) = self.tree.block(candidate) else {
                continue;
            };
            if block.strong != strong || self.tree.block_len(candidate) != len {
                trace_match!(offset, position = block.position, "weak collision rejected");
                continue;
            }
            trace_match!(offset, position = block.position, "block matched");
            out.push(BlockMatch {
                src_block: candidate,
                src_offset: block.offset(),
                len,
                dst_offset: offset,
            });
            found = true;
        }
        found
    }
}

/// Matches the destination file at `dst` against the blocks of `src_file`.
pub fn match_file(tree: &Tree, src_file: NodeId, dst: &Path) -> Result<FileMatch, MatchError> {
    Matcher::for_file(tree, src_file)?.match_path(dst)
}

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
