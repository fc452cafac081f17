//! Plan commands and their rendering.

use std::fmt;
use std::path::{Path, PathBuf};

use checksums::Strong;
use tree::Kind;

/// Renders a store-relative path, showing the root as `.`.
pub(crate) struct Shown<'a>(pub(crate) &'a Path);

impl fmt::Display for Shown<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.as_os_str().is_empty() {
            f.write_str(".")
        } else {
            write!(f, "{}", self.0.display())
        }
    }
}

/// What occupies a destination path that a command needs.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Occupant {
    /// A regular file.
    File,
    /// A directory.
    Dir,
    /// A symbolic link, socket, device or other special entry.
    Other,
}

impl fmt::Display for Occupant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::File => "file",
            Self::Dir => "directory",
            Self::Other => "special entry",
        })
    }
}

/// Handle tying the temp-file commands of one destination file together.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TempId(pub(crate) usize);

impl TempId {
    /// Position of the temp file within its plan.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// The destination entry already matches the source.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Keep {
    /// Store-relative path.
    pub path: PathBuf,
}

/// Move or copy an identical destination entry to the source's path.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Transfer {
    /// Where the identical entry currently lives.
    pub from: PathBuf,
    /// Where the source expects it.
    pub to: PathBuf,
    /// Whether a file or a directory is transferred.
    pub kind: Kind,
}

/// Relocate the entry occupying `path` so the path can be rewritten.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Conflict {
    /// Store-relative path being freed.
    pub path: PathBuf,
    /// What occupied the path when the plan was made.
    pub occupant: Occupant,
}

/// Write a whole source file to `path`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SrcFileDownload {
    /// Identity of the source file.
    pub strong: Strong,
    /// Size of the source file.
    pub size: u64,
    /// Store-relative destination path.
    pub path: PathBuf,
}

/// Open the destination file and create a pre-sized temp file beside it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocalTemp {
    /// Handle shared with the copy and replace commands of this file.
    pub temp: TempId,
    /// Store-relative path of the destination file.
    pub path: PathBuf,
    /// Final size of the file.
    pub size: u64,
}

/// Copy bytes the destination file already has into the temp file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LocalTempCopy {
    /// Temp file being filled.
    pub temp: TempId,
    /// Store-relative path of the destination file.
    pub path: PathBuf,
    /// Offset in the existing destination file.
    pub local_offset: u64,
    /// Offset in the temp file.
    pub temp_offset: u64,
    /// Number of bytes.
    pub len: u64,
}

/// Copy bytes of the source file into the temp file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SrcTempCopy {
    /// Temp file being filled.
    pub temp: TempId,
    /// Store-relative path of the destination file.
    pub path: PathBuf,
    /// Identity of the source file.
    pub strong: Strong,
    /// Offset in the source file.
    pub src_offset: u64,
    /// Offset in the temp file.
    pub temp_offset: u64,
    /// Number of bytes.
    pub len: u64,
}

/// Swap the finished temp file in for the destination file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReplaceWithTemp {
    /// Temp file to commit.
    pub temp: TempId,
    /// Store-relative path of the destination file.
    pub path: PathBuf,
}

/// One step of a [`PatchPlan`](crate::PatchPlan).
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    /// See [`Keep`].
    Keep(Keep),
    /// See [`Transfer`].
    Transfer(Transfer),
    /// See [`Conflict`].
    Conflict(Conflict),
    /// See [`SrcFileDownload`].
    SrcFileDownload(SrcFileDownload),
    /// See [`LocalTemp`].
    LocalTemp(LocalTemp),
    /// See [`LocalTempCopy`].
    LocalTempCopy(LocalTempCopy),
    /// See [`SrcTempCopy`].
    SrcTempCopy(SrcTempCopy),
    /// See [`ReplaceWithTemp`].
    ReplaceWithTemp(ReplaceWithTemp),
}

impl Command {
    /// Store-relative path the command writes, or keeps for [`Keep`].
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Keep(keep) => &keep.path,
            Self::Transfer(transfer) => &transfer.to,
            Self::Conflict(conflict) => &conflict.path,
            Self::SrcFileDownload(download) => &download.path,
            Self::LocalTemp(temp) => &temp.path,
            Self::LocalTempCopy(copy) => &copy.path,
            Self::SrcTempCopy(copy) => &copy.path,
            Self::ReplaceWithTemp(replace) => &replace.path,
        }
    }

    /// Short lowercase name of the command variant.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Keep(_) => "keep",
            Self::Transfer(_) => "transfer",
            Self::Conflict(_) => "conflict",
            Self::SrcFileDownload(_) => "download",
            Self::LocalTemp(_) => "local-temp",
            Self::LocalTempCopy(_) => "local-temp-copy",
            Self::SrcTempCopy(_) => "src-temp-copy",
            Self::ReplaceWithTemp(_) => "replace-with-temp",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Keep(keep) => write!(f, "Keep {}", Shown(&keep.path)),
            Self::Transfer(transfer) => write!(
                f,
                "Transfer {} {} to {}",
                transfer.kind,
                Shown(&transfer.from),
                Shown(&transfer.to)
            ),
            Self::Conflict(conflict) => write!(
                f,
                "Conflict found at {} ({}), relocating",
                Shown(&conflict.path),
                conflict.occupant
            ),
            Self::SrcFileDownload(download) => write!(
                f,
                "Copy entire source {} to {} ({} bytes)",
                download.strong,
                Shown(&download.path),
                download.size
            ),
            Self::LocalTemp(temp) => write!(
                f,
                "Create a temporary file for {}, size={} bytes",
                Shown(&temp.path),
                temp.size
            ),
            Self::LocalTempCopy(copy) => write!(
                f,
                "Copy {} bytes from offset {} in target file {} to offset {} in temporary file",
                copy.len,
                copy.local_offset,
                Shown(&copy.path),
                copy.temp_offset
            ),
            Self::SrcTempCopy(copy) => write!(
                f,
                "Copy {} bytes from offset {} from source {} to offset {} in temporary file for {}",
                copy.len,
                copy.src_offset,
                copy.strong,
                copy.temp_offset,
                Shown(&copy.path)
            ),
            Self::ReplaceWithTemp(replace) => write!(
                f,
                "Replace {} with the temporary file",
                Shown(&replace.path)
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use checksums::strong_checksum;

    use super::*;

    #[test]
    fn commands_render_one_line_each() {
        let commands = [
            Command::Keep(Keep {
                path: PathBuf::new(),
            }),
            Command::Transfer(Transfer {
                from: PathBuf::from("a/old"),
                to: PathBuf::from("b/new"),
                kind: Kind::File,
            }),
            Command::Conflict(Conflict {
                path: PathBuf::from("foo/gloo"),
                occupant: Occupant::File,
            }),
            Command::SrcFileDownload(SrcFileDownload {
                strong: strong_checksum(b""),
                size: 0,
                path: PathBuf::from("empty"),
            }),
        ];
        let rendered: Vec<String> = commands.iter().map(ToString::to_string).collect();
        assert_eq!(rendered[0], "Keep .");
        assert_eq!(rendered[1], "Transfer file a/old to b/new");
        assert_eq!(rendered[2], "Conflict found at foo/gloo (file), relocating");
        assert_eq!(
            rendered[3],
            "Copy entire source da39a3ee5e6b4b0d3255bfef95601890afd80709 to empty (0 bytes)"
        );
        assert!(rendered.iter().all(|line| !line.contains('\n')));
    }

    #[test]
    fn path_reports_the_written_location() {
        let transfer = Command::Transfer(Transfer {
            from: PathBuf::from("x"),
            to: PathBuf::from("y"),
            kind: Kind::Dir,
        });
        assert_eq!(transfer.path(), Path::new("y"));
        assert_eq!(transfer.name(), "transfer");
    }
}
