//! Fabricates directory trees with repeatable content for tests.
//!
//! Trees are described with a small builder vocabulary:
//!
//! ```
//! use test_support::{TreeGen, b};
//!
//! let tg = TreeGen::new();
//! let spec = tg.d("foo", vec![
//!     tg.f("bar", vec![b(42, 65537)]),
//!     tg.d("", vec![tg.f("", vec![b(1, 1), b(2, 2)])]),
//! ]);
//! let tree = test_support::test_tree(&spec);
//! assert!(tree.root().join("bar").is_file());
//! ```
//!
//! Empty names are replaced with random printable names drawn from a PRNG
//! seeded with a fixed value, so the same description always yields the same
//! tree. File contents are runs of pseudo-random bytes identified by
//! `(seed, length)`; a shorter run with the same seed is a prefix of a longer
//! one, which makes append and truncate scenarios easy to express.

use std::cell::RefCell;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tempfile::TempDir;

const CHUNK_SIZE: usize = 8192;
const NAME_SEED: u64 = 42;

/// A run of generated bytes.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Bytes {
    /// PRNG seed.
    pub seed: u64,
    /// Number of bytes produced.
    pub len: u64,
}

/// Node of a tree description.
#[derive(Clone, Debug)]
pub enum Node {
    /// A directory and its entries.
    Dir {
        /// Entry name.
        name: String,
        /// Child entries.
        children: Vec<Node>,
    },
    /// A regular file whose content is the concatenation of its runs.
    File {
        /// Entry name.
        name: String,
        /// Content runs.
        contents: Vec<Bytes>,
    },
}

impl Node {
    /// Entry name of this node.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Dir { name, .. } | Self::File { name, .. } => name,
        }
    }
}

/// Builder for tree descriptions with deterministic random names.
///
/// Methods take `&self` so descriptions can be nested in a single expression.
#[derive(Debug)]
pub struct TreeGen {
    rng: RefCell<StdRng>,
}

impl Default for TreeGen {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeGen {
    /// Creates a generator with the fixed name seed.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: RefCell::new(StdRng::seed_from_u64(NAME_SEED)),
        }
    }

    /// Returns a random name of 3 to 19 printable ASCII characters, never `/`.
    pub fn random_name(&self) -> String {
        let mut rng = self.rng.borrow_mut();
        let len = rng.gen_range(3..20);
        let mut name = String::with_capacity(len);
        while name.len() < len {
            let c = char::from(rng.gen_range(0x20_u8..0x7e));
            if c != '/' {
                name.push(c);
            }
        }
        name
    }

    fn name_or_random(&self, name: &str) -> String {
        if name.is_empty() {
            self.random_name()
        } else {
            name.to_owned()
        }
    }

    /// Describes a directory. An empty `name` is replaced by a random one.
    pub fn d(&self, name: &str, children: Vec<Node>) -> Node {
        Node::Dir {
            name: self.name_or_random(name),
            children,
        }
    }

    /// Describes a file. An empty `name` is replaced by a random one.
    pub fn f(&self, name: &str, contents: Vec<Bytes>) -> Node {
        Node::File {
            name: self.name_or_random(name),
            contents,
        }
    }
}

/// Describes `len` bytes generated from `seed`.
#[must_use]
pub const fn b(seed: u64, len: u64) -> Bytes {
    Bytes { seed, len }
}

/// Returns the bytes described by `b(seed, len)`.
#[must_use]
pub fn generated_bytes(seed: u64, len: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(len as usize);
    let mut rng = StdRng::seed_from_u64(seed);
    out.resize(len as usize, 0);
    for chunk in out.chunks_mut(CHUNK_SIZE) {
        rng.fill_bytes(chunk);
    }
    out
}

fn write_run<W: Write>(writer: &mut W, run: Bytes) -> io::Result<()> {
    let mut rng = StdRng::seed_from_u64(run.seed);
    let mut chunk = [0_u8; CHUNK_SIZE];
    let mut remaining = run.len;
    while remaining > 0 {
        let n = remaining.min(CHUNK_SIZE as u64) as usize;
        rng.fill_bytes(&mut chunk[..n]);
        writer.write_all(&chunk[..n])?;
        remaining -= n as u64;
    }
    Ok(())
}

/// Appends the given runs to the file at `path`, creating it if needed.
pub fn append_runs(path: &Path, runs: &[Bytes]) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    for run in runs {
        write_run(&mut file, *run)?;
    }
    file.flush()
}

/// Replaces the content of the file at `path` with the given runs.
pub fn write_runs(path: &Path, runs: &[Bytes]) -> io::Result<()> {
    fs::write(path, [])?;
    append_runs(path, runs)
}

/// Creates `node` under `parent` and returns the created path.
pub fn fab(parent: &Path, node: &Node) -> io::Result<PathBuf> {
    let path = parent.join(node.name());
    match node {
        Node::Dir { children, .. } => {
            fs::create_dir(&path)?;
            for child in children {
                fab(&path, child)?;
            }
        }
        Node::File { contents, .. } => write_runs(&path, contents)?,
    }
    Ok(path)
}

/// A fabricated tree living in its own temporary directory.
#[derive(Debug)]
pub struct TestTree {
    temp: TempDir,
    root: PathBuf,
}

impl TestTree {
    /// Path of the fabricated top-level node.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Temporary directory containing the tree.
    #[must_use]
    pub fn temp_dir(&self) -> &Path {
        self.temp.path()
    }
}

/// Fabricates `node` inside a fresh temporary directory.
///
/// # Panics
///
/// Panics if the temporary directory or any entry cannot be created.
#[must_use]
pub fn test_tree(node: &Node) -> TestTree {
    let temp = tempfile::Builder::new()
        .prefix("treegen")
        .tempdir()
        .expect("create temporary directory");
    let root = fab(temp.path(), node).expect("fabricate tree");
    TestTree { temp, root }
}
