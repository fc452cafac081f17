use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::WalkError;
use crate::walker::Walker;

pub(crate) type ExcludeFn = Arc<dyn Fn(&Path) -> bool + Send + Sync>;

/// Configures a filesystem traversal rooted at a specific path.
#[derive(Clone)]
pub struct WalkBuilder {
    root: PathBuf,
    include_root: bool,
    exclude: Option<ExcludeFn>,
}

impl WalkBuilder {
    /// Creates a new builder that will traverse the provided root path.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            include_root: true,
            exclude: None,
        }
    }

    /// Controls whether the root entry should be included in the output.
    ///
    /// When disabled, traversal starts directly with the root's children.
    #[must_use]
    pub const fn include_root(mut self, include: bool) -> Self {
        self.include_root = include;
        self
    }

    /// Skips every entry whose path relative to the root satisfies
    /// `predicate`.
    ///
    /// Excluded directories are not descended into. The root itself is never
    /// subject to the predicate.
    #[must_use]
    pub fn exclude<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&Path) -> bool + Send + Sync + 'static,
    {
        self.exclude = Some(Arc::new(predicate));
        self
    }

    /// Builds a [`Walker`] using the configured options.
    pub fn build(self) -> Result<Walker, WalkError> {
        let metadata = fs::symlink_metadata(&self.root)
            .map_err(|error| WalkError::Root {
                path: self.root.clone(),
                source: error,
            })?;
        Walker::new(self.root, metadata, self.include_root, self.exclude)
    }
}

impl fmt::Debug for WalkBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkBuilder")
            .field("root", &self.root)
            .field("include_root", &self.include_root)
            .field("exclude", &self.exclude.is_some())
            .finish()
    }
}
