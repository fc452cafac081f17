//! Subsystem identifiers and their per-subsystem verbosity table.

use std::fmt;

/// Engine subsystems that emit diagnostics under their own tracing target.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Subsystem {
    /// Filesystem traversal.
    Walk,
    /// Tree indexing and record streams.
    Index,
    /// Block matching of a source file against a destination file.
    Match,
    /// Patch planning.
    Plan,
    /// Plan execution.
    Exec,
    /// Removal of extraneous destination entries.
    Clean,
    /// Permission propagation.
    Mode,
    /// Local store reads and relocations.
    Store,
}

impl Subsystem {
    /// Every subsystem in a stable order.
    pub const ALL: [Self; 8] = [
        Self::Walk,
        Self::Index,
        Self::Match,
        Self::Plan,
        Self::Exec,
        Self::Clean,
        Self::Mode,
        Self::Store,
    ];

    /// Tracing target used by events from this subsystem.
    #[must_use]
    pub const fn target(self) -> &'static str {
        match self {
            Self::Walk => "dirsync::walk",
            Self::Index => "dirsync::index",
            Self::Match => "dirsync::match",
            Self::Plan => "dirsync::plan",
            Self::Exec => "dirsync::exec",
            Self::Clean => "dirsync::clean",
            Self::Mode => "dirsync::mode",
            Self::Store => "dirsync::store",
        }
    }

    /// Short name of the subsystem, the target without its `dirsync::` prefix.
    #[must_use]
    pub fn name(self) -> &'static str {
        let target = self.target();
        target.strip_prefix("dirsync::").unwrap_or(target)
    }

    /// Parses a subsystem from its short name (`"plan"`) or full target
    /// (`"dirsync::plan"`).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let short = name.strip_prefix("dirsync::").unwrap_or(name);
        Self::ALL.into_iter().find(|subsystem| subsystem.name() == short)
    }
}

impl fmt::Display for Subsystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target())
    }
}

/// Level table indexed by [`Subsystem`].
///
/// Levels follow the scale `0 = warn`, `1 = info`, `2 = debug`, `3+ = trace`.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SubsystemLevels {
    /// Traversal level.
    pub walk: u8,
    /// Indexing level.
    pub index: u8,
    /// Matching level.
    pub matching: u8,
    /// Planning level.
    pub plan: u8,
    /// Execution level.
    pub exec: u8,
    /// Pruning level.
    pub clean: u8,
    /// Permission level.
    pub mode: u8,
    /// Store level.
    pub store: u8,
}

impl SubsystemLevels {
    /// Returns the level configured for `subsystem`.
    #[must_use]
    pub const fn get(&self, subsystem: Subsystem) -> u8 {
        match subsystem {
            Subsystem::Walk => self.walk,
            Subsystem::Index => self.index,
            Subsystem::Match => self.matching,
            Subsystem::Plan => self.plan,
            Subsystem::Exec => self.exec,
            Subsystem::Clean => self.clean,
            Subsystem::Mode => self.mode,
            Subsystem::Store => self.store,
        }
    }

    /// Sets the level for `subsystem`.
    pub fn set(&mut self, subsystem: Subsystem, level: u8) {
        let slot = match subsystem {
            Subsystem::Walk => &mut self.walk,
            Subsystem::Index => &mut self.index,
            Subsystem::Match => &mut self.matching,
            Subsystem::Plan => &mut self.plan,
            Subsystem::Exec => &mut self.exec,
            Subsystem::Clean => &mut self.clean,
            Subsystem::Mode => &mut self.mode,
            Subsystem::Store => &mut self.store,
        };
        *slot = level;
    }
}
