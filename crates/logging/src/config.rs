//! Verbosity configuration derived from the CLI's `-v` count.

use tracing::Level;
use tracing_subscriber::EnvFilter;

use super::levels::{Subsystem, SubsystemLevels};

/// Per-subsystem verbosity configuration.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VerbosityConfig {
    /// Level of each subsystem.
    pub levels: SubsystemLevels,
}

impl VerbosityConfig {
    /// Creates a configuration from a repeated verbose flag count.
    ///
    /// Level `0` reports only warnings. Level `1` adds informational events for
    /// the user-facing phases (indexing, planning, execution, pruning, modes).
    /// Level `2` raises every subsystem to debug. Level `3` and above enable
    /// trace output everywhere, including per-window matcher events.
    #[must_use]
    pub fn from_verbose_level(level: u8) -> Self {
        let mut config = Self::default();

        match level {
            0 => {}
            1 => {
                config.levels.index = 1;
                config.levels.plan = 1;
                config.levels.exec = 1;
                config.levels.clean = 1;
                config.levels.mode = 1;
            }
            2 => {
                config.levels.walk = 1;
                config.levels.index = 2;
                config.levels.matching = 1;
                config.levels.plan = 2;
                config.levels.exec = 2;
                config.levels.clean = 2;
                config.levels.mode = 2;
                config.levels.store = 2;
            }
            _ => {
                for subsystem in Subsystem::ALL {
                    config.levels.set(subsystem, 3);
                }
            }
        }

        config
    }

    /// Overrides the level of a single subsystem.
    #[must_use]
    pub fn with_level(mut self, subsystem: Subsystem, level: u8) -> Self {
        self.levels.set(subsystem, level);
        self
    }

    /// Returns the tracing level enabled for `subsystem`.
    #[must_use]
    pub const fn level(&self, subsystem: Subsystem) -> Level {
        match self.levels.get(subsystem) {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Renders the configuration as `EnvFilter` directives.
    ///
    /// Events outside the `dirsync::*` targets are limited to warnings.
    #[must_use]
    pub fn directives(&self) -> String {
        let mut out = String::from("warn");
        for subsystem in Subsystem::ALL {
            let level = self.level(subsystem).as_str().to_ascii_lowercase();
            out.push(',');
            out.push_str(subsystem.target());
            out.push('=');
            out.push_str(&level);
        }
        out
    }

    /// Builds a filter from this configuration alone, ignoring `RUST_LOG`.
    #[must_use]
    pub fn filter(&self) -> EnvFilter {
        EnvFilter::new(self.directives())
    }
}
