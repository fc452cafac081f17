//! Convenience macros that pin events to a dirsync subsystem target.
//!
//! Each macro forwards to the matching `tracing` macro with a fixed level and
//! the `dirsync::<subsystem>` target, so verbosity can be filtered per
//! subsystem with [`VerbosityConfig`](crate::VerbosityConfig) or `RUST_LOG`.

/// Emit a traversal event at `trace` level.
///
/// # Example
/// ```ignore
/// trace_walk!("entering directory {}", path.display());
/// ```
#[macro_export]
macro_rules! trace_walk {
    ($($arg:tt)*) => {
        ::tracing::trace!(target: "dirsync::walk", $($arg)*);
    };
}

/// Emit a indexing event at `debug` level.
///
/// # Example
/// ```ignore
/// trace_index!("hashed {} blocks", count);
/// ```
#[macro_export]
macro_rules! trace_index {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "dirsync::index", $($arg)*);
    };
}

/// Emit a block matching event at `trace` level.
///
/// # Example
/// ```ignore
/// trace_match!("weak hit at offset {}", offset);
/// ```
#[macro_export]
macro_rules! trace_match {
    ($($arg:tt)*) => {
        ::tracing::trace!(target: "dirsync::match", $($arg)*);
    };
}

/// Emit a patch planning event at `debug` level.
///
/// # Example
/// ```ignore
/// trace_plan!("planned {} commands", count);
/// ```
#[macro_export]
macro_rules! trace_plan {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "dirsync::plan", $($arg)*);
    };
}

/// Emit a plan execution event at `info` level.
///
/// # Example
/// ```ignore
/// trace_exec!("executing {}", command);
/// ```
#[macro_export]
macro_rules! trace_exec {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "dirsync::exec", $($arg)*);
    };
}

/// Emit a destination pruning event at `info` level.
///
/// # Example
/// ```ignore
/// trace_clean!("removing {}", path.display());
/// ```
#[macro_export]
macro_rules! trace_clean {
    ($($arg:tt)*) => {
        ::tracing::info!(target: "dirsync::clean", $($arg)*);
    };
}

/// Emit a permission propagation event at `debug` level.
///
/// # Example
/// ```ignore
/// trace_mode!("chmod {:o} {}", mode, path.display());
/// ```
#[macro_export]
macro_rules! trace_mode {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "dirsync::mode", $($arg)*);
    };
}

/// Emit a local store event at `debug` level.
///
/// # Example
/// ```ignore
/// trace_store!("relocated {} to {}", from.display(), to.display());
/// ```
#[macro_export]
macro_rules! trace_store {
    ($($arg:tt)*) => {
        ::tracing::debug!(target: "dirsync::store", $($arg)*);
    };
}
