//! Installation of the global `tracing` subscriber.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

use super::config::VerbosityConfig;

/// Builds the filter used by [`init_tracing`].
///
/// A non-empty, parseable `RUST_LOG` wins over the configuration so users can
/// target individual subsystems (`RUST_LOG=dirsync::match=trace`).
#[must_use]
pub fn build_filter(config: &VerbosityConfig) -> EnvFilter {
    match std::env::var(EnvFilter::DEFAULT_ENV) {
        Ok(value) if !value.trim().is_empty() => {
            EnvFilter::try_new(&value).unwrap_or_else(|_| config.filter())
        }
        _ => config.filter(),
    }
}

/// Installs a formatter that writes events to standard error.
///
/// Returns `false` when a global subscriber was already installed, which is
/// common in tests that call into the CLI more than once.
pub fn init_tracing(config: VerbosityConfig) -> bool {
    init_tracing_with_writer(config, std::io::stderr)
}

/// Installs a formatter that writes events through `writer`.
pub fn init_tracing_with_writer<W>(config: VerbosityConfig, writer: W) -> bool
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(&config))
        .with_writer(writer)
        .with_target(true)
        .without_time()
        .try_init()
        .is_ok()
}
