//! Subscriber setup for the binary
//!
//! `PATTERNKIT_LOG` takes any `EnvFilter` directive (e.g. `patternkit::migration=debug`).
//! Without it, the `[logging] level` from config applies. Output goes to stderr so
//! `--json` stdout stays parseable.

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "PATTERNKIT_LOG";

/// Build the filter from the environment, falling back to `level`
pub fn filter(level: &str) -> EnvFilter {
  EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global fmt subscriber; later calls are no-ops
pub fn init(level: &str) {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter(level))
    .with_writer(std::io::stderr)
    .with_target(false)
    .try_init();
}
