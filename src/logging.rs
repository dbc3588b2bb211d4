//! Tracing setup for the command line binary.
//!
//! Events go to stderr so JSON written to stdout stays machine readable.

use tracing_subscriber::EnvFilter;

/// Level for a `-v` count, or `None` when no flag was given.
fn verbosity_level(verbosity: u8) -> Option<&'static str> {
    match verbosity {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    }
}

/// Build the filter: `RUST_LOG` first, then `-v`, then the configured level.
pub fn filter(verbosity: u8, config_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = verbosity_level(verbosity).unwrap_or(config_level);
        EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"))
    })
}

/// Install the global subscriber. Calling it twice is a no-op.
pub fn init(verbosity: u8, config_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbosity, config_level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

/// Initialize logging for tests.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
