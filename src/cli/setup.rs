//! Runtime setup for the CLI: logging and progress.

use crate::progress::{ProgressConfig, ProgressManager};
use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Default log filter for a verbosity count, used when `RUST_LOG` is unset.
pub fn default_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    }
}

/// Install the tracing subscriber once at startup.
///
/// `RUST_LOG` wins over `-v`. `log` records from library code are forwarded
/// into the subscriber.
pub fn init_logging(verbosity: u8) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbosity)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(verbosity > 1))
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))
}

pub fn progress_manager(quiet: bool, verbosity: u8) -> ProgressManager {
    ProgressManager::new(ProgressConfig::from_env(quiet, verbosity))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter_by_verbosity() {
        assert_eq!(default_filter(0), "info");
        assert_eq!(default_filter(1), "debug");
        assert_eq!(default_filter(5), "trace");
    }
}
