//! Logging setup
//!
//! `tracing` events go to stderr so stdout carries only answers and JSON.
//! `RUST_LOG` overrides the level derived from `-q/-v/-vv`.

use tracing_subscriber::EnvFilter;

use crate::cli::Verbosity;

/// Filter from `RUST_LOG` when set, else from the verbosity flags
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.filter_directive()))
}

/// Install the global subscriber; a second call is a no-op
pub fn init_logging(verbosity: Verbosity) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbosity))
        .with_writer(std::io::stderr)
        .with_target(matches!(verbosity, Verbosity::VeryVerbose))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice_is_harmless() {
        init_logging(Verbosity::Quiet);
        init_logging(Verbosity::Verbose);
    }
}
