// Logging module - Logging infrastructure
use crate::domain::error::{ProvisionError, ProvisionResult};
use std::io;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log verbosity chosen on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Verbose,
}

impl Verbosity {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else if verbose {
            Verbosity::Verbose
        } else {
            Verbosity::Normal
        }
    }

    /// Filter used when `RUST_LOG` is not set
    pub fn default_filter(&self) -> &'static str {
        match self {
            Verbosity::Quiet => "off",
            Verbosity::Normal => "bitswitch_config=warn",
            Verbosity::Verbose => "bitswitch_config=debug,warn",
        }
    }
}

/// Initialize logging to stderr; stdout is reserved for operator output
pub fn init_logging(verbosity: Verbosity) -> ProvisionResult<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(verbosity.default_filter()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(verbosity == Verbosity::Verbose)
                .with_level(true),
        )
        .try_init()
        .map_err(|e| ProvisionError::Config {
            message: format!("Failed to initialize logging: {}", e),
        })?;

    tracing::debug!("Logging initialized ({:?})", verbosity);
    Ok(())
}
