use crate::config::ObservabilityConfig;
use crate::error::{ClarifyError, Result};
use std::str::FromStr;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Parse a level name ("error" through "trace", any case).
pub fn parse_level(level: &str) -> Result<Level> {
    Level::from_str(level.trim())
        .map_err(|_| ClarifyError::Configuration(format!("unknown log level `{level}`")))
}

/// Install a global fmt subscriber capped at `level`.
///
/// For integrators without their own subscriber. Fails if one is already
/// installed.
pub fn init_logging(level: &str) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(parse_level(level)?)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ClarifyError::Configuration(format!("setting default subscriber failed: {e}")))
}

pub fn init_from_config(config: &ObservabilityConfig) -> Result<()> {
    init_logging(&config.log_level)
}
