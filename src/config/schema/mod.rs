mod env_overrides;
mod loader;
mod local;
mod observability;
mod remote;
#[cfg(test)]
mod test_env;

pub use local::LocalConfig;
pub use observability::ObservabilityConfig;
pub use remote::RemoteConfig;

use crate::error::{ClarifyError, Result};
use crate::providers::local::{LatestVersionSelector, LocalProvider};
use crate::providers::remote::RemoteProvider;
use crate::providers::DirectiveProvider;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StopgateConfig {
    /// Path the config was read from - computed, not serialized
    #[serde(skip)]
    pub config_path: PathBuf,

    #[serde(default)]
    pub remote: RemoteConfig,

    #[serde(default)]
    pub local: LocalConfig,

    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl StopgateConfig {
    /// Build the active provider: remote when an endpoint is configured,
    /// otherwise local when a directory or url is configured.
    ///
    /// The local provider gets [`LatestVersionSelector`]; integrators that
    /// need another policy construct [`LocalProvider`] themselves.
    pub fn build_provider(&self) -> Result<Arc<dyn DirectiveProvider>> {
        if self.remote.is_configured() {
            self.remote.validate()?;
            tracing::info!("Using remote directive provider");
            return Ok(Arc::new(RemoteProvider::new(&self.remote)?));
        }
        if self.local.is_configured() {
            tracing::info!("Using local directive provider");
            return Ok(Arc::new(LocalProvider::from_config(
                &self.local,
                Arc::new(LatestVersionSelector),
            )?));
        }
        Err(ClarifyError::Configuration(
            "no directive provider configured: set [remote].endpoint or [local].directory/url"
                .into(),
        ))
    }
}
