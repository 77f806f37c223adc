use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalConfig {
    /// Directory of `*.json` directive files. `~` is expanded.
    #[serde(default)]
    pub directory: Option<String>,
    /// URL returning one directive or an array of them.
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default = "default_metrics_buffer_capacity")]
    pub metrics_buffer_capacity: usize,
}

fn default_metrics_buffer_capacity() -> usize {
    1_000
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            directory: None,
            url: None,
            metrics_buffer_capacity: default_metrics_buffer_capacity(),
        }
    }
}

impl LocalConfig {
    pub fn is_configured(&self) -> bool {
        self.directory.as_deref().is_some_and(|d| !d.trim().is_empty())
            || self.url.as_deref().is_some_and(|u| !u.trim().is_empty())
    }
}
