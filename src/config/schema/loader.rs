use super::StopgateConfig;
use anyhow::{Context, Result};
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};

impl StopgateConfig {
    /// Default location: `~/.stopgate/config.toml`.
    pub fn default_path() -> Result<PathBuf> {
        let home = UserDirs::new()
            .map(|u| u.home_dir().to_path_buf())
            .context("Could not find home directory")?;
        Ok(home.join(".stopgate").join("config.toml"))
    }

    /// Load the default config file if present, else defaults, then apply
    /// environment overrides. Nothing is written to disk.
    pub fn load_or_default() -> Result<Self> {
        let path = Self::default_path()?;
        let mut config = if path.exists() {
            Self::read_file(&path)?
        } else {
            Self {
                config_path: path,
                ..Self::default()
            }
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load an explicit config file, then apply environment overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::read_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let mut config: StopgateConfig =
            toml::from_str(&contents).context("Failed to parse config file")?;
        config.config_path = path.to_path_buf();
        Ok(config)
    }
}
