use super::StopgateConfig;

impl StopgateConfig {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = std::env::var("STOPGATE_ENDPOINT")
            && !endpoint.is_empty()
        {
            self.remote.endpoint = Some(endpoint);
        }

        if let Ok(key) = std::env::var("STOPGATE_API_KEY")
            && !key.is_empty()
        {
            self.remote.api_key = Some(key);
        }

        if let Ok(timeout) = std::env::var("STOPGATE_TIMEOUT_MS")
            && let Ok(timeout) = timeout.parse::<u64>()
            && timeout > 0
        {
            self.remote.timeout_ms = timeout;
        }

        if let Ok(retries) = std::env::var("STOPGATE_MAX_RETRIES")
            && let Ok(retries) = retries.parse::<u32>()
        {
            self.remote.max_retries = retries;
        }

        if let Ok(dir) = std::env::var("STOPGATE_DIRECTIVE_DIR")
            && !dir.is_empty()
        {
            self.local.directory = Some(dir);
        }

        if let Ok(url) = std::env::var("STOPGATE_DIRECTIVE_URL")
            && !url.is_empty()
        {
            self.local.url = Some(url);
        }

        if let Ok(level) = std::env::var("STOPGATE_LOG_LEVEL")
            && !level.is_empty()
        {
            self.observability.log_level = level;
        }
    }
}
