use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::error::ClientError;
use crate::poll::PollPolicy;

#[derive(Debug, Deserialize, Clone)]
pub struct ServerEndpoint {
    /// Base URL of the catalog service, e.g. `http://127.0.0.1:3000`.
    pub url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProviderEndpoint {
    pub api_base_url: String,
    pub cloud_name: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    /// Stop after this many probes. Unbounded when unset.
    #[serde(default)]
    pub max_attempts: Option<u32>,
    /// Upper bound for the delay after consecutive probe errors. Defaults to the interval.
    #[serde(default)]
    pub error_backoff_max_ms: Option<u64>,
}

fn default_interval_ms() -> u64 {
    5000
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_attempts: None,
            error_backoff_max_ms: None,
        }
    }
}

impl PollingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::Message(
                "polling.interval_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub fn policy(&self) -> PollPolicy {
        let interval = Duration::from_millis(self.interval_ms);
        PollPolicy {
            interval,
            max_attempts: self.max_attempts,
            error_backoff_max: self
                .error_backoff_max_ms
                .map(Duration::from_millis)
                .unwrap_or(interval)
                .max(interval),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ClientConfig {
    pub server: ServerEndpoint,
    pub provider: ProviderEndpoint,
    #[serde(default)]
    pub polling: PollingConfig,
}

impl ClientConfig {
    pub fn load(path: Option<&str>) -> Result<Self, ClientError> {
        let config_path = path.map(str::to_string).unwrap_or_else(|| {
            std::env::var("TOONSTREAM_CLIENT_CONFIG").unwrap_or_else(|_| "config/client".into())
        });

        let s = Config::builder()
            .set_default("server.url", "http://127.0.0.1:3000")?
            .set_default("provider.api_base_url", "https://api.cloudinary.com")?
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., TOONSTREAM__PROVIDER__CLOUD_NAME)
            .add_source(Environment::with_prefix("TOONSTREAM").separator("__"))
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.polling.validate()?;
        Ok(config)
    }

    /// Direct upload endpoint of the provider.
    pub fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/video/upload",
            self.provider.api_base_url.trim_end_matches('/'),
            self.provider.cloud_name
        )
    }
}
