use common::SignatureAlgorithm;
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct CorsConfig {
    pub allow_origins: Vec<String>,
    pub max_age: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub cors: CorsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

/// Credentials and job settings for the transcoding provider.
#[derive(Debug, Deserialize, Clone)]
pub struct ProviderConfig {
    pub cloud_name: String,
    /// Public key handed to upload clients alongside each signature.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Account secret. Requests that need it fail with a configuration error when absent.
    #[serde(default)]
    pub api_secret: Option<String>,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    /// Eager transformation that produces the adaptive-bitrate renditions.
    #[serde(default = "default_eager_profile")]
    pub eager_profile: String,
    /// Externally reachable base URL of this service, used for the completion callback.
    pub public_app_url: String,
    #[serde(default)]
    pub signature_algorithm: SignatureAlgorithm,
    /// Require a valid provider signature on completion notifications.
    #[serde(default)]
    pub verify_notifications: bool,
    #[serde(default = "default_notification_max_age_secs")]
    pub notification_max_age_secs: u64,
}

fn default_api_base_url() -> String {
    "https://api.cloudinary.com".into()
}
fn default_eager_profile() -> String {
    "sp_full_hd/f_m3u8".into()
}
fn default_notification_max_age_secs() -> u64 {
    7200
}

impl ProviderConfig {
    /// The account secret, or a description of what is missing.
    pub fn secret(&self) -> Result<&str, String> {
        match self.api_secret.as_deref() {
            Some(secret) if !secret.is_empty() => Ok(secret),
            _ => Err("provider.api_secret is missing from the configuration".into()),
        }
    }

    /// Callback URL registered with every transcode job.
    pub fn notification_url(&self) -> String {
        format!(
            "{}/api/v1/webhooks/transcode",
            self.public_app_url.trim_end_matches('/')
        )
    }
}

/// Re-trigger sweep for records stuck in `processing`.
#[derive(Debug, Deserialize, Clone)]
pub struct ReconcileConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,
    /// Age of the last trigger after which a processing record counts as stuck.
    #[serde(default = "default_stuck_after_secs")]
    pub stuck_after_secs: u64,
    /// Total trigger attempts per record, including the client's own.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: i32,
}

fn default_scan_interval_secs() -> u64 {
    300
}
fn default_stuck_after_secs() -> u64 {
    1800
}
fn default_max_attempts() -> i32 {
    3
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            scan_interval_secs: default_scan_interval_secs(),
            stuck_after_secs: default_stuck_after_secs(),
            max_attempts: default_max_attempts(),
        }
    }
}

impl ReconcileConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan_interval_secs == 0 {
            return Err(ConfigError::Message(
                "reconcile.scan_interval_secs must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub provider: ProviderConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("TOONSTREAM_CONFIG").unwrap_or_else(|_| "config/config".to_string());

        let s = Config::builder()
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 3000)?
            .set_default("server.cors.allow_origins", Vec::<String>::new())?
            .set_default("server.cors.max_age", 3600)?
            .set_default("database.url", "sqlite://toonstream.db?mode=rwc")?
            .set_default("provider.public_app_url", "http://127.0.0.1:3000")?
            .add_source(File::with_name(&config_path).required(false))
            // Override from environment (e.g., TOONSTREAM__PROVIDER__API_SECRET)
            .add_source(Environment::with_prefix("TOONSTREAM").separator("__"))
            .build()?;

        let config: Self = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reconcile.validate()
    }
}
