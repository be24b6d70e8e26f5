use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("An upload is already in progress")]
    Busy,

    #[error("Upload credentials do not include an API key")]
    MissingApiKey,

    #[error("Failed to obtain upload credentials: {0}")]
    Signature(String),

    #[error("Upload to provider failed: {0}")]
    Upload(String),

    #[error("Failed to register video: {0}")]
    Catalog(String),

    #[error("Failed to start transcoding: {0}")]
    Transcode(String),

    #[error("Status check failed: {0}")]
    Probe(String),

    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
}
