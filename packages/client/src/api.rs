//! Remote calls made while driving an upload.

use async_trait::async_trait;
use common::VideoStatus;
use common::api::{
    CreateVideoRequest, ProviderErrorBody, ProviderUpload, StatusResponse, TranscodeRequest,
    UploadSignature,
};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::ClientConfig;
use crate::error::ClientError;

/// A video file selected for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// The calls the coordinator needs, one per lifecycle step.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    async fn fetch_signature(&self) -> Result<UploadSignature, ClientError>;

    /// Upload the raw file straight to the provider.
    async fn upload_to_provider(
        &self,
        file: &VideoFile,
        signature: &UploadSignature,
        api_key: &str,
    ) -> Result<ProviderUpload, ClientError>;

    async fn create_record(&self, request: &CreateVideoRequest) -> Result<(), ClientError>;

    async fn trigger_transcode(&self, public_id: &str) -> Result<(), ClientError>;

    async fn probe_status(&self, public_id: &str) -> Result<VideoStatus, ClientError>;
}

/// Error body of the catalog service.
#[derive(Deserialize)]
struct ServerErrorBody {
    message: String,
}

async fn server_error(response: reqwest::Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ServerErrorBody>(&text) {
        Ok(body) => format!("{status}: {}", body.message),
        Err(_) => format!("{status}: {text}"),
    }
}

/// [`UploadBackend`] over HTTP against the catalog service and the provider.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    server_url: String,
    upload_url: String,
}

impl HttpBackend {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            server_url: config.server.url.trim_end_matches('/').to_string(),
            upload_url: config.upload_url(),
        }
    }

    fn api(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.server_url, path)
    }
}

/// `{server}/api/v1/videos/{public_id}/status`, with the public ID kept as a
/// single path segment even when it contains folder slashes.
fn status_url(server_url: &str, public_id: &str) -> Result<reqwest::Url, ClientError> {
    let mut url = reqwest::Url::parse(server_url)
        .map_err(|e| ClientError::Probe(format!("invalid server url {server_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| ClientError::Probe(format!("invalid server url {server_url}")))?
        .pop_if_empty()
        .extend(["api", "v1", "videos", public_id, "status"]);
    Ok(url)
}

#[async_trait]
impl UploadBackend for HttpBackend {
    async fn fetch_signature(&self) -> Result<UploadSignature, ClientError> {
        let response = self.client.get(self.api("/upload/signature")).send().await?;
        if !response.status().is_success() {
            return Err(ClientError::Signature(server_error(response).await));
        }
        Ok(response.json().await?)
    }

    #[instrument(skip_all, fields(file = %file.file_name, size = file.bytes.len()))]
    async fn upload_to_provider(
        &self,
        file: &VideoFile,
        signature: &UploadSignature,
        api_key: &str,
    ) -> Result<ProviderUpload, ClientError> {
        let part = Part::bytes(file.bytes.clone()).file_name(file.file_name.clone());
        let form = Form::new()
            .part("file", part)
            .text("api_key", api_key.to_string())
            .text("timestamp", signature.timestamp.to_string())
            .text("signature", signature.signature.clone())
            .text(
                "signature_algorithm",
                signature.signature_algorithm.as_str(),
            );

        let response = self
            .client
            .post(&self.upload_url)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ProviderErrorBody>(&text)
                .ok()
                .and_then(|body| body.error)
                .map(|detail| detail.message)
                .unwrap_or(text);
            return Err(ClientError::Upload(format!("{status}: {message}")));
        }

        let upload: ProviderUpload = response.json().await?;
        debug!(public_id = %upload.public_id, "Provider stored upload");
        Ok(upload)
    }

    async fn create_record(&self, request: &CreateVideoRequest) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.api("/videos"))
            .json(request)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::Catalog(server_error(response).await));
        }
        Ok(())
    }

    async fn trigger_transcode(&self, public_id: &str) -> Result<(), ClientError> {
        let response = self
            .client
            .post(self.api("/videos/process"))
            .json(&TranscodeRequest {
                public_id: Some(public_id.to_string()),
            })
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::Transcode(server_error(response).await));
        }
        Ok(())
    }

    async fn probe_status(&self, public_id: &str) -> Result<VideoStatus, ClientError> {
        let response = self
            .client
            .get(status_url(&self.server_url, public_id)?)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ClientError::Probe(server_error(response).await));
        }
        let body: StatusResponse = response.json().await?;
        Ok(body.status)
    }
}
