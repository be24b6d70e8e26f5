use std::collections::BTreeMap;

use async_trait::async_trait;
use common::api::ProviderErrorBody;
use common::signing::sign_params;
use tracing::{debug, instrument};

use super::{EagerTranscode, ProviderError, TranscodeProvider};
use crate::config::ProviderConfig;

/// Talks to the provider's REST API using signed form requests.
#[derive(Debug, Clone)]
pub struct HttpTranscodeProvider {
    client: reqwest::Client,
    config: ProviderConfig,
}

impl HttpTranscodeProvider {
    pub fn new(config: ProviderConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn explicit_url(&self) -> String {
        format!(
            "{}/v1_1/{}/video/explicit",
            self.config.api_base_url.trim_end_matches('/'),
            self.config.cloud_name
        )
    }

    /// Signed form fields for an `explicit` call.
    fn explicit_form(
        &self,
        job: &EagerTranscode,
        timestamp: i64,
    ) -> Result<BTreeMap<String, String>, ProviderError> {
        let secret = self.config.secret().map_err(ProviderError::MissingSecret)?;

        let mut params = BTreeMap::new();
        params.insert("eager".to_string(), job.profile.clone());
        params.insert("eager_async".to_string(), "true".to_string());
        params.insert(
            "eager_notification_url".to_string(),
            job.notification_url.clone(),
        );
        params.insert("public_id".to_string(), job.public_id.clone());
        params.insert("timestamp".to_string(), timestamp.to_string());
        params.insert("type".to_string(), "upload".to_string());

        let signature = sign_params(&params, secret, self.config.signature_algorithm);
        params.insert("signature".to_string(), signature);
        params.insert(
            "signature_algorithm".to_string(),
            self.config.signature_algorithm.as_str().to_string(),
        );
        if let Some(api_key) = &self.config.api_key {
            params.insert("api_key".to_string(), api_key.clone());
        }
        Ok(params)
    }
}

#[async_trait]
impl TranscodeProvider for HttpTranscodeProvider {
    #[instrument(skip(self, job), fields(public_id = %job.public_id))]
    async fn request_eager_transcode(
        &self,
        job: &EagerTranscode,
    ) -> Result<serde_json::Value, ProviderError> {
        let form = self.explicit_form(job, chrono::Utc::now().timestamp())?;

        let response = self
            .client
            .post(self.explicit_url())
            .form(&form)
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
            return Err(ProviderError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let ack = response.json::<serde_json::Value>().await?;
        debug!("Provider accepted eager transcode");
        Ok(ack)
    }
}
