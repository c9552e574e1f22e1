use super::http_utils::{create_http_client, describe_error_response, describe_transport_error};
use super::types::{
    ImageOptions, ImagePredictions, LongRunningResponse, OperationHandle, OperationStatus,
    PredictRequest, VideoOptions,
};
use super::{MediaApi, MediaError};
use crate::config::{self, Settings, API_KEY_HEADER};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client as HttpClient;
use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Connection and limit settings for [`MediaClient`]
#[derive(Debug, Clone)]
pub struct MediaClientConfig {
    /// Proxy base URL without a trailing slash
    pub base_url: String,
    pub api_key: String,
    pub imagen_model: String,
    pub veo_model: String,
    pub image_timeout: Duration,
    pub submit_timeout: Duration,
    pub status_timeout: Duration,
    pub download_timeout: Duration,
    pub download_limit_bytes: u64,
}

impl MediaClientConfig {
    /// Builds the client configuration from settings and environment tunables.
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            base_url: settings.proxy_base().to_string(),
            api_key: settings.api_key.clone(),
            imagen_model: settings.imagen_model.clone(),
            veo_model: settings.veo_model.clone(),
            image_timeout: config::get_imagen_timeout(),
            submit_timeout: config::get_veo_submit_timeout(),
            status_timeout: Duration::from_secs(config::VEO_STATUS_TIMEOUT_SECS),
            download_timeout: config::get_download_timeout(),
            download_limit_bytes: config::get_download_limit_bytes(),
        }
    }
}

/// HTTP client for the Imagen and Veo endpoints behind the proxy
pub struct MediaClient {
    http: HttpClient,
    config: MediaClientConfig,
}

impl MediaClient {
    /// Creates a client with its own connection pool.
    #[must_use]
    pub fn new(config: MediaClientConfig) -> Self {
        Self {
            http: create_http_client(),
            config,
        }
    }

    fn image_url(&self) -> String {
        format!(
            "{}/v1/projects/any-project-id/locations/any-location/publishers/google/models/{}:predict",
            self.config.base_url, self.config.imagen_model
        )
    }

    fn video_url(&self) -> String {
        format!(
            "{}/v1beta/models/{}:predictLongRunning",
            self.config.base_url, self.config.veo_model
        )
    }

    fn operation_url(&self, operation_id: &str) -> String {
        format!("{}/v1beta/operations/{operation_id}", self.config.base_url)
    }

    /// Only URLs served by the proxy get the API key attached.
    fn is_proxy_url(&self, uri: &str) -> bool {
        uri.strip_prefix(&self.config.base_url)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
    }

    async fn post_predict<P: Serialize + Sync>(
        &self,
        url: &str,
        prompt: &str,
        parameters: &P,
        timeout: Duration,
    ) -> Result<reqwest::Response, MediaError> {
        let response = self
            .http
            .post(url)
            .header(API_KEY_HEADER, &self.config.api_key)
            .timeout(timeout)
            .json(&PredictRequest::new(prompt, parameters))
            .send()
            .await
            .map_err(|e| MediaError::Upstream(describe_transport_error(&e)))?;

        if !response.status().is_success() {
            return Err(MediaError::Upstream(describe_error_response(response).await));
        }
        Ok(response)
    }

    async fn stream_to_file(&self, uri: &str, dest: &Path) -> Result<u64, MediaError> {
        let limit = self.config.download_limit_bytes;

        let mut request = self.http.get(uri);
        if self.is_proxy_url(uri) {
            request = request.header(API_KEY_HEADER, &self.config.api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MediaError::Download(describe_transport_error(&e)))?;

        if !response.status().is_success() {
            return Err(MediaError::Download(describe_error_response(response).await));
        }

        if let Some(length) = response.content_length() {
            if length > limit {
                return Err(MediaError::Download(format!(
                    "asset is {length} bytes, above the {limit} byte limit"
                )));
            }
        }

        let mut file = tokio::fs::File::create(dest).await.map_err(|e| {
            MediaError::Download(format!("cannot create {}: {e}", dest.display()))
        })?;

        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| MediaError::Download(describe_transport_error(&e)))?;
            written = written.saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
            if written > limit {
                return Err(MediaError::Download(format!(
                    "asset exceeded the {limit} byte limit while streaming"
                )));
            }
            file.write_all(&chunk)
                .await
                .map_err(|e| MediaError::Download(format!("write failed: {e}")))?;
        }

        file.flush()
            .await
            .map_err(|e| MediaError::Download(format!("flush failed: {e}")))?;

        Ok(written)
    }
}

#[async_trait]
impl MediaApi for MediaClient {
    async fn submit_image(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<ImagePredictions, MediaError> {
        let url = self.image_url();
        debug!(model = %self.config.imagen_model, "Submitting Imagen request");

        let response = self
            .post_predict(&url, prompt, options, self.config.image_timeout)
            .await?;

        let predictions: ImagePredictions = response
            .json()
            .await
            .map_err(|e| MediaError::Upstream(format!("invalid predict response: {e}")))?;

        info!(
            count = predictions.predictions.len(),
            "Imagen returned predictions"
        );
        Ok(predictions)
    }

    async fn submit_video(
        &self,
        prompt: &str,
        options: &VideoOptions,
    ) -> Result<OperationHandle, MediaError> {
        let url = self.video_url();
        info!(model = %self.config.veo_model, "Initiating Veo text-to-video request");

        let response = self
            .post_predict(&url, prompt, options, self.config.submit_timeout)
            .await?;

        let body: LongRunningResponse = response
            .json()
            .await
            .map_err(|e| MediaError::Upstream(format!("invalid operation response: {e}")))?;

        let handle = body
            .name
            .as_deref()
            .and_then(OperationHandle::from_name)
            .ok_or_else(|| {
                MediaError::Upstream("response did not include an operation name".to_string())
            })?;

        info!(operation_id = %handle.operation_id, "Veo operation started");
        Ok(handle)
    }

    async fn get_operation(&self, operation_id: &str) -> Result<OperationStatus, MediaError> {
        let response = self
            .http
            .get(self.operation_url(operation_id))
            .header(API_KEY_HEADER, &self.config.api_key)
            .timeout(self.config.status_timeout)
            .send()
            .await
            .map_err(|e| MediaError::Transient(describe_transport_error(&e)))?;

        if !response.status().is_success() {
            return Err(MediaError::Transient(
                describe_error_response(response).await,
            ));
        }

        response
            .json()
            .await
            .map_err(|e| MediaError::Transient(format!("invalid status response: {e}")))
    }

    async fn download_asset(&self, uri: &str, dest: &Path) -> Result<u64, MediaError> {
        let timeout = self.config.download_timeout;
        let result = match tokio::time::timeout(timeout, self.stream_to_file(uri, dest)).await {
            Ok(result) => result,
            Err(_) => Err(MediaError::Download(format!(
                "download timed out after {}s",
                timeout.as_secs()
            ))),
        };

        match &result {
            Ok(bytes) => info!(
                file = %crate::utils::display_name(dest),
                bytes,
                "Asset downloaded"
            ),
            Err(e) => {
                warn!(error = %e, "Asset download failed, removing partial file");
                if let Err(remove_err) = tokio::fs::remove_file(dest).await {
                    if remove_err.kind() != std::io::ErrorKind::NotFound {
                        warn!(error = %remove_err, "Failed to remove partial download");
                    }
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> MediaClient {
        MediaClient::new(MediaClientConfig {
            base_url: "https://proxy.test".to_string(),
            api_key: "key".to_string(),
            imagen_model: config::DEFAULT_IMAGEN_MODEL.to_string(),
            veo_model: config::DEFAULT_VEO_MODEL.to_string(),
            image_timeout: Duration::from_secs(1),
            submit_timeout: Duration::from_secs(1),
            status_timeout: Duration::from_secs(1),
            download_timeout: Duration::from_secs(1),
            download_limit_bytes: 1024,
        })
    }

    #[test]
    fn endpoints_follow_proxy_layout() {
        let client = client();
        assert_eq!(
            client.image_url(),
            "https://proxy.test/v1/projects/any-project-id/locations/any-location/publishers/google/models/imagen-3.0-generate-002:predict"
        );
        assert_eq!(
            client.video_url(),
            "https://proxy.test/v1beta/models/veo-3.0-generate-preview:predictLongRunning"
        );
        assert_eq!(
            client.operation_url("abc123"),
            "https://proxy.test/v1beta/operations/abc123"
        );
    }

    #[test]
    fn api_key_only_goes_to_the_proxy() {
        let client = client();
        assert!(client.is_proxy_url("https://proxy.test/v1beta/files/x:download"));
        assert!(!client.is_proxy_url("https://proxy.test.evil.com/x.mp4"));
        assert!(!client.is_proxy_url("https://storage.example/x.mp4"));
    }
}
