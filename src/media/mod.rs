//! Client for the remote generative media API (Imagen and Veo)
//!
//! [`MediaApi`] is the seam the generation flows depend on; [`MediaClient`]
//! implements it over HTTP against the configured proxy.

/// `reqwest` implementation of [`MediaApi`]
pub mod client;
/// Shared HTTP request and error-summary helpers
pub mod http_utils;
/// Request options and wire types
pub mod types;

pub use client::{MediaClient, MediaClientConfig};
pub use types::{
    GenerateVideoResponse, ImageOptions, ImagePrediction, ImagePredictions, OperationError,
    OperationHandle, OperationStatus, VideoOptions, VideoSample,
};

use std::path::Path;
use thiserror::Error;

/// Errors returned by the media API
#[derive(Debug, Error)]
pub enum MediaError {
    /// The remote API rejected the request or answered with an unusable body
    #[error("Upstream error: {0}")]
    Upstream(String),
    /// Network failure or timeout; safe for the caller to retry
    #[error("Transient error: {0}")]
    Transient(String),
    /// The asset could not be fetched within the size and time limits
    #[error("Download error: {0}")]
    Download(String),
}

/// Interface to the generative media service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait MediaApi: Send + Sync {
    /// Run a synchronous image prediction.
    async fn submit_image(
        &self,
        prompt: &str,
        options: &ImageOptions,
    ) -> Result<ImagePredictions, MediaError>;

    /// Start a long-running video generation and return its operation handle.
    async fn submit_video(
        &self,
        prompt: &str,
        options: &VideoOptions,
    ) -> Result<OperationHandle, MediaError>;

    /// Fetch the current state of a long-running operation.
    async fn get_operation(&self, operation_id: &str) -> Result<OperationStatus, MediaError>;

    /// Stream an asset into `dest`, returning the number of bytes written.
    ///
    /// On failure no file is left at `dest`.
    async fn download_asset(&self, uri: &str, dest: &Path) -> Result<u64, MediaError>;
}
