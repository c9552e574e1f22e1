//! Delivery of generated media into the chat and cleanup of temporary files.
//!
//! Flows never talk to the chat platform directly. They receive a
//! [`ChatSurface`] bound to the status message of one request and hand files
//! to the [`DeliveryAdapter`], which uploads them and always queues their
//! removal after a delay. The delay exists because the platform may still be
//! reading a file shortly after the upload call returns.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// The status message of one request, as seen by a flow.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatSurface: Send + Sync {
    /// Replace the text of the status message.
    async fn edit_status(&self, text: &str) -> Result<()>;

    /// Replace the status message with the given files as attachments, without text.
    async fn replace_with_files(&self, files: &[PathBuf]) -> Result<()>;
}

/// A temporary file waiting for its scheduled removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingDelivery {
    pub local_file_path: PathBuf,
    pub created_at: DateTime<Utc>,
    pub expiry_delay: Duration,
}

impl PendingDelivery {
    #[must_use]
    pub fn new(local_file_path: PathBuf, expiry_delay: Duration) -> Self {
        Self {
            local_file_path,
            created_at: Utc::now(),
            expiry_delay,
        }
    }
}

/// Errors surfaced by [`DeliveryAdapter`]
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The attachment upload failed
    #[error("upload failed: {0}")]
    Upload(String),
    /// Both the attachment upload and the link fallback failed
    #[error("upload failed: {upload}; link fallback failed: {link}")]
    LinkFallback {
        /// Error of the attachment upload
        upload: String,
        /// Error of the link message
        link: String,
    },
}

impl DeliveryError {
    /// Error text of the original attachment upload
    #[must_use]
    pub fn upload_error(&self) -> &str {
        match self {
            Self::Upload(upload) | Self::LinkFallback { upload, .. } => upload,
        }
    }
}

/// How a single asset finally reached the chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryRoute {
    /// Uploaded as an attachment replacing the status message
    Attachment,
    /// Upload failed; the status message now carries the asset link
    Link(String),
}

/// Uploads files through a [`ChatSurface`] and schedules their cleanup
#[derive(Debug, Clone, Copy)]
pub struct DeliveryAdapter {
    cleanup_delay: Duration,
}

impl DeliveryAdapter {
    #[must_use]
    pub const fn new(cleanup_delay: Duration) -> Self {
        Self { cleanup_delay }
    }

    #[must_use]
    pub const fn cleanup_delay(&self) -> Duration {
        self.cleanup_delay
    }

    /// Uploads `files` as attachments replacing the status message.
    ///
    /// Cleanup is scheduled whatever the upload result.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::Upload` if the upload fails.
    pub async fn deliver_files(
        &self,
        surface: &dyn ChatSurface,
        files: Vec<PathBuf>,
    ) -> Result<(), DeliveryError> {
        let result = surface.replace_with_files(&files).await;
        self.release(files);

        result.map_err(|e| DeliveryError::Upload(e.to_string()))
    }

    /// Uploads one asset, falling back to `link_text` if the upload fails.
    ///
    /// # Errors
    ///
    /// Returns `DeliveryError::LinkFallback` if the link message fails too.
    pub async fn deliver_with_link_fallback(
        &self,
        surface: &dyn ChatSurface,
        file: PathBuf,
        uri: &str,
        link_text: &str,
    ) -> Result<DeliveryRoute, DeliveryError> {
        let upload = match self.deliver_files(surface, vec![file]).await {
            Ok(()) => return Ok(DeliveryRoute::Attachment),
            Err(e) => e.upload_error().to_string(),
        };

        warn!(error = %upload, "Attachment upload failed, sending direct link instead");
        match surface.edit_status(link_text).await {
            Ok(()) => {
                info!("Asset delivered via direct download link");
                Ok(DeliveryRoute::Link(uri.to_string()))
            }
            Err(link) => Err(DeliveryError::LinkFallback {
                upload,
                link: link.to_string(),
            }),
        }
    }

    /// Queues removal of files that will not be uploaded.
    pub fn release(&self, files: Vec<PathBuf>) -> Option<JoinHandle<()>> {
        if files.is_empty() {
            return None;
        }
        info!(
            files = files.len(),
            delay_secs = self.cleanup_delay().as_secs(),
            "Temporary files scheduled for cleanup"
        );
        let pending = files
            .into_iter()
            .map(|path| PendingDelivery::new(path, self.cleanup_delay()))
            .collect();
        Some(schedule_cleanup(pending))
    }
}

/// Removes each pending file once its delay has elapsed.
///
/// Runs as a detached task; failures are logged and never propagated.
pub fn schedule_cleanup(pending: Vec<PendingDelivery>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let delay = pending
            .iter()
            .map(|p| p.expiry_delay)
            .max()
            .unwrap_or_default();
        tokio::time::sleep(delay).await;

        for item in pending {
            remove_temp_file(&item.local_file_path).await;
        }
    })
}

async fn remove_temp_file(path: &Path) {
    let name = crate::utils::display_name(path);
    match tokio::fs::remove_file(path).await {
        Ok(()) => info!(file = %name, "Temporary file cleaned up"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            info!(file = %name, "Temporary file already gone");
        }
        Err(e) => warn!(file = %name, error = %e, "File cleanup error"),
    }
}
