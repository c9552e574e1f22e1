use super::GenerationRequest;
use crate::delivery::{ChatSurface, DeliveryAdapter};
use crate::media::{ImageOptions, ImagePredictions, MediaApi};
use crate::messages;
use crate::utils::{display_name, ensure_tmp_dir, temp_media_path};
use anyhow::Result;
use base64::Engine as _;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// How an image request ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    /// Attachments replaced the status message
    Delivered { files: usize },
    /// The service answered but produced no usable image
    NoOutput,
    /// The service rejected the request or could not be reached
    Unavailable,
    /// Images were generated but the chat upload failed
    UploadFailed,
}

/// Imagen request/response handler
pub struct ImageFlow {
    media: Arc<dyn MediaApi>,
    options: ImageOptions,
    tmp_dir: PathBuf,
    delivery: DeliveryAdapter,
}

impl ImageFlow {
    #[must_use]
    pub fn new(media: Arc<dyn MediaApi>, tmp_dir: PathBuf, delivery: DeliveryAdapter) -> Self {
        Self {
            media,
            options: ImageOptions::default(),
            tmp_dir,
            delivery,
        }
    }

    /// Generates images for `request` and delivers them through `surface`.
    ///
    /// Service failures are reported on the surface and returned as an
    /// [`ImageOutcome`]; no retry is attempted.
    ///
    /// # Errors
    ///
    /// Returns an error only if a failure report cannot be written to the surface.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        surface: &dyn ChatSurface,
    ) -> Result<ImageOutcome> {
        let predictions = match self
            .media
            .submit_image(request.prompt(), &self.options)
            .await
        {
            Ok(predictions) => predictions,
            Err(e) => {
                error!(error = %e, "Imagen API request failed");
                surface.edit_status(messages::IMAGE_UNAVAILABLE).await?;
                return Ok(ImageOutcome::Unavailable);
            }
        };

        let files = match self.persist(&predictions).await {
            Ok(files) => files,
            Err(e) => {
                error!(error = %e, "Failed to store generated images");
                surface.edit_status(messages::IMAGE_UNAVAILABLE).await?;
                return Ok(ImageOutcome::Unavailable);
            }
        };

        if files.is_empty() {
            warn!(
                predictions = predictions.predictions.len(),
                "Imagen returned no usable image"
            );
            surface.edit_status(messages::IMAGE_NO_OUTPUT).await?;
            return Ok(ImageOutcome::NoOutput);
        }

        let count = files.len();
        match self.delivery.deliver_files(surface, files).await {
            Ok(()) => {
                info!(files = count, "Images delivered");
                Ok(ImageOutcome::Delivered { files: count })
            }
            Err(e) => {
                error!(error = %e, "Image upload failed");
                surface.edit_status(messages::IMAGE_UPLOAD_FAILED).await?;
                Ok(ImageOutcome::UploadFailed)
            }
        }
    }

    /// Decodes every payload into its own temp file.
    ///
    /// Payloads that are missing or not valid base64 are skipped. If a write
    /// fails, files already written are handed to cleanup before returning.
    async fn persist(&self, predictions: &ImagePredictions) -> std::io::Result<Vec<PathBuf>> {
        if predictions.predictions.is_empty() {
            return Ok(Vec::new());
        }
        ensure_tmp_dir(&self.tmp_dir).await?;

        let engine = base64::engine::general_purpose::STANDARD;
        let mut files = Vec::new();

        for (i, prediction) in predictions.predictions.iter().enumerate() {
            let Some(encoded) = prediction.bytes_base64_encoded.as_deref() else {
                warn!(
                    index = i,
                    reason = prediction.rai_filtered_reason.as_deref().unwrap_or("none given"),
                    "Prediction carries no image payload"
                );
                continue;
            };

            let bytes = match engine.decode(encoded) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(index = i, error = %e, "Skipping undecodable image payload");
                    continue;
                }
            };

            let path = temp_media_path(&self.tmp_dir, "imagen", i + 1, "png");
            if let Err(e) = tokio::fs::write(&path, &bytes).await {
                self.delivery.release(files);
                return Err(e);
            }
            info!(file = %display_name(&path), bytes = bytes.len(), "Image saved");
            files.push(path);
        }

        Ok(files)
    }
}
