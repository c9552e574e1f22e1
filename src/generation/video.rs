//! Veo job poller.
//!
//! One call to [`VideoJobPoller::run`] drives a single request through
//! `submitting → polling → terminal`, reporting progress on the request's
//! status message. Every terminal state is a [`JobOutcome`] variant.
//!
//! There is no cancellation: a poll ends on completion, failure or when the
//! attempt budget is spent.

use super::countdown::{estimate_remaining, format_remaining};
use super::GenerationRequest;
use crate::config::{self, Settings};
use crate::delivery::{ChatSurface, DeliveryAdapter, DeliveryRoute};
use crate::media::{MediaApi, OperationStatus, VideoOptions};
use crate::messages;
use crate::utils::{display_name, ensure_tmp_dir, temp_media_path};
use anyhow::Result;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Polling limits and working directory
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Status checks before giving up
    pub max_attempts: u32,
    /// Delay between two status checks
    pub interval: Duration,
    /// Where downloaded videos are stored until cleanup
    pub tmp_dir: PathBuf,
}

impl PollConfig {
    #[must_use]
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_attempts: config::get_veo_max_poll_attempts(),
            interval: config::get_veo_poll_interval(),
            tmp_dir: settings.tmp_path(),
        }
    }

    /// Total wall time the attempt budget represents
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// Counters for one polling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollState {
    pub attempt: u32,
    pub max_attempts: u32,
    pub last_displayed_remaining: Option<Duration>,
    pub last_error: Option<String>,
}

impl PollState {
    #[must_use]
    pub const fn new(max_attempts: u32) -> Self {
        Self {
            attempt: 0,
            max_attempts,
            last_displayed_remaining: None,
            last_error: None,
        }
    }

    #[must_use]
    pub const fn exhausted(&self) -> bool {
        self.attempt >= self.max_attempts
    }

    /// Counts a pending status and returns the remaining time to show.
    pub fn record_pending(&mut self) -> Duration {
        self.attempt += 1;
        let remaining = estimate_remaining(self.attempt);
        self.last_displayed_remaining = Some(remaining);
        remaining
    }

    /// Counts a failed status check.
    pub fn record_error(&mut self, error: String) {
        self.attempt += 1;
        self.last_error = Some(error);
    }
}

/// What a finished operation amounts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// The operation finished with an error payload
    Failed(String),
    /// `done` without a `generateVideoResponse` container
    MissingResult,
    /// Safety filters removed at least one sample
    Filtered(Vec<String>),
    /// Finished without any generated sample
    NoSamples,
    /// Samples exist but none carries a URI
    NoAssetUri,
    /// The asset to download
    Ready(String),
}

/// Classifies a status response; `None` means the job is still running.
#[must_use]
pub fn classify_status(status: &OperationStatus) -> Option<Completion> {
    if !status.done {
        return None;
    }

    if let Some(error) = &status.error {
        return Some(Completion::Failed(error.message.clone()));
    }

    let Some(response) = status.video_response() else {
        return Some(Completion::MissingResult);
    };

    // Intentional but unverified: any filtered sample fails the whole batch,
    // even when unfiltered samples came back alongside it.
    if response.rai_media_filtered_count > 0 {
        let reasons = response
            .rai_media_filtered_reasons
            .clone()
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| vec![messages::DEFAULT_FILTER_REASON.to_string()]);
        return Some(Completion::Filtered(reasons));
    }

    let samples = response.samples();
    if samples.is_empty() {
        return Some(Completion::NoSamples);
    }

    // Intentional but unverified: only the first sample with a URI is
    // delivered, the rest of the batch is dropped.
    Some(
        samples
            .into_iter()
            .find_map(|s| s.uri)
            .map_or(Completion::NoAssetUri, Completion::Ready),
    )
}

/// Why a job failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// Error message reported by the operation itself
    Upstream(String),
    /// The operation finished without output
    NoSamples,
    /// The finished asset could not be downloaded
    DownloadFailed(String),
}

/// Service-side faults that end a job with a generic error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceFault {
    /// The submit request was rejected or unreachable
    SubmitFailed(String),
    /// The finished operation had no result container
    MalformedResponse,
    /// The finished operation had samples without URIs
    MissingAssetUri,
    /// Neither the attachment nor the link could be delivered
    UploadFailed(String),
}

/// Terminal state of a video job
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded(DeliveryRoute),
    Failed(FailureCause),
    Filtered { reasons: Vec<String> },
    TimedOut {
        attempts: u32,
        last_error: Option<String>,
    },
    ErrorUpload(ServiceFault),
}

/// Submits Veo jobs and follows them to a terminal state
pub struct VideoJobPoller {
    media: Arc<dyn MediaApi>,
    options: VideoOptions,
    config: PollConfig,
    delivery: DeliveryAdapter,
}

impl VideoJobPoller {
    #[must_use]
    pub fn new(media: Arc<dyn MediaApi>, config: PollConfig, delivery: DeliveryAdapter) -> Self {
        Self {
            media,
            options: VideoOptions::default(),
            config,
            delivery,
        }
    }

    /// Runs one video request end to end.
    ///
    /// # Errors
    ///
    /// Returns an error only if a terminal report cannot be written to the
    /// surface. Progress updates are best effort.
    pub async fn run(
        &self,
        request: &GenerationRequest,
        surface: &dyn ChatSurface,
    ) -> Result<JobOutcome> {
        let handle = match self
            .media
            .submit_video(request.prompt(), &self.options)
            .await
        {
            Ok(handle) => handle,
            Err(e) => {
                error!(error = %e, "Veo API request failed");
                surface.edit_status(messages::VIDEO_UNAVAILABLE).await?;
                return Ok(JobOutcome::ErrorUpload(ServiceFault::SubmitFailed(
                    e.to_string(),
                )));
            }
        };

        update_progress(surface, messages::VIDEO_SUBMITTED).await;

        let outcome = self.poll(&handle.operation_id, surface).await?;
        info!(operation_id = %handle.operation_id, outcome = ?outcome, "Veo job finished");
        Ok(outcome)
    }

    async fn poll(&self, operation_id: &str, surface: &dyn ChatSurface) -> Result<JobOutcome> {
        let mut state = PollState::new(self.config.max_attempts);

        while !state.exhausted() {
            match self.media.get_operation(operation_id).await {
                Ok(status) => match classify_status(&status) {
                    Some(completion) => return self.finish(completion, surface).await,
                    None => {
                        let remaining = state.record_pending();
                        update_progress(
                            surface,
                            &messages::video_progress(&format_remaining(remaining)),
                        )
                        .await;
                    }
                },
                Err(e) => {
                    warn!(
                        operation_id,
                        attempt = state.attempt + 1,
                        error = %e,
                        "Video status polling error"
                    );
                    let text = e.to_string();
                    state.record_error(text.clone());
                    if state.exhausted() {
                        break;
                    }
                    update_progress(
                        surface,
                        &messages::video_retrying(state.attempt, state.max_attempts, &text),
                    )
                    .await;
                }
            }

            // No wait after the last attempt; the timeout is reported at once.
            if !state.exhausted() {
                tokio::time::sleep(self.config.interval).await;
            }
        }

        warn!(
            operation_id,
            attempts = state.attempt,
            "Video generation exceeded the attempt budget"
        );
        surface
            .edit_status(&messages::video_timeout(
                self.config.budget(),
                state.last_error.as_deref(),
            ))
            .await?;
        Ok(JobOutcome::TimedOut {
            attempts: state.attempt,
            last_error: state.last_error,
        })
    }

    async fn finish(&self, completion: Completion, surface: &dyn ChatSurface) -> Result<JobOutcome> {
        let outcome = match completion {
            Completion::Ready(uri) => return self.deliver(uri, surface).await,
            Completion::Failed(message) => {
                error!(error = %message, "Veo API returned error");
                surface.edit_status(&messages::video_failed(&message)).await?;
                JobOutcome::Failed(FailureCause::Upstream(message))
            }
            Completion::MissingResult => {
                error!("Invalid API response: generateVideoResponse missing");
                surface.edit_status(messages::VIDEO_INVALID_RESPONSE).await?;
                JobOutcome::ErrorUpload(ServiceFault::MalformedResponse)
            }
            Completion::Filtered(reasons) => {
                info!(reasons = ?reasons, "Content filtered by safety systems");
                surface.edit_status(&messages::video_filtered(&reasons)).await?;
                JobOutcome::Filtered { reasons }
            }
            Completion::NoSamples => {
                error!("No generated samples found in API response");
                surface.edit_status(messages::VIDEO_NO_SAMPLES).await?;
                JobOutcome::Failed(FailureCause::NoSamples)
            }
            Completion::NoAssetUri => {
                error!("No video URIs found in API response");
                surface.edit_status(messages::VIDEO_MISSING_LINKS).await?;
                JobOutcome::ErrorUpload(ServiceFault::MissingAssetUri)
            }
        };
        Ok(outcome)
    }

    async fn deliver(&self, uri: String, surface: &dyn ChatSurface) -> Result<JobOutcome> {
        update_progress(surface, messages::VIDEO_PREPARING).await;

        let path = temp_media_path(&self.config.tmp_dir, "veo-video", 1, "mp4");
        let downloaded = match ensure_tmp_dir(&self.config.tmp_dir).await {
            Ok(()) => self
                .media
                .download_asset(&uri, &path)
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(format!("cannot create temp directory: {e}")),
        };

        if let Err(e) = downloaded {
            error!(error = %e, "Video download failed");
            surface.edit_status(messages::VIDEO_DOWNLOAD_FAILED).await?;
            return Ok(JobOutcome::Failed(FailureCause::DownloadFailed(e)));
        }
        info!(file = %display_name(&path), "Video downloaded, uploading");

        let link_text = messages::video_link(&uri);
        match self
            .delivery
            .deliver_with_link_fallback(surface, path, &uri, &link_text)
            .await
        {
            Ok(route) => Ok(JobOutcome::Succeeded(route)),
            Err(e) => {
                error!(error = %e, "Failed to deliver video and download link");
                surface
                    .edit_status(&messages::video_upload_failed(e.upload_error()))
                    .await?;
                Ok(JobOutcome::ErrorUpload(ServiceFault::UploadFailed(
                    e.upload_error().to_string(),
                )))
            }
        }
    }
}

async fn update_progress(surface: &dyn ChatSurface, text: &str) {
    if let Err(e) = surface.edit_status(text).await {
        warn!(error = %e, "Failed to update progress message");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::MockChatSurface;
    use crate::generation::GenerationKind;
    use crate::media::types::{
        GenerateVideoResponse, GeneratedSample, OperationError, OperationResponse, VideoRef,
    };
    use crate::media::{MediaError, MockMediaApi, OperationHandle};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    fn pending() -> OperationStatus {
        OperationStatus::default()
    }

    fn finished(response: GenerateVideoResponse) -> OperationStatus {
        OperationStatus {
            done: true,
            error: None,
            response: Some(OperationResponse {
                generate_video_response: Some(response),
            }),
        }
    }

    fn sample(uri: Option<&str>) -> GeneratedSample {
        GeneratedSample {
            video: Some(VideoRef {
                uri: uri.map(str::to_string),
            }),
        }
    }

    fn with_samples(uris: &[&str]) -> OperationStatus {
        finished(GenerateVideoResponse {
            generated_samples: Some(uris.iter().map(|u| sample(Some(*u))).collect()),
            ..Default::default()
        })
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new(GenerationKind::Video, "a surfing corgi").expect("valid prompt")
    }

    fn submitting(media: &mut MockMediaApi, id: &'static str) {
        media.expect_submit_video().times(1).returning(move |_, _| {
            Ok(OperationHandle {
                operation_id: id.to_string(),
            })
        });
    }

    fn poller(media: MockMediaApi, tmp_dir: &std::path::Path, max_attempts: u32) -> VideoJobPoller {
        paced_poller(media, tmp_dir, max_attempts, Duration::ZERO)
    }

    fn paced_poller(
        media: MockMediaApi,
        tmp_dir: &std::path::Path,
        max_attempts: u32,
        interval: Duration,
    ) -> VideoJobPoller {
        VideoJobPoller::new(
            Arc::new(media),
            PollConfig {
                max_attempts,
                interval,
                tmp_dir: tmp_dir.to_path_buf(),
            },
            DeliveryAdapter::new(Duration::from_millis(20)),
        )
    }

    /// Surface that accepts everything and records the status texts.
    fn recording_surface(log: Arc<Mutex<Vec<String>>>) -> MockChatSurface {
        let mut surface = MockChatSurface::new();
        surface.expect_edit_status().returning(move |text| {
            log.lock().expect("log lock").push(text.to_string());
            Ok(())
        });
        surface
    }

    #[test]
    fn pending_status_is_not_terminal() {
        assert_eq!(classify_status(&pending()), None);
    }

    #[test]
    fn error_takes_priority_over_response() {
        let mut status = with_samples(&["https://x/y.mp4"]);
        status.error = Some(OperationError {
            code: Some(3),
            message: "prompt rejected".to_string(),
        });
        assert_eq!(
            classify_status(&status),
            Some(Completion::Failed("prompt rejected".to_string()))
        );
    }

    #[test]
    fn filtered_wins_even_with_samples() {
        let status = finished(GenerateVideoResponse {
            rai_media_filtered_count: 1,
            rai_media_filtered_reasons: None,
            generated_samples: Some(vec![sample(Some("https://x/ok.mp4"))]),
        });
        assert_eq!(
            classify_status(&status),
            Some(Completion::Filtered(vec![
                messages::DEFAULT_FILTER_REASON.to_string()
            ]))
        );
    }

    #[test]
    fn first_sample_is_selected() {
        let status = with_samples(&["https://x/first.mp4", "https://x/second.mp4"]);
        assert_eq!(
            classify_status(&status),
            Some(Completion::Ready("https://x/first.mp4".to_string()))
        );
    }

    #[test]
    fn samples_without_uri_are_skipped() {
        let status = finished(GenerateVideoResponse {
            generated_samples: Some(vec![sample(None), sample(Some("https://x/late.mp4"))]),
            ..Default::default()
        });
        assert_eq!(
            classify_status(&status),
            Some(Completion::Ready("https://x/late.mp4".to_string()))
        );

        let status = finished(GenerateVideoResponse {
            generated_samples: Some(vec![sample(None)]),
            ..Default::default()
        });
        assert_eq!(classify_status(&status), Some(Completion::NoAssetUri));
    }

    #[test]
    fn done_without_container_or_samples() {
        let status = OperationStatus {
            done: true,
            ..Default::default()
        };
        assert_eq!(classify_status(&status), Some(Completion::MissingResult));
        assert_eq!(
            classify_status(&finished(GenerateVideoResponse::default())),
            Some(Completion::NoSamples)
        );
    }

    #[test]
    fn poll_state_counts_every_iteration() {
        let mut state = PollState::new(3);
        assert_eq!(state.record_pending(), Duration::from_secs(110));
        state.record_error("reset".to_string());
        assert_eq!(state.attempt, 2);
        assert!(!state.exhausted());
        state.record_pending();
        assert!(state.exhausted());
        assert_eq!(state.last_displayed_remaining, Some(Duration::from_secs(90)));
        assert_eq!(state.last_error.as_deref(), Some("reset"));
    }

    #[tokio::test]
    async fn six_polls_then_single_attachment() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut media = MockMediaApi::new();
        submitting(&mut media, "abc123");

        let polls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polls);
        media
            .expect_get_operation()
            .withf(|id| id == "abc123")
            .times(6)
            .returning(move |_| {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(if n < 6 {
                    pending()
                } else {
                    with_samples(&["https://x/y.mp4", "https://x/ignored.mp4"])
                })
            });
        media
            .expect_download_asset()
            .withf(|uri, _| uri == "https://x/y.mp4")
            .times(1)
            .returning(|_, dest| {
                std::fs::write(dest, b"mp4").map_err(|e| MediaError::Download(e.to_string()))?;
                Ok(3)
            });

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut surface = recording_surface(Arc::clone(&log));
        surface
            .expect_replace_with_files()
            .withf(|files| files.len() == 1)
            .times(1)
            .returning(|_| Ok(()));

        let outcome = poller(media, dir.path(), 60).run(&request(), &surface).await;

        assert_eq!(outcome.ok(), Some(JobOutcome::Succeeded(DeliveryRoute::Attachment)));
        assert_eq!(polls.load(Ordering::SeqCst), 6);
        let log = log.lock().expect("log lock");
        let progress = log.iter().filter(|t| t.contains("remaining")).count();
        assert_eq!(progress, 5, "one countdown update per pending poll: {log:?}");
    }

    #[tokio::test]
    async fn never_done_times_out_at_exact_budget() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut media = MockMediaApi::new();
        submitting(&mut media, "slow");
        media
            .expect_get_operation()
            .times(4)
            .returning(|_| Ok(pending()));
        media.expect_download_asset().times(0);

        let log = Arc::new(Mutex::new(Vec::new()));
        let surface = recording_surface(Arc::clone(&log));

        let outcome = poller(media, dir.path(), 4).run(&request(), &surface).await;

        assert_eq!(
            outcome.ok(),
            Some(JobOutcome::TimedOut {
                attempts: 4,
                last_error: None
            })
        );
        let log = log.lock().expect("log lock");
        assert!(log.last().is_some_and(|t| t.contains("Generation Timeout")));
    }

    #[tokio::test(start_paused = true)]
    async fn pending_polls_wait_one_interval_between_attempts() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut media = MockMediaApi::new();
        submitting(&mut media, "slow");
        media
            .expect_get_operation()
            .times(3)
            .returning(|_| Ok(pending()));
        media.expect_download_asset().times(0);

        let log = Arc::new(Mutex::new(Vec::new()));
        let surface = recording_surface(Arc::clone(&log));
        let interval = Duration::from_secs(10);

        let start = tokio::time::Instant::now();
        let outcome = paced_poller(media, dir.path(), 3, interval)
            .run(&request(), &surface)
            .await;
        let elapsed = start.elapsed();

        assert_eq!(
            outcome.ok(),
            Some(JobOutcome::TimedOut {
                attempts: 3,
                last_error: None
            })
        );
        assert_eq!(elapsed, interval * 2);
    }

    #[tokio::test(start_paused = true)]
    async fn completion_after_pending_polls_waits_once_per_pending() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut media = MockMediaApi::new();
        submitting(&mut media, "abc123");

        let polls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polls);
        media
            .expect_get_operation()
            .times(6)
            .returning(move |_| {
                let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
                Ok(if n < 6 {
                    pending()
                } else {
                    with_samples(&["https://x/y.mp4"])
                })
            });
        media
            .expect_download_asset()
            .times(1)
            .returning(|_, dest| {
                std::fs::write(dest, b"mp4").map_err(|e| MediaError::Download(e.to_string()))?;
                Ok(3)
            });

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut surface = recording_surface(Arc::clone(&log));
        surface
            .expect_replace_with_files()
            .times(1)
            .returning(|_| Ok(()));
        let interval = Duration::from_secs(10);

        let start = tokio::time::Instant::now();
        let outcome = paced_poller(media, dir.path(), 60, interval)
            .run(&request(), &surface)
            .await;
        let elapsed = start.elapsed();

        assert_eq!(outcome.ok(), Some(JobOutcome::Succeeded(DeliveryRoute::Attachment)));
        assert_eq!(polls.load(Ordering::SeqCst), 6);
        assert_eq!(elapsed, interval * 5);
    }

    #[tokio::test]
    async fn transient_error_keeps_counting_and_is_reported() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut media = MockMediaApi::new();
        submitting(&mut media, "flaky");

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        media
            .expect_get_operation()
            .times(5)
            .returning(move |_| {
                if counter.fetch_add(1, Ordering::SeqCst) + 1 == 3 {
                    Err(MediaError::Transient("connection reset by peer".to_string()))
                } else {
                    Ok(pending())
                }
            });
        media.expect_download_asset().times(0);

        let log = Arc::new(Mutex::new(Vec::new()));
        let surface = recording_surface(Arc::clone(&log));

        let outcome = poller(media, dir.path(), 5).run(&request(), &surface).await;

        assert_eq!(
            outcome.ok(),
            Some(JobOutcome::TimedOut {
                attempts: 5,
                last_error: Some("Transient error: connection reset by peer".to_string()),
            })
        );
        let log = log.lock().expect("log lock");
        assert!(log.iter().any(|t| t.contains("(Attempt 3/5)")));
        let last = log.last().cloned().unwrap_or_default();
        assert!(last.contains("Generation Timeout") && last.contains("connection reset by peer"));
    }

    #[tokio::test]
    async fn errors_until_budget_end_time_out_immediately() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut media = MockMediaApi::new();
        submitting(&mut media, "down");
        media
            .expect_get_operation()
            .times(2)
            .returning(|_| Err(MediaError::Transient("timeout".to_string())));

        let surface = recording_surface(Arc::new(Mutex::new(Vec::new())));
        let outcome = poller(media, dir.path(), 2).run(&request(), &surface).await;

        assert!(matches!(
            outcome.ok(),
            Some(JobOutcome::TimedOut { attempts: 2, last_error: Some(_) })
        ));
    }

    #[tokio::test]
    async fn filtered_batch_is_never_downloaded() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut media = MockMediaApi::new();
        submitting(&mut media, "f");
        media.expect_get_operation().times(1).returning(|_| {
            Ok(finished(GenerateVideoResponse {
                rai_media_filtered_count: 1,
                rai_media_filtered_reasons: Some(vec!["celebrity likeness".to_string()]),
                generated_samples: Some(vec![sample(Some("https://x/ok.mp4"))]),
            }))
        });
        media.expect_download_asset().times(0);

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut surface = recording_surface(Arc::clone(&log));
        surface.expect_replace_with_files().times(0);

        let outcome = poller(media, dir.path(), 60).run(&request(), &surface).await;

        assert_eq!(
            outcome.ok(),
            Some(JobOutcome::Filtered {
                reasons: vec!["celebrity likeness".to_string()]
            })
        );
        let log = log.lock().expect("log lock");
        assert!(log.last().is_some_and(|t| t.contains("• celebrity likeness")));
    }

    #[tokio::test]
    async fn upstream_error_is_shown_verbatim() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut media = MockMediaApi::new();
        submitting(&mut media, "e");
        media.expect_get_operation().returning(|_| {
            Ok(OperationStatus {
                done: true,
                error: Some(OperationError {
                    code: None,
                    message: "Audio generation failed".to_string(),
                }),
                response: None,
            })
        });

        let log = Arc::new(Mutex::new(Vec::new()));
        let surface = recording_surface(Arc::clone(&log));
        let outcome = poller(media, dir.path(), 60).run(&request(), &surface).await;

        assert_eq!(
            outcome.ok(),
            Some(JobOutcome::Failed(FailureCause::Upstream(
                "Audio generation failed".to_string()
            )))
        );
        let log = log.lock().expect("log lock");
        assert!(log.last().is_some_and(|t| t.contains("Audio generation failed")));
    }

    #[tokio::test]
    async fn submit_failure_stops_before_polling() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut media = MockMediaApi::new();
        media
            .expect_submit_video()
            .returning(|_, _| Err(MediaError::Upstream("API error: 429".to_string())));
        media.expect_get_operation().times(0);

        let mut surface = MockChatSurface::new();
        surface
            .expect_edit_status()
            .withf(|text| text == messages::VIDEO_UNAVAILABLE)
            .times(1)
            .returning(|_| Ok(()));

        let outcome = poller(media, dir.path(), 60).run(&request(), &surface).await;
        assert_eq!(
            outcome.ok(),
            Some(JobOutcome::ErrorUpload(ServiceFault::SubmitFailed(
                "Upstream error: API error: 429".to_string()
            )))
        );
    }

    #[tokio::test]
    async fn upload_failure_falls_back_to_link() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut media = MockMediaApi::new();
        submitting(&mut media, "big");
        media
            .expect_get_operation()
            .returning(|_| Ok(with_samples(&["https://x/big.mp4"])));
        media.expect_download_asset().returning(|_, dest| {
            std::fs::write(dest, b"mp4").map_err(|e| MediaError::Download(e.to_string()))?;
            Ok(3)
        });

        let log = Arc::new(Mutex::new(Vec::new()));
        let mut surface = recording_surface(Arc::clone(&log));
        surface
            .expect_replace_with_files()
            .returning(|_| Err(anyhow::anyhow!("Request Entity Too Large")));

        let outcome = poller(media, dir.path(), 60).run(&request(), &surface).await;

        assert_eq!(
            outcome.ok(),
            Some(JobOutcome::Succeeded(DeliveryRoute::Link(
                "https://x/big.mp4".to_string()
            )))
        );
        let log = log.lock().expect("log lock");
        assert!(log.last().is_some_and(|t| t.contains("Direct Download Link")));
    }

    #[tokio::test]
    async fn download_failure_is_plain_failure() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut media = MockMediaApi::new();
        submitting(&mut media, "dl");
        media
            .expect_get_operation()
            .returning(|_| Ok(with_samples(&["https://x/huge.mp4"])));
        media
            .expect_download_asset()
            .returning(|_, _| Err(MediaError::Download("asset exceeded the limit".to_string())));

        let mut surface = recording_surface(Arc::new(Mutex::new(Vec::new())));
        surface.expect_replace_with_files().times(0);

        let outcome = poller(media, dir.path(), 60).run(&request(), &surface).await;
        assert!(matches!(
            outcome.ok(),
            Some(JobOutcome::Failed(FailureCause::DownloadFailed(_)))
        ));
    }
}
