//! Utility functions for retries, text truncation and temporary media files.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::warn;

/// Process-wide counter that keeps temp names unique within one millisecond
static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Truncates a string to at most `max_chars` characters (not bytes).
///
/// # Examples
///
/// ```
/// use oxide_media_bot::utils::truncate_str;
/// assert_eq!(truncate_str("Привет, мир!", 6), "Привет");
/// ```
#[must_use]
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

/// Builds a unique path for a temporary media file.
///
/// Names follow `<prefix>-<unix millis>-<sequence>-<index>.<extension>`, so two
/// requests landing in the same millisecond still get distinct files.
///
/// # Examples
///
/// ```
/// use oxide_media_bot::utils::temp_media_path;
/// use std::path::Path;
///
/// let a = temp_media_path(Path::new("tmp"), "imagen", 1, "png");
/// let b = temp_media_path(Path::new("tmp"), "imagen", 1, "png");
/// assert_ne!(a, b);
/// ```
#[must_use]
pub fn temp_media_path(dir: &Path, prefix: &str, index: usize, extension: &str) -> PathBuf {
    let millis = chrono::Utc::now().timestamp_millis();
    let seq = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    dir.join(format!("{prefix}-{millis}-{seq}-{index}.{extension}"))
}

/// Creates the temporary media directory if it does not exist yet.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub async fn ensure_tmp_dir(dir: &Path) -> std::io::Result<()> {
    tokio::fs::create_dir_all(dir).await
}

/// Returns only the file name part of a path for log output.
#[must_use]
pub fn display_name(path: &Path) -> String {
    path.file_name().map_or_else(
        || path.display().to_string(),
        |name| name.to_string_lossy().into_owned(),
    )
}

/// Retries a Telegram API operation with exponential backoff and jitter.
///
/// # Examples
///
/// ```ignore
/// use oxide_media_bot::utils::retry_telegram_operation;
///
/// let msg = retry_telegram_operation(|| async {
///     bot.send_message(chat_id, "⏳").await.map_err(Into::into)
/// })
/// .await?;
/// ```
///
/// # Errors
///
/// Returns the last error once all retries are exhausted.
pub async fn retry_telegram_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    use crate::config::{
        TELEGRAM_API_INITIAL_BACKOFF_MS, TELEGRAM_API_MAX_BACKOFF_MS, TELEGRAM_API_MAX_RETRIES,
    };

    let retry_strategy = ExponentialBackoff::from_millis(TELEGRAM_API_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(TELEGRAM_API_MAX_BACKOFF_MS))
        .map(jitter) // Add jitter to prevent thundering herd
        .take(TELEGRAM_API_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Telegram API operation failed after {} attempts: {}",
            TELEGRAM_API_MAX_RETRIES, e
        );
        e
    })
}
