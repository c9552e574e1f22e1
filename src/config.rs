//! Configuration and settings management
//!
//! Loads settings from environment variables and defines the remote model,
//! polling and cleanup constants.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating [`Settings`]
#[derive(Debug, Error)]
pub enum SettingsError {
    /// The configuration sources could not be read or deserialized
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    /// A required value is absent or empty
    #[error("{key} is not set. Add {key}={hint} to the .env file")]
    Missing {
        /// Environment variable name
        key: &'static str,
        /// Placeholder shown in the remediation hint
        hint: &'static str,
    },
}

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct Settings {
    /// Telegram Bot API token
    #[serde(default)]
    pub telegram_token: String,

    /// API key for the generative media proxy, sent as `x-goog-api-key`
    #[serde(default)]
    pub api_key: String,

    /// The only chat the bot answers in
    pub allowed_chat_id: Option<i64>,

    /// Base URL of the generative media proxy
    #[serde(default)]
    pub proxy_url: String,

    /// Working directory for temporary media files
    #[serde(default = "default_tmp_dir")]
    pub tmp_dir: String,

    /// Imagen model identifier
    #[serde(default = "default_imagen_model")]
    pub imagen_model: String,

    /// Veo model identifier
    #[serde(default = "default_veo_model")]
    pub veo_model: String,
}

fn default_tmp_dir() -> String {
    "tmp".to_string()
}

fn default_imagen_model() -> String {
    DEFAULT_IMAGEN_MODEL.to_string()
}

fn default_veo_model() -> String {
    DEFAULT_VEO_MODEL.to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use oxide_media_bot::config::Settings;
    ///
    /// let settings = Settings::new().expect("Failed to load configuration");
    /// ```
    ///
    /// # Errors
    ///
    /// Returns a `SettingsError` if loading fails or a required value is missing.
    pub fn new() -> Result<Self, SettingsError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // This file shouldn't be checked into git
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Environment::default() maps UPPER_SNAKE_CASE to snake_case keys;
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        let settings: Self = s.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Checks that every value the bot cannot run without is present.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::Missing` naming the first absent value.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.telegram_token.trim().is_empty() {
            return Err(SettingsError::Missing {
                key: "TELEGRAM_TOKEN",
                hint: "your_bot_token",
            });
        }
        if self.api_key.trim().is_empty() {
            return Err(SettingsError::Missing {
                key: "API_KEY",
                hint: "your_api_key",
            });
        }
        if self.allowed_chat_id.is_none() {
            return Err(SettingsError::Missing {
                key: "ALLOWED_CHAT_ID",
                hint: "chat_id",
            });
        }
        if self.proxy_url.trim().is_empty() {
            return Err(SettingsError::Missing {
                key: "PROXY_URL",
                hint: "https://your-proxy.example",
            });
        }
        Ok(())
    }

    /// Proxy base URL without a trailing slash
    #[must_use]
    pub fn proxy_base(&self) -> &str {
        self.proxy_url.trim_end_matches('/')
    }

    /// Temporary media directory as a path
    #[must_use]
    pub fn tmp_path(&self) -> PathBuf {
        PathBuf::from(&self.tmp_dir)
    }
}

/// Default Imagen model
pub const DEFAULT_IMAGEN_MODEL: &str = "imagen-3.0-generate-002";
/// Default Veo model
pub const DEFAULT_VEO_MODEL: &str = "veo-3.0-generate-preview";

/// Header carrying the API key on every proxy request
pub const API_KEY_HEADER: &str = "x-goog-api-key";

/// Prefix that marks a chat message as a bot command
pub const COMMAND_PREFIX: char = '!';

// Veo polling
/// Delay between two operation status checks
pub const VEO_POLL_INTERVAL_SECS: u64 = 10;
/// Status checks before giving up (10 minutes at the default interval)
pub const VEO_MAX_POLL_ATTEMPTS: u32 = 60;
/// Timeout for the long-running submit request
pub const VEO_SUBMIT_TIMEOUT_SECS: u64 = 320;
/// Timeout for a single status request
pub const VEO_STATUS_TIMEOUT_SECS: u64 = 30;

// Countdown shown while polling
/// Remaining time shown at the start of polling
pub const COUNTDOWN_CEILING_SECS: u64 = 120;
/// Attempts covered by the linear first phase
pub const COUNTDOWN_LINEAR_ATTEMPTS: u32 = 12;
/// Decrement per attempt during the first phase
pub const COUNTDOWN_LINEAR_STEP_SECS: u64 = 10;
/// Decrement per attempt during the second phase
pub const COUNTDOWN_STEEP_STEP_SECS: u64 = 15;
/// Lowest value shown during the second phase
pub const COUNTDOWN_FLOOR_SECS: u64 = 10;

// Imagen
/// Timeout for the image predict request
pub const IMAGEN_TIMEOUT_SECS: u64 = 60;

// Asset download
/// Largest asset the bot downloads (50 MB)
pub const MEDIA_DOWNLOAD_LIMIT_BYTES: u64 = 50 * 1024 * 1024;
/// Timeout for downloading one asset
pub const MEDIA_DOWNLOAD_TIMEOUT_SECS: u64 = 60;

// Temp file cleanup
/// Delay before delivered images are removed
pub const IMAGE_CLEANUP_DELAY_SECS: u64 = 15;
/// Delay before a delivered video is removed
pub const VIDEO_CLEANUP_DELAY_SECS: u64 = 30;

// Telegram API retries
/// Maximum retries for Telegram API calls
pub const TELEGRAM_API_MAX_RETRIES: usize = 3;
/// Initial backoff for Telegram API retries
pub const TELEGRAM_API_INITIAL_BACKOFF_MS: u64 = 500;
/// Backoff ceiling for Telegram API retries
pub const TELEGRAM_API_MAX_BACKOFF_MS: u64 = 4000;

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

/// Get the Veo poll interval from env or default.
///
/// Environment variable: `VEO_POLL_INTERVAL_SECS`.
#[must_use]
pub fn get_veo_poll_interval() -> Duration {
    Duration::from_secs(env_or("VEO_POLL_INTERVAL_SECS", VEO_POLL_INTERVAL_SECS))
}

/// Get the maximum number of Veo status checks from env or default.
///
/// Environment variable: `VEO_MAX_POLL_ATTEMPTS`.
#[must_use]
pub fn get_veo_max_poll_attempts() -> u32 {
    env_or("VEO_MAX_POLL_ATTEMPTS", VEO_MAX_POLL_ATTEMPTS).max(1)
}

/// Get the Veo submit timeout from env or default.
///
/// Environment variable: `VEO_SUBMIT_TIMEOUT_SECS`.
#[must_use]
pub fn get_veo_submit_timeout() -> Duration {
    Duration::from_secs(env_or("VEO_SUBMIT_TIMEOUT_SECS", VEO_SUBMIT_TIMEOUT_SECS))
}

/// Get the Imagen request timeout from env or default.
///
/// Environment variable: `IMAGEN_TIMEOUT_SECS`.
#[must_use]
pub fn get_imagen_timeout() -> Duration {
    Duration::from_secs(env_or("IMAGEN_TIMEOUT_SECS", IMAGEN_TIMEOUT_SECS))
}

/// Get the asset download size ceiling from env or default.
///
/// Environment variable: `MEDIA_DOWNLOAD_LIMIT_BYTES`.
#[must_use]
pub fn get_download_limit_bytes() -> u64 {
    env_or("MEDIA_DOWNLOAD_LIMIT_BYTES", MEDIA_DOWNLOAD_LIMIT_BYTES)
}

/// Get the asset download timeout from env or default.
///
/// Environment variable: `MEDIA_DOWNLOAD_TIMEOUT_SECS`.
#[must_use]
pub fn get_download_timeout() -> Duration {
    Duration::from_secs(env_or(
        "MEDIA_DOWNLOAD_TIMEOUT_SECS",
        MEDIA_DOWNLOAD_TIMEOUT_SECS,
    ))
}

/// Get the image cleanup delay from env or default.
///
/// Environment variable: `IMAGE_CLEANUP_DELAY_SECS`.
#[must_use]
pub fn get_image_cleanup_delay() -> Duration {
    Duration::from_secs(env_or("IMAGE_CLEANUP_DELAY_SECS", IMAGE_CLEANUP_DELAY_SECS))
}

/// Get the video cleanup delay from env or default.
///
/// Environment variable: `VIDEO_CLEANUP_DELAY_SECS`.
#[must_use]
pub fn get_video_cleanup_delay() -> Duration {
    Duration::from_secs(env_or("VIDEO_CLEANUP_DELAY_SECS", VIDEO_CLEANUP_DELAY_SECS))
}
