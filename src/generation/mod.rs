//! Generation flows: the synchronous Imagen flow and the Veo job poller.

/// Countdown text shown while a video job is pending
pub mod countdown;
/// Imagen request/response flow
pub mod image;
/// Veo long-running job state machine
pub mod video;

pub use image::{ImageFlow, ImageOutcome};
pub use video::{JobOutcome, PollConfig, VideoJobPoller};

use chrono::{DateTime, Utc};
use std::fmt;
use thiserror::Error;

/// What the user asked to generate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationKind {
    /// Still image via Imagen
    Image,
    /// Video via Veo
    Video,
}

impl GenerationKind {
    /// Chat command that selects this kind, without the prefix
    #[must_use]
    pub const fn command(self) -> &'static str {
        match self {
            Self::Image => "imagen",
            Self::Video => "veo",
        }
    }

    /// Parses a command word case-insensitively.
    #[must_use]
    pub fn from_command(word: &str) -> Option<Self> {
        match word.to_lowercase().as_str() {
            "imagen" => Some(Self::Image),
            "veo" => Some(Self::Video),
            _ => None,
        }
    }
}

impl fmt::Display for GenerationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Image => f.write_str("image"),
            Self::Video => f.write_str("video"),
        }
    }
}

/// The prompt was missing or blank
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("a non-empty prompt is required for {kind} generation")]
pub struct UsageError {
    /// Flow the user tried to start
    pub kind: GenerationKind,
}

/// A validated user request, immutable for the lifetime of its flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    prompt: String,
    kind: GenerationKind,
    requested_at: DateTime<Utc>,
}

impl GenerationRequest {
    /// Validates the prompt and stamps the request.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError`] when the prompt is empty or whitespace only.
    pub fn new(kind: GenerationKind, prompt: &str) -> Result<Self, UsageError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(UsageError { kind });
        }
        Ok(Self {
            prompt: prompt.to_string(),
            kind,
            requested_at: Utc::now(),
        })
    }

    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    #[must_use]
    pub const fn kind(&self) -> GenerationKind {
        self.kind
    }

    #[must_use]
    pub const fn requested_at(&self) -> DateTime<Utc> {
        self.requested_at
    }
}
