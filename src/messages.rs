//! User-facing texts, rendered as Telegram HTML.
//!
//! Every interpolated value is escaped. Internal error details stay in the
//! logs; only upstream messages, filter reasons and short transport errors are
//! shown to the user.

use crate::generation::GenerationKind;
use crate::utils::truncate_str;
use html_escape::encode_text;
use std::time::Duration;

/// Longest error excerpt placed in a chat message
const MAX_ERROR_EXCERPT_CHARS: usize = 500;

/// Generic reply for anything the flows could not classify
pub const SERVICE_ERROR: &str = "❌ <b>Service Error</b>\nAn unexpected error occurred while processing your request. Please try again in a moment.";

pub const IMAGE_PROCESSING: &str =
    "🎨 <b>Imagen Processing</b>\nGenerating high-quality image based on your description.";
pub const IMAGE_UNAVAILABLE: &str = "❌ <b>Image Generation Failed</b>\nThe Imagen service is currently unavailable. Please try again in a few moments.";
pub const IMAGE_NO_OUTPUT: &str = "❌ <b>Image Generation Failed</b>\nNo image was produced for this description. Please try rephrasing it.";
pub const IMAGE_UPLOAD_FAILED: &str =
    "❌ <b>Upload Failed</b>\nThe image was generated but could not be delivered. Please try again.";

pub const VIDEO_PROCESSING: &str =
    "📺 <b>Veo Processing</b>\nInitializing text-to-video generation.";
pub const VIDEO_SUBMITTED: &str =
    "📺 <b>Video Generation In Progress</b>\nVeo is processing your request.";
pub const VIDEO_UNAVAILABLE: &str = "❌ <b>Video Generation Failed</b>\nThe Veo service is currently unavailable. Please try again in a few moments.";
pub const VIDEO_INVALID_RESPONSE: &str = "❌ <b>Service Error</b>\nReceived invalid response from video generation service. Please try again.";
pub const VIDEO_NO_SAMPLES: &str = "❌ <b>Service Error</b>\nVideo generation completed but no output samples were produced. Please try again.";
pub const VIDEO_MISSING_LINKS: &str = "❌ <b>Service Error</b>\nVideo generation completed but download links are unavailable. Please try again.";
pub const VIDEO_PREPARING: &str =
    "📺 <b>Video Generation Complete</b>\nPreparing video for upload.";
pub const VIDEO_DOWNLOAD_FAILED: &str = "❌ <b>Download Failed</b>\nThe video was generated but could not be retrieved. Please try again.";

/// Default reason when a filtered result carries none
pub const DEFAULT_FILTER_REASON: &str = "Content filtered by safety systems";

fn excerpt(error: &str) -> String {
    encode_text(&truncate_str(error, MAX_ERROR_EXCERPT_CHARS)).into_owned()
}

/// Reply for a command without a prompt
#[must_use]
pub fn usage(kind: GenerationKind) -> String {
    format!(
        "❌ <b>Invalid Command Usage</b>\nPlease provide a description for {kind} generation.\n\n<b>Correct usage:</b> <code>{}{} &lt;your {kind} description&gt;</code>",
        crate::config::COMMAND_PREFIX,
        kind.command()
    )
}

/// Countdown update while the job is pending
#[must_use]
pub fn video_progress(remaining: &str) -> String {
    format!(
        "📺 <b>Video Generation In Progress</b>\nProcessing your request... ⏳ {}",
        encode_text(remaining)
    )
}

/// Status shown after a failed status check that will be retried
#[must_use]
pub fn video_retrying(attempt: u32, max_attempts: u32, error: &str) -> String {
    format!(
        "⚠️ <b>Temporary Service Issue</b> (Attempt {attempt}/{max_attempts})\nExperiencing connectivity issues. Retrying automatically...\n<pre>{}</pre>",
        excerpt(error)
    )
}

/// Upstream error of a finished operation, shown verbatim
#[must_use]
pub fn video_failed(upstream_message: &str) -> String {
    format!(
        "❌ <b>Video Generation Failed</b>\n\n<b>Error Details:</b>\n• {}\n\n💡 <b>Suggestion:</b> Please try rephrasing your prompt or use different keywords.",
        encode_text(upstream_message)
    )
}

/// Safety-filter report, one bullet per reason
#[must_use]
pub fn video_filtered(reasons: &[String]) -> String {
    let bullets = if reasons.is_empty() {
        DEFAULT_FILTER_REASON.to_string()
    } else {
        reasons
            .iter()
            .map(|r| excerpt(r))
            .collect::<Vec<_>>()
            .join("\n• ")
    };
    format!(
        "❌ <b>Content Policy Violation</b>\n\n<b>Filtered Content:</b>\n• {bullets}\n\n💡 <b>Suggestion:</b> Please modify your prompt to comply with content guidelines and try again."
    )
}

/// Link fallback when the video could not be uploaded
#[must_use]
pub fn video_link(uri: &str) -> String {
    format!(
        "📺 <b>Video Generation Complete</b>\n\n⬇️ <b>Direct Download Link:</b>\n{}\n\n💡 <b>Note:</b> Video file was too large for upload. Use the link above to download your video.",
        encode_text(uri)
    )
}

/// Final report when neither the upload nor the link could be delivered
#[must_use]
pub fn video_upload_failed(upload_error: &str) -> String {
    format!(
        "❌ <b>Upload Failed</b>\nUnable to deliver video file. Please try generating a shorter video.\n<pre>{}</pre>",
        excerpt(upload_error)
    )
}

/// Attempt budget exhausted
#[must_use]
pub fn video_timeout(budget: Duration, last_error: Option<&str>) -> String {
    let minutes = budget.as_secs().div_ceil(60).max(1);
    match last_error {
        Some(error) => format!(
            "❌ <b>Generation Timeout</b>\nVideo generation process exceeded the maximum time limit of {minutes} minutes.\n<pre>{}</pre>",
            excerpt(error)
        ),
        None => format!(
            "❌ <b>Generation Timeout</b>\nVideo generation process exceeded the maximum time limit of {minutes} minutes. Please try again with a simpler prompt."
        ),
    }
}
