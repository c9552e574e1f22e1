//! Telegram sends and edits with automatic retry on transient failures.
//!
//! Everything here speaks HTML parse mode. Retries use
//! [`crate::utils::retry_telegram_operation`] (exponential backoff with jitter).
//!
//! # Usage
//!
//! ```ignore
//! use oxide_media_bot::bot::resilient::{send_html_resilient, edit_html_resilient};
//!
//! let status = send_html_resilient(&bot, chat_id, Some(msg.id), "🎨 Processing").await?;
//! edit_html_resilient(&bot, chat_id, status.id, "✅ Done").await?;
//! ```

use crate::utils::truncate_str;
use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatId, Message, MessageId, ParseMode, ReplyParameters};
use tracing::debug;

/// Telegram's limit is 4096; the margin leaves room for the truncation marker.
pub const TELEGRAM_MESSAGE_LIMIT: usize = 4000;

const ERROR_NOT_MODIFIED: &str = "message is not modified";

/// Cuts `text` to the Telegram limit, marking the cut.
#[must_use]
pub fn fit_message_limit(text: &str) -> String {
    if text.chars().count() > TELEGRAM_MESSAGE_LIMIT {
        format!(
            "{}...\n\n<i>(message truncated)</i>",
            truncate_str(text, TELEGRAM_MESSAGE_LIMIT)
        )
    } else {
        text.to_string()
    }
}

/// Whether an edit error only means the text was already current.
#[must_use]
pub fn is_unchanged_edit(error: &str) -> bool {
    error.contains(ERROR_NOT_MODIFIED)
}

/// Sends an HTML message, optionally as a reply, with automatic retry.
///
/// # Errors
///
/// Returns the last Telegram error once all retries are exhausted.
pub async fn send_html_resilient(
    bot: &Bot,
    chat_id: ChatId,
    reply_to: Option<MessageId>,
    text: &str,
) -> Result<Message> {
    let text = fit_message_limit(text);
    crate::utils::retry_telegram_operation(|| async {
        let mut req = bot
            .send_message(chat_id, text.clone())
            .parse_mode(ParseMode::Html);
        if let Some(id) = reply_to {
            req = req.reply_parameters(ReplyParameters::new(id));
        }
        req.await
            .map_err(|e| anyhow::anyhow!("Telegram send error: {e}"))
    })
    .await
}

/// Replaces the text of an HTML message with automatic retry.
///
/// An edit that would not change the text counts as success.
///
/// # Errors
///
/// Returns the last Telegram error once all retries are exhausted.
pub async fn edit_html_resilient(
    bot: &Bot,
    chat_id: ChatId,
    msg_id: MessageId,
    text: &str,
) -> Result<()> {
    let text = fit_message_limit(text);
    crate::utils::retry_telegram_operation(|| async {
        match bot
            .edit_message_text(chat_id, msg_id, text.clone())
            .parse_mode(ParseMode::Html)
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if is_unchanged_edit(&e.to_string()) => {
                debug!("Message update skipped: {e}");
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!("Telegram edit error: {e}")),
        }
    })
    .await
}
