//! Telegram implementations of the chat seams used by the dispatcher and flows.

use super::resilient::{edit_html_resilient, send_html_resilient};
use crate::delivery::ChatSurface;
use crate::utils::display_name;
use anyhow::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, InputMedia, InputMediaPhoto, MessageId, ReplyParameters};
use tracing::warn;

/// The chat a command arrived in
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatChannel: Send + Sync {
    /// Reply to the command with a standalone message.
    async fn reply(&self, text: &str) -> Result<()>;

    /// Post the status message that a flow will keep updating.
    async fn open_status(&self, text: &str) -> Result<Box<dyn ChatSurface>>;
}

/// A Telegram chat, answering one command message
pub struct TelegramChannel {
    bot: Bot,
    chat_id: ChatId,
    command_id: MessageId,
}

impl TelegramChannel {
    pub const fn new(bot: Bot, chat_id: ChatId, command_id: MessageId) -> Self {
        Self {
            bot,
            chat_id,
            command_id,
        }
    }
}

#[async_trait]
impl ChatChannel for TelegramChannel {
    async fn reply(&self, text: &str) -> Result<()> {
        send_html_resilient(&self.bot, self.chat_id, Some(self.command_id), text).await?;
        Ok(())
    }

    async fn open_status(&self, text: &str) -> Result<Box<dyn ChatSurface>> {
        let status =
            send_html_resilient(&self.bot, self.chat_id, Some(self.command_id), text).await?;
        Ok(Box::new(TelegramSurface {
            bot: self.bot.clone(),
            chat_id: self.chat_id,
            command_id: self.command_id,
            status_id: status.id,
        }))
    }
}

/// Status message of one command
pub struct TelegramSurface {
    bot: Bot,
    chat_id: ChatId,
    command_id: MessageId,
    status_id: MessageId,
}

#[async_trait]
impl ChatSurface for TelegramSurface {
    async fn edit_status(&self, text: &str) -> Result<()> {
        edit_html_resilient(&self.bot, self.chat_id, self.status_id, text).await
    }

    async fn replace_with_files(&self, files: &[PathBuf]) -> Result<()> {
        match files {
            [] => anyhow::bail!("no files to upload"),
            [file] => self.send_single(file).await?,
            many => self.send_album(many).await?,
        }

        // The files are already in the chat; a stale status message is cosmetic.
        if let Err(e) = self.bot.delete_message(self.chat_id, self.status_id).await {
            warn!(error = %e, "Failed to remove status message after upload");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MediaKind {
    Photo,
    Video,
    Document,
}

static PHOTO_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];
static VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "webm"];

fn media_kind(path: &Path) -> MediaKind {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);

    match extension.as_deref() {
        Some(ext) if PHOTO_EXTENSIONS.contains(&ext) => MediaKind::Photo,
        Some(ext) if VIDEO_EXTENSIONS.contains(&ext) => MediaKind::Video,
        _ => MediaKind::Document,
    }
}

impl TelegramSurface {
    fn reply_parameters(&self) -> ReplyParameters {
        ReplyParameters::new(self.command_id)
    }

    async fn send_single(&self, file: &Path) -> Result<()> {
        let input = || InputFile::file(file.to_path_buf());

        match media_kind(file) {
            MediaKind::Photo => {
                self.bot
                    .send_photo(self.chat_id, input())
                    .reply_parameters(self.reply_parameters())
                    .await?;
            }
            MediaKind::Video => {
                if let Err(e) = self
                    .bot
                    .send_video(self.chat_id, input())
                    .reply_parameters(self.reply_parameters())
                    .await
                {
                    warn!(
                        file = %display_name(file),
                        error = %e,
                        "Failed to send video as native media; falling back to document"
                    );
                    self.bot
                        .send_document(self.chat_id, input())
                        .reply_parameters(self.reply_parameters())
                        .await?;
                }
            }
            MediaKind::Document => {
                self.bot
                    .send_document(self.chat_id, input())
                    .reply_parameters(self.reply_parameters())
                    .await?;
            }
        }
        Ok(())
    }

    async fn send_album(&self, files: &[PathBuf]) -> Result<()> {
        let media: Vec<InputMedia> = files
            .iter()
            .map(|path| InputMedia::Photo(InputMediaPhoto::new(InputFile::file(path.clone()))))
            .collect();

        self.bot
            .send_media_group(self.chat_id, media)
            .reply_parameters(self.reply_parameters())
            .await?;
        Ok(())
    }
}
