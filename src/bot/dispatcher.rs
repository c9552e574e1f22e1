//! Command gating and routing.
//!
//! The dispatcher decides whether a chat message is a generation command,
//! builds the request and hands it to the image flow or the video poller.
//! It never fails outward: anything the flows cannot report themselves ends
//! in the generic service-error reply.

use super::transport::ChatChannel;
use crate::config::{self, Settings, COMMAND_PREFIX};
use crate::delivery::DeliveryAdapter;
use crate::generation::{
    GenerationKind, GenerationRequest, ImageFlow, ImageOutcome, JobOutcome, PollConfig,
    VideoJobPoller,
};
use crate::media::MediaApi;
use crate::messages;
use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use teloxide::types::Message;
use tracing::{debug, error, info};

/// The parts of a chat message the dispatcher looks at
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub chat_id: i64,
    /// Sent by a bot, or by no user at all (channel posts)
    pub from_bot: bool,
    pub text: Option<String>,
}

impl InboundMessage {
    #[must_use]
    pub fn from_telegram(msg: &Message) -> Self {
        Self {
            chat_id: msg.chat.id.0,
            from_bot: msg.from.as_ref().is_none_or(|user| user.is_bot),
            text: msg.text().map(str::to_string),
        }
    }
}

/// A recognised command with its raw prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    pub kind: GenerationKind,
    /// Arguments joined with single spaces, possibly empty
    pub prompt: String,
}

/// Parses `!imagen ...` / `!veo ...`; anything else yields `None`.
#[must_use]
pub fn parse_command(text: &str) -> Option<Command> {
    let rest = text.strip_prefix(COMMAND_PREFIX)?;
    let mut tokens = rest.split_whitespace();
    let kind = GenerationKind::from_command(tokens.next()?)?;
    let prompt = tokens.collect::<Vec<_>>().join(" ");
    Some(Command { kind, prompt })
}

/// What a dispatched command led to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The prompt was empty; a usage hint was sent
    Usage(GenerationKind),
    Image(ImageOutcome),
    Video(JobOutcome),
}

/// Routes commands from the allowed chat to the generation flows
pub struct CommandDispatcher {
    allowed_chat_id: Option<i64>,
    image: ImageFlow,
    video: VideoJobPoller,
}

impl CommandDispatcher {
    #[must_use]
    pub const fn new(allowed_chat_id: Option<i64>, image: ImageFlow, video: VideoJobPoller) -> Self {
        Self {
            allowed_chat_id,
            image,
            video,
        }
    }

    /// Wires both flows to `media` with the configured limits.
    #[must_use]
    pub fn from_settings(settings: &Settings, media: Arc<dyn MediaApi>) -> Self {
        let image = ImageFlow::new(
            Arc::clone(&media),
            settings.tmp_path(),
            DeliveryAdapter::new(config::get_image_cleanup_delay()),
        );
        let video = VideoJobPoller::new(
            media,
            PollConfig::from_settings(settings),
            DeliveryAdapter::new(config::get_video_cleanup_delay()),
        );
        Self::new(settings.allowed_chat_id, image, video)
    }

    /// Returns the command carried by `msg` if the bot should act on it.
    #[must_use]
    pub fn accept(&self, msg: &InboundMessage) -> Option<Command> {
        if msg.from_bot {
            return None;
        }
        if self.allowed_chat_id != Some(msg.chat_id) {
            debug!(chat_id = msg.chat_id, "Ignoring message from another chat");
            return None;
        }
        parse_command(msg.text.as_deref()?)
    }

    /// Runs `command` to completion.
    ///
    /// Returns `None` when an unexpected error was turned into the generic
    /// service-error reply.
    pub async fn dispatch(
        &self,
        command: Command,
        channel: &dyn ChatChannel,
    ) -> Option<DispatchOutcome> {
        let kind = command.kind;
        match self.run(command, channel).await {
            Ok(outcome) => {
                info!(kind = %kind, outcome = ?outcome, "Command finished");
                Some(outcome)
            }
            Err(e) => {
                error!(kind = %kind, error = ?e, "Unhandled error while processing command");
                if let Err(reply_err) = channel.reply(messages::SERVICE_ERROR).await {
                    error!(error = %reply_err, "Failed to send service error reply");
                }
                None
            }
        }
    }

    async fn run(&self, command: Command, channel: &dyn ChatChannel) -> Result<DispatchOutcome> {
        let request = match GenerationRequest::new(command.kind, &command.prompt) {
            Ok(request) => request,
            Err(usage) => {
                channel.reply(&messages::usage(usage.kind)).await?;
                return Ok(DispatchOutcome::Usage(usage.kind));
            }
        };

        info!(kind = %request.kind(), prompt_chars = request.prompt().chars().count(), "Processing generation request");

        let outcome = match request.kind() {
            GenerationKind::Image => {
                let surface = channel.open_status(messages::IMAGE_PROCESSING).await?;
                DispatchOutcome::Image(self.image.run(&request, surface.as_ref()).await?)
            }
            GenerationKind::Video => {
                let surface = channel.open_status(messages::VIDEO_PROCESSING).await?;
                DispatchOutcome::Video(self.video.run(&request, surface.as_ref()).await?)
            }
        };

        let took = Utc::now().signed_duration_since(request.requested_at());
        info!(
            kind = %request.kind(),
            requested_at = %request.requested_at(),
            took_ms = took.num_milliseconds(),
            "Generation request completed"
        );
        Ok(outcome)
    }
}
