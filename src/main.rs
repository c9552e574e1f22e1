use dotenvy::dotenv;
use oxide_media_bot::bot::{CommandDispatcher, InboundMessage, TelegramChannel};
use oxide_media_bot::config::Settings;
use oxide_media_bot::media::{MediaApi, MediaClient, MediaClientConfig};
use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use tracing::{error, info};
use tracing_subscriber::{prelude::*, EnvFilter};

/// Regex patterns for redacting sensitive data
struct RedactionPatterns {
    token1: Regex,
    token2: Regex,
    token3: Regex,
    api_key_header: Regex,
    api_key_query: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            token1: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            token2: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            token3: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            api_key_header: Regex::new(r#"(?i)(x-goog-api-key"?\s*[:=]\s*"?)[^\s",}]+"#)?,
            api_key_query: Regex::new(r"([?&]key=)[^\s&]+")?,
        })
    }

    fn redact(&self, input: &str) -> String {
        let mut output = input.to_string();
        output = self
            .token1
            .replace_all(&output, "$1[TELEGRAM_TOKEN]$3")
            .to_string();
        output = self
            .token2
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .token3
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .to_string();
        output = self
            .api_key_header
            .replace_all(&output, "${1}[MASKED]")
            .to_string();
        output = self
            .api_key_query
            .replace_all(&output, "${1}[MASKED]")
            .to_string();
        output
    }
}

struct RedactingWriter<W: Write> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> RedactingWriter<W> {
    const fn new(inner: W, patterns: Arc<RedactionPatterns>) -> Self {
        Self { inner, patterns }
    }
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let s = String::from_utf8_lossy(buf);
        let redacted = self.patterns.redact(&s);
        self.inner.write_all(redacted.as_bytes())?;
        // The caller's buffer was consumed in full even if the redacted text differs in length.
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

struct RedactingMakeWriter<F> {
    make_inner: F,
    patterns: Arc<RedactionPatterns>,
}

impl<F> RedactingMakeWriter<F> {
    const fn new(make_inner: F, patterns: Arc<RedactionPatterns>) -> Self {
        Self {
            make_inner,
            patterns,
        }
    }
}

impl<'a, F, W> tracing_subscriber::fmt::MakeWriter<'a> for RedactingMakeWriter<F>
where
    F: Fn() -> W + 'static,
    W: Write,
{
    type Writer = RedactingWriter<W>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter::new((self.make_inner)(), self.patterns.clone())
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file
    dotenv().ok();

    // Initialize redaction patterns early (before logging)
    let patterns = Arc::new(RedactionPatterns::new().map_err(|e| {
        eprintln!("Failed to compile regex patterns: {e}");
        e
    })?);

    init_logging(patterns);

    info!("Starting Oxide Media Bot...");

    let settings = init_settings();

    let media: Arc<dyn MediaApi> =
        Arc::new(MediaClient::new(MediaClientConfig::from_settings(&settings)));
    info!(proxy = %settings.proxy_base(), imagen = %settings.imagen_model, veo = %settings.veo_model, "Media client initialized.");

    let dispatcher = Arc::new(CommandDispatcher::from_settings(&settings, media));

    let bot = Bot::new(settings.telegram_token.clone());

    info!("Bot is running...");

    Dispatcher::builder(bot, setup_handler())
        .dependencies(dptree::deps![dispatcher])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}

fn init_logging(patterns: Arc<RedactionPatterns>) {
    let make_writer = RedactingMakeWriter::new(io::stderr, patterns);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(make_writer))
        .init();
}

fn init_settings() -> Settings {
    match Settings::new() {
        Ok(s) => {
            info!("Configuration loaded successfully.");
            s
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

fn setup_handler() -> UpdateHandler<teloxide::RequestError> {
    Update::filter_message().endpoint(handle_message)
}

async fn handle_message(
    bot: Bot,
    msg: Message,
    dispatcher: Arc<CommandDispatcher>,
) -> Result<(), teloxide::RequestError> {
    let Some(command) = dispatcher.accept(&InboundMessage::from_telegram(&msg)) else {
        return respond(());
    };

    // A video poll can take ten minutes; it must not hold up the update loop.
    tokio::spawn(async move {
        let channel = TelegramChannel::new(bot, msg.chat.id, msg.id);
        dispatcher.dispatch(command, &channel).await;
    });

    respond(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn patterns() -> RedactionPatterns {
        RedactionPatterns::new().expect("valid patterns")
    }

    #[test]
    fn redacts_telegram_tokens() {
        let line = "GET https://api.telegram.org/bot123456789:AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsawq/getMe ";
        let out = patterns().redact(line);
        assert!(out.contains("/bot[TELEGRAM_TOKEN]/"));
        assert!(!out.contains("AAHdqTcvCH1vGWJxfSeofSAs0K5PALDsawq"));
    }

    #[test]
    fn redacts_media_api_keys() {
        let p = patterns();
        let header = p.redact(r#"headers: {"x-goog-api-key": "sk-secret-123", "accept": "*/*"}"#);
        assert!(!header.contains("sk-secret-123"));
        assert!(header.contains("[MASKED]"));

        let query = p.redact("GET https://proxy/v1beta/operations/abc?key=sk-secret-123&alt=json");
        assert_eq!(query, "GET https://proxy/v1beta/operations/abc?key=[MASKED]&alt=json");
    }
}
