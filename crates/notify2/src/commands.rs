use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use tokio::io::AsyncReadExt;
use tracing::info;

use notify2_core::{
    domain::{MessageId, ParseMode},
    request::{MediaOptions, TextOptions},
    transport::types::{BotInfo, DeliveryResult},
    Config, Notifier,
};

use crate::cli::{Commands, ConfigSource, MediaArgs};

const TEXT_PREVIEW_CHARS: usize = 50;

pub async fn execute(command: Commands, source: &ConfigSource) -> Result<()> {
    match command {
        Commands::Test => test(source).await,
        Commands::Send {
            message,
            parse_mode,
            disable_preview,
            silent,
            reply_to,
        } => {
            let options = TextOptions {
                parse_mode,
                disable_web_page_preview: disable_preview,
                disable_notification: silent,
                reply_to_message_id: reply_to.map(MessageId),
            };
            send(source, message, options).await
        }
        Commands::Photo { file, media } => photo(source, &file, media).await,
        Commands::Document { file, media } => document(source, &file, media).await,
        Commands::Info => show_info(source),
        Commands::Setup {
            token,
            chat_id,
            parse_mode,
        } => setup(source, token, chat_id, parse_mode).await,
    }
}

pub fn load_config(source: &ConfigSource) -> Result<Config> {
    if source.env {
        return Config::from_env().context("failed to load configuration from environment");
    }
    let path = config_path(source)?;
    Config::from_file(&path).with_context(|| {
        format!(
            "failed to load {} (run `notify setup` to create it)",
            path.display()
        )
    })
}

fn config_path(source: &ConfigSource) -> Result<PathBuf> {
    match &source.config {
        Some(path) => Ok(path.clone()),
        None => Ok(Config::default_path()?),
    }
}

fn open(source: &ConfigSource) -> Result<Notifier> {
    let config = load_config(source)?;
    Ok(notify2_telegram::connect(config)?)
}

async fn test(source: &ConfigSource) -> Result<()> {
    let notifier = open(source)?;
    let bot: BotInfo = notifier
        .bot_info()
        .await
        .context("telegram connection test failed")?;
    notifier.close();

    println!("Telegram connection test passed!");
    print_table("Bot Information", &bot_rows(&bot));
    Ok(())
}

async fn send(source: &ConfigSource, message: Option<String>, options: TextOptions) -> Result<()> {
    let message = match message {
        Some(m) => m,
        None => read_stdin().await?,
    };
    if message.trim().is_empty() {
        bail!("no message provided");
    }

    let notifier = open(source)?;
    let sent = notifier.send_message(&message, options).await?;
    notifier.close();

    info!(message_id = ?sent.message_id(), "message sent");
    println!("Message sent successfully!");
    print_table("Message Details", &message_rows(&sent));
    Ok(())
}

async fn photo(source: &ConfigSource, file: &Path, media: MediaArgs) -> Result<()> {
    let notifier = open(source)?;
    notifier.send_photo(file, media_options(media)).await?;
    notifier.close();
    println!("Photo sent successfully!");
    Ok(())
}

async fn document(source: &ConfigSource, file: &Path, media: MediaArgs) -> Result<()> {
    let notifier = open(source)?;
    notifier.send_document(file, media_options(media)).await?;
    notifier.close();
    println!("Document sent successfully!");
    Ok(())
}

fn show_info(source: &ConfigSource) -> Result<()> {
    let config = load_config(source)?;
    print_table("Configuration Information", &config_rows(&config));
    Ok(())
}

async fn setup(
    source: &ConfigSource,
    token: String,
    chat_id: String,
    parse_mode: Option<ParseMode>,
) -> Result<()> {
    let mut builder = Config::builder(token, chat_id);
    if let Some(mode) = parse_mode {
        builder = builder.parse_mode(mode);
    }
    let config = builder.build().context("invalid credentials")?;

    let notifier = notify2_telegram::connect(config.clone())?;
    notifier
        .test_connection()
        .await
        .context("setup failed: could not reach the bot with these credentials")?;
    notifier.close();
    println!("Configuration is valid!");

    let path = config_path(source)?;
    config
        .save_to_file(&path)
        .with_context(|| format!("failed to save {}", path.display()))?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

async fn read_stdin() -> Result<String> {
    if std::io::stdin().is_terminal() {
        bail!("no message provided (pass MESSAGE or pipe text on stdin)");
    }
    let mut buf = String::new();
    tokio::io::stdin()
        .read_to_string(&mut buf)
        .await
        .context("failed to read message from stdin")?;
    Ok(buf.trim().to_string())
}

fn media_options(media: MediaArgs) -> MediaOptions {
    MediaOptions {
        caption: media.caption,
        parse_mode: media.parse_mode,
        disable_notification: media.silent,
    }
}

fn bot_rows(bot: &BotInfo) -> Vec<(&'static str, String)> {
    vec![
        ("Bot ID", bot.id.to_string()),
        ("Bot Name", bot.first_name.clone()),
        (
            "Username",
            bot.username
                .as_deref()
                .map(|u| format!("@{u}"))
                .unwrap_or_else(|| "-".to_string()),
        ),
        ("Can Join Groups", bot.can_join_groups.to_string()),
        (
            "Can Read All Group Messages",
            bot.can_read_all_group_messages.to_string(),
        ),
        ("Supports Inline Queries", bot.supports_inline_queries.to_string()),
    ]
}

fn message_rows(sent: &DeliveryResult) -> Vec<(&'static str, String)> {
    let result = sent.result();
    let or_dash = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());

    let date = result
        .get("date")
        .and_then(|d| d.as_i64())
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string());
    let text = result
        .get("text")
        .and_then(|t| t.as_str())
        .map(|t| preview(t, TEXT_PREVIEW_CHARS));

    vec![
        ("Message ID", or_dash(sent.message_id().map(|m| m.to_string()))),
        (
            "Chat ID",
            or_dash(result.pointer("/chat/id").map(|id| id.to_string())),
        ),
        ("Date", or_dash(date)),
        ("Text", or_dash(text)),
    ]
}

fn config_rows(config: &Config) -> Vec<(&'static str, String)> {
    vec![
        ("Bot Token", config.redacted_token()),
        ("Chat ID", config.chat_id().to_string()),
        ("Parse Mode", config.parse_mode().to_string()),
        ("Timeout", format!("{}s", config.timeout_secs())),
        ("Retry Attempts", config.retry_attempts().to_string()),
        ("Retry Delay", format!("{}s", config.retry_delay_secs())),
    ]
}

fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let head: String = text.chars().take(max_chars).collect();
    format!("{head}...")
}

fn print_table(title: &str, rows: &[(&str, String)]) {
    let width = rows.iter().map(|(k, _)| k.len()).max().unwrap_or(0);
    println!("\n{title}");
    for (key, value) in rows {
        println!("  {key:<width$}  {value}");
    }
}
