use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};
use notify2_core::domain::ParseMode;

#[derive(Parser, Debug)]
#[command(name = "notify", version, about = "Send Telegram notifications from the shell")]
pub struct Args {
    #[command(flatten)]
    pub source: ConfigSource,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where configuration comes from. Defaults to `~/.notify2/config.json`.
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ConfigSource {
    /// Path to a JSON configuration file
    #[arg(short, long, global = true, value_name = "PATH", conflicts_with = "env")]
    pub config: Option<PathBuf>,

    /// Read configuration from TELEGRAM_* environment variables (and .env)
    #[arg(long, global = true)]
    pub env: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check the connection and show bot information
    Test,

    /// Send a text message (reads stdin when MESSAGE is omitted)
    Send {
        message: Option<String>,

        #[arg(short, long, value_name = "MODE")]
        parse_mode: Option<ParseMode>,

        /// Disable link previews
        #[arg(long)]
        disable_preview: bool,

        /// Deliver without a notification sound
        #[arg(long)]
        silent: bool,

        /// Reply to this message id
        #[arg(long, value_name = "MESSAGE_ID")]
        reply_to: Option<i64>,
    },

    /// Send a photo
    Photo {
        file: PathBuf,
        #[command(flatten)]
        media: MediaArgs,
    },

    /// Send a file as a document
    Document {
        file: PathBuf,
        #[command(flatten)]
        media: MediaArgs,
    },

    /// Show the current configuration (token redacted)
    Info,

    /// Validate credentials, test them and save the configuration file
    Setup {
        #[arg(long, env = "TELEGRAM_BOT_TOKEN", hide_env_values = true)]
        token: String,

        #[arg(long, env = "TELEGRAM_CHAT_ID")]
        chat_id: String,

        #[arg(short, long, value_name = "MODE")]
        parse_mode: Option<ParseMode>,
    },
}

#[derive(ClapArgs, Debug, Clone)]
pub struct MediaArgs {
    #[arg(long)]
    pub caption: Option<String>,

    #[arg(short, long, value_name = "MODE")]
    pub parse_mode: Option<ParseMode>,

    #[arg(long)]
    pub silent: bool,
}
