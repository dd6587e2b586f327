use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "naqra",
    about = "NAQRA - Telegram bot that downloads video, audio or trimmed clips from social media links",
    version,
    long_about = "A Telegram bot for members of a channel: send it a link and pick a resolution, audio only, a trimmed clip or the first entries of a playlist. Downloads are done with yt-dlp and ffmpeg and removed once delivered."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file (defaults to ./config.yaml or the user config directory)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the bot and long-poll Telegram for updates
    Run {
        /// Bot API token, overrides telegram.bot_token
        #[arg(long, env = "TELEGRAM_TOKEN", hide_env_values = true, value_name = "TOKEN")]
        token: Option<String>,
    },

    /// Resolve a link and print the menu the bot would offer
    Resolve {
        /// Link to resolve
        #[arg(value_name = "URL")]
        url: String,
    },

    /// Show configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// Check that yt-dlp and ffmpeg are installed
    Check,
}
