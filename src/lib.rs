//! NAQRA bot - download video, audio or trimmed clips from social media links
//!
//! This library holds the per-user conversation state machine, the menu
//! derivation from yt-dlp metadata, and the download/deliver/cleanup pipeline.
//! Telegram and yt-dlp are reached through the `MessagingGateway` and
//! `MediaBackend` traits so every piece can be driven without the network.

pub mod backend;
pub mod bot;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod membership;
pub mod menu;
pub mod messages;
pub mod pipeline;
pub mod session;
pub mod trim;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{MediaBackend, MediaInfo, Rendition};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use gateway::{InboundEvent, MessagingGateway};
pub use membership::MembershipGate;
pub use menu::{derive_menu, Choice, MenuEntry};
pub use pipeline::AcquisitionPipeline;
pub use session::{SessionMachine, SessionState, SessionStore};
pub use trim::{parse_trim, TrimSpec};

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Failures surfaced to users, one variant per handling policy
#[derive(thiserror::Error, Debug)]
pub enum BotError {
    #[error("Membership check failed: {0}")]
    Gate(String),

    #[error("Could not resolve link: {0}")]
    Resolution(String),

    #[error("Invalid trim range: {0}")]
    Parse(#[from] trim::TrimError),

    #[error("Download failed: {0}")]
    Acquisition(String),

    #[error("Upload failed: {0}")]
    Delivery(String),
}

impl BotError {
    /// Coarse category shown to the user next to a failure message
    pub fn category(&self) -> &'static str {
        match self {
            BotError::Gate(_) => "membership",
            BotError::Resolution(_) => "resolution",
            BotError::Parse(_) => "trim",
            BotError::Acquisition(_) => "download",
            BotError::Delivery(_) => "upload",
        }
    }
}
