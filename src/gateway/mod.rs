use async_trait::async_trait;
use std::path::Path;
use std::time::Duration;

pub mod telegram;

use crate::Result;

pub use telegram::TelegramGateway;

pub type UserId = i64;
pub type ChatId = i64;
pub type MessageId = i64;

/// One inline keyboard button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub text: String,
    pub callback_data: String,
}

/// Rows of buttons
pub type Keyboard = Vec<Vec<Button>>;

/// Kind of file being delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

/// An inbound update, already stripped of transport details
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub kind: EventKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// `/name args`
    Command { name: String, args: String },
    /// Free text that is not a command
    Text(String),
    /// Inline button press
    Callback {
        query_id: String,
        data: String,
        message_id: Option<MessageId>,
    },
}

impl InboundEvent {
    pub fn command(user_id: UserId, chat_id: ChatId, name: &str) -> Self {
        Self {
            user_id,
            chat_id,
            kind: EventKind::Command {
                name: name.to_string(),
                args: String::new(),
            },
        }
    }

    pub fn text(user_id: UserId, chat_id: ChatId, text: &str) -> Self {
        Self {
            user_id,
            chat_id,
            kind: EventKind::Text(text.to_string()),
        }
    }

    pub fn callback(user_id: UserId, chat_id: ChatId, data: &str) -> Self {
        Self {
            user_id,
            chat_id,
            kind: EventKind::Callback {
                query_id: format!("cb-{}", user_id),
                data: data.to_string(),
                message_id: None,
            },
        }
    }
}

/// Outbound side of the chat transport
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId>;

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo_url: &str,
        caption: &str,
        keyboard: &Keyboard,
    ) -> Result<MessageId>;

    /// Upload a local file; `timeout` bounds the whole upload
    async fn send_media(
        &self,
        chat_id: ChatId,
        kind: MediaKind,
        path: &Path,
        timeout: Duration,
    ) -> Result<()>;

    async fn edit_message(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<()>;

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()>;

    async fn answer_callback(&self, query_id: &str) -> Result<()>;

    async fn send_audio(&self, chat_id: ChatId, path: &Path, timeout: Duration) -> Result<()> {
        self.send_media(chat_id, MediaKind::Audio, path, timeout).await
    }

    async fn send_video(&self, chat_id: ChatId, path: &Path, timeout: Duration) -> Result<()> {
        self.send_media(chat_id, MediaKind::Video, path, timeout).await
    }
}
