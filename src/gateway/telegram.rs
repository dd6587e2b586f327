use anyhow::{bail, Context};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use super::{
    ChatId, EventKind, InboundEvent, Keyboard, MediaKind, MessageId, MessagingGateway, UserId,
};
use crate::membership::{MembershipOracle, MembershipStatus};
use crate::Result;

/// Minimal Telegram Bot API client using reqwest
pub struct TelegramGateway {
    client: reqwest::Client,
    base_url: String,
}

// --- Request/response types ---

#[derive(Debug, Clone, Serialize)]
struct InlineKeyboardMarkup {
    inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, Serialize)]
struct InlineKeyboardButton {
    text: String,
    callback_data: String,
}

impl From<&Keyboard> for InlineKeyboardMarkup {
    fn from(keyboard: &Keyboard) -> Self {
        Self {
            inline_keyboard: keyboard
                .iter()
                .map(|row| {
                    row.iter()
                        .map(|button| InlineKeyboardButton {
                            text: button.text.clone(),
                            callback_data: button.callback_data.clone(),
                        })
                        .collect()
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    pub from: Option<User>,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Deserialize)]
struct ChatMember {
    status: String,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

impl Update {
    /// Convert to a transport-neutral event; updates we do not handle yield `None`
    pub fn into_event(self) -> Option<InboundEvent> {
        if let Some(cq) = self.callback_query {
            let data = cq.data?;
            let (chat_id, message_id) = cq
                .message
                .as_ref()
                .map(|m| (m.chat.id, Some(m.message_id)))
                .unwrap_or((cq.from.id, None));
            return Some(InboundEvent {
                user_id: cq.from.id,
                chat_id,
                kind: EventKind::Callback {
                    query_id: cq.id,
                    data,
                    message_id,
                },
            });
        }

        let msg = self.message?;
        let user_id = msg.from.as_ref().map(|u| u.id)?;
        let text = msg.text?;

        let kind = match text.strip_prefix('/') {
            Some(command) => {
                let (head, args) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
                // `/start@naqra_bot` in group chats
                let name = head.split('@').next().unwrap_or(head);
                EventKind::Command {
                    name: name.to_lowercase(),
                    args: args.trim().to_string(),
                }
            }
            None => EventKind::Text(text),
        };

        Some(InboundEvent {
            user_id,
            chat_id: msg.chat.id,
            kind,
        })
    }
}

/// Open a file for a streamed multipart upload, with its length
async fn open_upload(path: &Path) -> Result<(tokio::fs::File, u64)> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let len = file
        .metadata()
        .await
        .with_context(|| format!("Failed to stat {}", path.display()))?
        .len();
    Ok((file, len))
}

impl TelegramGateway {
    pub fn new(bot_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: format!("https://api.telegram.org/bot{bot_token}"),
        }
    }

    pub async fn get_updates(&self, offset: Option<i64>, timeout: u32) -> Result<Vec<Update>> {
        let mut body = serde_json::json!({
            "timeout": timeout,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(off) = offset {
            body["offset"] = serde_json::Value::Number(off.into());
        }

        let resp: ApiResponse<Vec<Update>> = self
            .client
            .post(format!("{}/getUpdates", self.base_url))
            .json(&body)
            .timeout(Duration::from_secs((timeout + 10) as u64))
            .send()
            .await?
            .json()
            .await?;

        if !resp.ok {
            bail!("getUpdates failed: {}", resp.description.unwrap_or_default());
        }
        Ok(resp.result.unwrap_or_default())
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: &serde_json::Value) -> Result<T> {
        let resp: ApiResponse<T> = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .json(body)
            .send()
            .await?
            .json()
            .await?;

        unwrap_response(method, resp)
    }
}

fn unwrap_response<T>(method: &str, resp: ApiResponse<T>) -> Result<T> {
    if !resp.ok {
        bail!("Telegram API {method} failed: {}", resp.description.unwrap_or_default());
    }
    resp.result
        .with_context(|| format!("Telegram API {method} returned no result"))
}

fn with_keyboard(
    mut body: serde_json::Value,
    keyboard: Option<&Keyboard>,
) -> Result<serde_json::Value> {
    if let Some(keyboard) = keyboard {
        body["reply_markup"] = serde_json::to_value(InlineKeyboardMarkup::from(keyboard))?;
    }
    Ok(body)
}

#[async_trait]
impl MessagingGateway for TelegramGateway {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId> {
        let body = with_keyboard(
            serde_json::json!({ "chat_id": chat_id, "text": text }),
            keyboard,
        )?;
        let message: Message = self.call("sendMessage", &body).await?;
        Ok(message.message_id)
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo_url: &str,
        caption: &str,
        keyboard: &Keyboard,
    ) -> Result<MessageId> {
        let body = with_keyboard(
            serde_json::json!({ "chat_id": chat_id, "photo": photo_url, "caption": caption }),
            Some(keyboard),
        )?;
        let message: Message = self.call("sendPhoto", &body).await?;
        Ok(message.message_id)
    }

    async fn send_media(
        &self,
        chat_id: ChatId,
        kind: MediaKind,
        path: &Path,
        timeout: Duration,
    ) -> Result<()> {
        let (method, field) = match kind {
            MediaKind::Video => ("sendVideo", "video"),
            MediaKind::Audio => ("sendAudio", "audio"),
        };

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| field.to_string());
        let (file, len) = open_upload(path).await?;

        tracing::info!("Uploading {} ({} bytes) via {}", file_name, len, method);

        let part = Part::stream_with_length(reqwest::Body::from(file), len).file_name(file_name);
        let form = Form::new().text("chat_id", chat_id.to_string()).part(field, part);

        let resp: ApiResponse<serde_json::Value> = self
            .client
            .post(format!("{}/{method}", self.base_url))
            .multipart(form)
            .timeout(timeout)
            .send()
            .await?
            .json()
            .await?;

        unwrap_response(method, resp).map(|_| ())
    }

    async fn edit_message(&self, chat_id: ChatId, message_id: MessageId, text: &str) -> Result<()> {
        let body =
            serde_json::json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        // editing a photo card has no text to replace, fall back to its caption
        match self.call::<serde_json::Value>("editMessageText", &body).await {
            Ok(_) => Ok(()),
            Err(_) => {
                let body = serde_json::json!({
                    "chat_id": chat_id,
                    "message_id": message_id,
                    "caption": text,
                });
                self.call::<serde_json::Value>("editMessageCaption", &body).await.map(|_| ())
            }
        }
    }

    async fn delete_message(&self, chat_id: ChatId, message_id: MessageId) -> Result<()> {
        let body = serde_json::json!({ "chat_id": chat_id, "message_id": message_id });
        self.call::<serde_json::Value>("deleteMessage", &body).await.map(|_| ())
    }

    async fn answer_callback(&self, query_id: &str) -> Result<()> {
        let body = serde_json::json!({ "callback_query_id": query_id });
        self.call::<serde_json::Value>("answerCallbackQuery", &body).await.map(|_| ())
    }
}

#[async_trait]
impl MembershipOracle for TelegramGateway {
    async fn membership_status(
        &self,
        channel_id: &str,
        user_id: UserId,
    ) -> Result<MembershipStatus> {
        let body = serde_json::json!({ "chat_id": channel_id, "user_id": user_id });
        let member: ChatMember = self.call("getChatMember", &body).await?;
        Ok(parse_member_status(&member.status))
    }
}

fn parse_member_status(status: &str) -> MembershipStatus {
    match status {
        "creator" => MembershipStatus::Owner,
        "administrator" => MembershipStatus::Admin,
        "member" => MembershipStatus::Member,
        _ => MembershipStatus::Other,
    }
}
