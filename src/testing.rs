//! In-memory collaborators for unit tests

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::backend::{MediaInfo, Rendition};
use crate::gateway::{ChatId, Keyboard, MediaKind, MessageId, MessagingGateway};
use crate::Result;

#[derive(Debug, Clone)]
pub struct Upload {
    pub chat_id: ChatId,
    pub kind: MediaKind,
    pub path: PathBuf,
    /// Whether the file was on disk when the upload started
    pub existed: bool,
}

#[derive(Debug, Clone)]
pub enum Sent {
    Text { chat_id: ChatId, text: String, keyboard: Option<Keyboard> },
    Photo { chat_id: ChatId, caption: String, keyboard: Keyboard },
    Upload(Upload),
    Edit { message_id: MessageId, text: String },
    Delete { message_id: MessageId },
    Answer { query_id: String },
}

/// Gateway that records everything it is asked to send
#[derive(Default)]
pub struct RecordingGateway {
    sent: Mutex<Vec<Sent>>,
    next_id: AtomicI64,
    fail_uploads: bool,
}

impl RecordingGateway {
    pub fn failing_uploads() -> Self {
        Self {
            fail_uploads: true,
            ..Self::default()
        }
    }

    fn push(&self, sent: Sent) {
        self.sent.lock().unwrap().push(sent);
    }

    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Texts of messages, captions and edits in send order
    pub fn texts(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Text { text, .. } | Sent::Edit { text, .. } => Some(text),
                Sent::Photo { caption, .. } => Some(caption),
                _ => None,
            })
            .collect()
    }

    pub fn uploads(&self) -> Vec<Upload> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Upload(upload) => Some(upload),
                _ => None,
            })
            .collect()
    }

    /// Callback payloads of the most recent keyboard
    pub fn last_menu(&self) -> Vec<String> {
        self.sent()
            .into_iter()
            .rev()
            .find_map(|s| match s {
                Sent::Text { keyboard: Some(k), .. } | Sent::Photo { keyboard: k, .. } => Some(k),
                _ => None,
            })
            .map(|k| k.into_iter().flatten().map(|b| b.callback_data).collect())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MessagingGateway for RecordingGateway {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<MessageId> {
        self.push(Sent::Text {
            chat_id,
            text: text.to_string(),
            keyboard: keyboard.cloned(),
        });
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn send_photo(
        &self,
        chat_id: ChatId,
        _photo_url: &str,
        caption: &str,
        keyboard: &Keyboard,
    ) -> Result<MessageId> {
        self.push(Sent::Photo {
            chat_id,
            caption: caption.to_string(),
            keyboard: keyboard.clone(),
        });
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    async fn send_media(
        &self,
        chat_id: ChatId,
        kind: MediaKind,
        path: &Path,
        _timeout: Duration,
    ) -> Result<()> {
        self.push(Sent::Upload(Upload {
            chat_id,
            kind,
            path: path.to_path_buf(),
            existed: path.is_file(),
        }));
        if self.fail_uploads {
            anyhow::bail!("Telegram API sendVideo failed: Request Entity Too Large");
        }
        Ok(())
    }

    async fn edit_message(
        &self,
        _chat_id: ChatId,
        message_id: MessageId,
        text: &str,
    ) -> Result<()> {
        self.push(Sent::Edit {
            message_id,
            text: text.to_string(),
        });
        Ok(())
    }

    async fn delete_message(&self, _chat_id: ChatId, message_id: MessageId) -> Result<()> {
        self.push(Sent::Delete { message_id });
        Ok(())
    }

    async fn answer_callback(&self, query_id: &str) -> Result<()> {
        self.push(Sent::Answer {
            query_id: query_id.to_string(),
        });
        Ok(())
    }
}

/// Media with one muxed mp4 rendition per height plus a smaller duplicate of each
pub fn media_info(heights: &[u32]) -> MediaInfo {
    let renditions = heights
        .iter()
        .flat_map(|&height| {
            [100, 200].into_iter().map(move |size| Rendition {
                has_video: true,
                has_audio: true,
                ext: "mp4".into(),
                height: Some(height),
                size: Some(size * height as u64),
            })
        })
        .collect();

    MediaInfo {
        title: Some("Synthetic clip".into()),
        duration: Some(95.0),
        thumbnail: None,
        source_url: "https://example.com/v/1".into(),
        renditions,
        entry_count: None,
    }
}
