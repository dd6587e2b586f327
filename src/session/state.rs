use chrono::{DateTime, Utc};
use std::fmt;

use crate::backend::MediaInfo;
use crate::gateway::{ChatId, UserId};
use crate::menu::{Choice, MenuEntry};
use crate::trim::TrimSpec;

/// Where a user is in the conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No session exists
    Idle,
    /// Waiting for a link or a menu pick
    SelectingFormat,
    /// "Trim" was picked, waiting for `START-END`
    AwaitingTrimTimes,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "idle",
            SessionState::SelectingFormat => "selecting_format",
            SessionState::AwaitingTrimTimes => "awaiting_trim_times",
        };
        f.write_str(name)
    }
}

/// Per-user conversation state
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub state: SessionState,

    /// Metadata of the last resolved link
    pub media: Option<MediaInfo>,

    /// Menu shown for `media`; picks are validated against it
    pub menu: Vec<MenuEntry>,

    pub choice: Option<Choice>,
    pub trim: Option<TrimSpec>,

    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
}

impl Session {
    pub fn new(user_id: UserId, chat_id: ChatId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            chat_id,
            state: SessionState::SelectingFormat,
            media: None,
            menu: Vec::new(),
            choice: None,
            trim: None,
            created_at: now,
            last_activity_at: now,
        }
    }

    /// Forget the previous link and everything derived from it
    pub fn clear_selection(&mut self) {
        self.media = None;
        self.menu.clear();
        self.choice = None;
        self.trim = None;
    }
}
