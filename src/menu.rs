//! Turning extractor renditions into the list of buttons a user picks from

use std::cmp::Reverse;
use std::collections::HashSet;
use std::fmt;

use crate::backend::MediaInfo;
use crate::messages::Messages;

/// A user decision from the format menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Choice {
    /// Video capped at this vertical resolution
    Quality { height: u32 },
    /// Audio only, converted to the configured codec
    Audio,
    /// Ask for a time range first, then download video
    Trim,
    /// First N entries of a playlist
    Playlist { limit: usize },
}

impl Choice {
    /// Parse inline button payloads (`quality_720`, `audio`, `trim`, `playlist_5`)
    pub fn from_callback_data(data: &str) -> Option<Self> {
        match data.trim() {
            "audio" => Some(Choice::Audio),
            "trim" => Some(Choice::Trim),
            other => {
                if let Some(height) = other.strip_prefix("quality_") {
                    let height = height.parse().ok().filter(|h| *h > 0)?;
                    Some(Choice::Quality { height })
                } else if let Some(limit) = other.strip_prefix("playlist_") {
                    let limit = limit.parse().ok().filter(|l| *l > 0)?;
                    Some(Choice::Playlist { limit })
                } else {
                    None
                }
            }
        }
    }

    pub fn callback_data(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Choice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Choice::Quality { height } => write!(f, "quality_{}", height),
            Choice::Audio => write!(f, "audio"),
            Choice::Trim => write!(f, "trim"),
            Choice::Playlist { limit } => write!(f, "playlist_{}", limit),
        }
    }
}

/// One button of the format menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MenuEntry {
    pub label: String,
    pub choice: Choice,
}

/// Knobs for menu derivation
#[derive(Debug, Clone)]
pub struct MenuOptions {
    /// Smallest vertical resolution offered
    pub min_height: u32,
    /// Container the delivered video must be in
    pub container: String,
    /// Entries offered for bulk playlist download
    pub playlist_limit: usize,
}

impl Default for MenuOptions {
    fn default() -> Self {
        Self {
            min_height: 360,
            container: "mp4".to_string(),
            playlist_limit: 5,
        }
    }
}

/// Build the ordered, de-duplicated menu for a resolved link.
///
/// Video entries come first, tallest resolution first, one per height. For
/// equal heights the larger file is kept since it is usually the better
/// encode. Audio and trim are always offered; bulk download only for
/// playlists with more than one entry.
pub fn derive_menu(info: &MediaInfo, options: &MenuOptions, messages: &Messages) -> Vec<MenuEntry> {
    let mut candidates: Vec<_> = info
        .renditions
        .iter()
        .filter(|r| r.has_video && r.has_audio && r.ext.eq_ignore_ascii_case(&options.container))
        .filter_map(|r| r.height.map(|height| (height, r.size)))
        .filter(|(height, _)| *height >= options.min_height)
        .collect();

    candidates.sort_by_key(|(height, size)| (Reverse(*height), Reverse(*size)));

    let mut seen = HashSet::new();
    let mut menu: Vec<MenuEntry> = candidates
        .into_iter()
        .filter(|(height, _)| seen.insert(*height))
        .map(|(height, size)| MenuEntry {
            label: messages.video_label(height, &messages.size(size)),
            choice: Choice::Quality { height },
        })
        .collect();

    menu.push(MenuEntry {
        label: messages.audio_label(),
        choice: Choice::Audio,
    });
    menu.push(MenuEntry {
        label: messages.trim_label(),
        choice: Choice::Trim,
    });

    if info.is_playlist() && options.playlist_limit > 0 {
        menu.push(MenuEntry {
            label: messages.playlist_label(options.playlist_limit),
            choice: Choice::Playlist {
                limit: options.playlist_limit,
            },
        });
    }

    menu
}

/// Whether `choice` was one of the buttons in `menu`
pub fn offers(menu: &[MenuEntry], choice: &Choice) -> bool {
    menu.iter().any(|entry| entry.choice == *choice)
}
