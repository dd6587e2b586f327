use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod ytdlp;

use crate::trim::TrimSpec;
use crate::Result;

pub use ytdlp::YtDlpBackend;

/// Snapshot of what the extractor reported for one URL
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    /// Title of the media (or playlist)
    pub title: Option<String>,

    /// Duration in seconds if known
    pub duration: Option<f64>,

    /// Thumbnail URL for the menu card
    pub thumbnail: Option<String>,

    /// Canonical page URL used for the actual download
    pub source_url: String,

    /// Downloadable variants, in extractor order
    pub renditions: Vec<Rendition>,

    /// Number of entries when the URL resolved to a playlist
    pub entry_count: Option<usize>,
}

impl MediaInfo {
    /// Nothing to offer: no variants and not a playlist
    pub fn is_empty(&self) -> bool {
        self.renditions.is_empty() && self.entry_count.unwrap_or(0) == 0
    }

    pub fn is_playlist(&self) -> bool {
        self.entry_count.map_or(false, |count| count > 1)
    }
}

/// One downloadable encoding of a media source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rendition {
    pub has_video: bool,
    pub has_audio: bool,

    /// Container extension (mp4, webm, m4a, ...)
    pub ext: String,

    /// Vertical resolution in pixels
    pub height: Option<u32>,

    /// Exact or approximate size in bytes
    pub size: Option<u64>,
}

/// What to ask the backend for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatSelector {
    /// Best muxed video not taller than the given height
    VideoUpTo { height: u32, container: String },

    /// Best audio, converted to the given codec
    AudioOnly { codec: String },

    /// Best single-file video in the container
    BestVideo { container: String },
}

impl FormatSelector {
    pub fn is_audio(&self) -> bool {
        matches!(self, FormatSelector::AudioOnly { .. })
    }
}

/// A single backend invocation
#[derive(Debug, Clone)]
pub struct AcquireRequest {
    pub url: String,
    pub selector: FormatSelector,
    pub trim: Option<TrimSpec>,

    /// Download the first N playlist entries instead of a single item
    pub playlist_limit: Option<usize>,

    /// Directory the backend must write into, owned by the caller
    pub output_dir: PathBuf,
}

/// Files the backend says it produced, before any post-processing renames
#[derive(Debug, Clone, Default)]
pub struct Acquired {
    pub reported_files: Vec<PathBuf>,
}

/// Resolves URLs to metadata and downloads the chosen variant
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaBackend: Send + Sync {
    /// Fetch metadata only, nothing is downloaded
    async fn resolve_metadata(&self, url: &str) -> Result<MediaInfo>;

    /// Download plus any post-processing (audio extraction, trimming) as one unit
    async fn acquire(&self, request: &AcquireRequest) -> Result<Acquired>;

    /// Get the name of this backend
    fn name(&self) -> &'static str;
}
