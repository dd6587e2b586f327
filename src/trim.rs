//! Parsing of user supplied trim ranges such as `0:30-1:45`

use std::fmt;
use std::time::Duration;

use crate::utils::format_clock;

/// A validated time range, `end` is always after `start`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrimSpec {
    start: Duration,
    end: Duration,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TrimError {
    #[error("expected START-END, got {0:?}")]
    Malformed(String),

    #[error("negative times are not allowed")]
    Negative,

    #[error("{0:?} is not a valid [[H:]MM:]SS time")]
    InvalidTime(String),

    #[error("end {end}s must be after start {start}s")]
    EmptyRange { start: u64, end: u64 },
}

impl TrimSpec {
    pub fn new(start: Duration, end: Duration) -> Result<Self, TrimError> {
        if end <= start {
            return Err(TrimError::EmptyRange {
                start: start.as_secs(),
                end: end.as_secs(),
            });
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Duration {
        self.start
    }

    pub fn end(&self) -> Duration {
        self.end
    }

    pub fn length(&self) -> Duration {
        self.end - self.start
    }

    /// Range in yt-dlp `--download-sections` syntax
    pub fn as_download_section(&self) -> String {
        format!("*{}-{}", self.start.as_secs(), self.end.as_secs())
    }
}

impl fmt::Display for TrimSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            format_clock(self.start.as_secs()),
            format_clock(self.end.as_secs())
        )
    }
}

/// Parse `START-END` where each side is `[[H:]MM:]SS`, whitespace around
/// either side is ignored.
pub fn parse_trim(text: &str) -> Result<TrimSpec, TrimError> {
    let text = text.trim();
    let parts: Vec<&str> = text.split('-').map(str::trim).collect();

    match parts.as_slice() {
        [start, end] if !start.is_empty() && !end.is_empty() => {
            let start = parse_timestamp(start)?;
            let end = parse_timestamp(end)?;
            TrimSpec::new(start, end)
        }
        _ if text.starts_with('-') || text.contains("--") => Err(TrimError::Negative),
        _ => Err(TrimError::Malformed(text.to_string())),
    }
}

fn parse_timestamp(text: &str) -> Result<Duration, TrimError> {
    let invalid = || TrimError::InvalidTime(text.to_string());

    let pieces: Vec<&str> = text.split(':').map(str::trim).collect();
    if pieces.len() > 3 {
        return Err(invalid());
    }

    let mut total: u64 = 0;
    for (index, piece) in pieces.iter().enumerate() {
        if piece.is_empty() || !piece.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let value: u64 = piece.parse().map_err(|_| invalid())?;

        // only the leading component may exceed its natural range
        if index > 0 && value >= 60 {
            return Err(invalid());
        }
        total = total
            .checked_mul(60)
            .and_then(|t| t.checked_add(value))
            .ok_or_else(invalid)?;
    }

    Ok(Duration::from_secs(total))
}
