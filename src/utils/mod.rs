use anyhow::Result;
use url::Url;

/// Placeholder shown when a duration or size is not known
pub const UNKNOWN: &str = "unknown";

const SIZE_UNITS: &[&str] = &["", "K", "M", "G", "T"];
const SIZE_STEP: f64 = 1024.0;

/// Validate a URL and return normalized version
pub fn validate_and_normalize_url(url: &str) -> Result<String> {
    let parsed = Url::parse(url.trim())
        .map_err(|_| anyhow::anyhow!("Invalid URL format: {}", url))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!("URL must use HTTP or HTTPS protocol");
    }

    if parsed.host_str().is_none() {
        anyhow::bail!("URL has no host: {}", url);
    }

    Ok(parsed.to_string())
}

/// Format a duration given as plain seconds (`"125"`, `"12.5"`) or an
/// ISO 8601 duration (`"PT2M5S"`).
///
/// Absent or empty input yields [`UNKNOWN`]. Anything that parses as neither
/// form is returned unchanged.
pub fn format_duration(raw: Option<&str>) -> String {
    let text = match raw.map(str::trim) {
        Some(text) if !text.is_empty() => text,
        _ => return UNKNOWN.to_string(),
    };

    match parse_seconds(text).or_else(|| parse_iso8601_duration(text)) {
        Some(total) => format_clock(total),
        None => text.to_string(),
    }
}

/// Render whole seconds as `HH:MM:SS`, or `MM:SS` under an hour
pub fn format_clock(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}", minutes, seconds)
    }
}

/// Format a byte count in binary units, capped at terabytes
pub fn format_bytes(size: Option<u64>) -> String {
    let Some(size) = size else {
        return UNKNOWN.to_string();
    };

    let mut value = size as f64;
    let mut unit = 0;
    while value >= SIZE_STEP && unit < SIZE_UNITS.len() - 1 {
        value /= SIZE_STEP;
        unit += 1;
    }

    format!("{:.1} {}B", value, SIZE_UNITS[unit])
}

fn parse_seconds(text: &str) -> Option<u64> {
    let value: f64 = text.parse().ok()?;
    if value.is_finite() && value >= 0.0 {
        Some(value as u64)
    } else {
        None
    }
}

/// Parse `PnW`, `PnDTnHnMnS` style durations (years and months are rejected,
/// their length is calendar dependent)
fn parse_iso8601_duration(text: &str) -> Option<u64> {
    let body = text.strip_prefix('P').or_else(|| text.strip_prefix('p'))?;
    if body.is_empty() {
        return None;
    }

    let mut total = 0.0_f64;
    let mut in_time = false;
    let mut number = String::new();
    let mut saw_component = false;

    for c in body.chars() {
        match c {
            'T' | 't' => {
                if in_time || !number.is_empty() {
                    return None;
                }
                in_time = true;
            }
            '0'..='9' | '.' | ',' => number.push(if c == ',' { '.' } else { c }),
            unit => {
                let value: f64 = number.parse().ok()?;
                number.clear();
                let factor = match (in_time, unit.to_ascii_uppercase()) {
                    (false, 'W') => 604_800.0,
                    (false, 'D') => 86_400.0,
                    (true, 'H') => 3_600.0,
                    (true, 'M') => 60.0,
                    (true, 'S') => 1.0,
                    _ => return None,
                };
                total += value * factor;
                saw_component = true;
            }
        }
    }

    if !number.is_empty() || !saw_component {
        return None;
    }

    Some(total as u64)
}

/// Extract domain from URL for display purposes
pub fn extract_domain(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(|host| host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Check if the current environment has required tools
pub async fn check_dependencies(yt_dlp_path: &str) -> Vec<String> {
    let mut missing = Vec::new();

    if !check_command_available(yt_dlp_path).await {
        missing.push(format!("{} - required for resolving and downloading links", yt_dlp_path));
    }

    // ffmpeg merges video+audio, extracts mp3 and cuts trimmed sections
    if !check_command_available("ffmpeg").await {
        missing.push("ffmpeg - required for audio extraction and trimming".to_string());
    }

    missing
}

/// Check if a command is available in PATH
async fn check_command_available(command: &str) -> bool {
    use tokio::process::Command;

    Command::new(command)
        .arg("--version")
        .output()
        .await
        .map(|output| output.status.success())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(None), "unknown");
        assert_eq!(format_bytes(Some(0)), "0.0 B");
        assert_eq!(format_bytes(Some(512)), "512.0 B");
        assert_eq!(format_bytes(Some(1024)), "1.0 KB");
        assert_eq!(format_bytes(Some(1536)), "1.5 KB");
        assert_eq!(format_bytes(Some(1048576)), "1.0 MB");
        assert_eq!(format_bytes(Some(5 * 1024 * 1024 * 1024)), "5.0 GB");
    }

    #[test]
    fn test_format_bytes_stops_at_terabytes() {
        // 2^64 bytes is 2^24 TB
        assert_eq!(format_bytes(Some(u64::MAX)), "16777216.0 TB");
    }

    #[test]
    fn test_format_bytes_units_never_go_backwards() {
        let rank = |s: &str| {
            let unit = s.split(' ').nth(1).unwrap();
            SIZE_UNITS.iter().position(|u| format!("{}B", u) == unit).unwrap()
        };

        let mut last_rank = 0;
        let mut size = 1u64;
        while size < u64::MAX / 4 {
            let current = rank(&format_bytes(Some(size)));
            assert!(current >= last_rank, "unit went down at {}", size);
            last_rank = current;
            size = size * 3 + 7;
        }
    }

    #[test]
    fn test_format_duration_absent() {
        assert_eq!(format_duration(None), "unknown");
        assert_eq!(format_duration(Some("")), "unknown");
        assert_eq!(format_duration(Some("   ")), "unknown");
    }

    #[test]
    fn test_format_duration_seconds() {
        assert_eq!(format_duration(Some("45")), "00:45");
        assert_eq!(format_duration(Some("125")), "02:05");
        assert_eq!(format_duration(Some("12.7")), "00:12");
        assert_eq!(format_duration(Some("3725")), "01:02:05");
    }

    #[test]
    fn test_format_duration_iso8601() {
        assert_eq!(format_duration(Some("PT45S")), "00:45");
        assert_eq!(format_duration(Some("PT1H2M5S")), "01:02:05");
        assert_eq!(format_duration(Some("PT2M")), "02:00");
        assert_eq!(format_duration(Some("P1D")), "24:00:00");
        assert_eq!(format_duration(Some("P1DT1S")), "24:00:01");
    }

    #[test]
    fn test_format_duration_falls_back_to_raw_text() {
        assert_eq!(format_duration(Some("2:05")), "2:05");
        assert_eq!(format_duration(Some("soon")), "soon");
        assert_eq!(format_duration(Some("P")), "P");
        assert_eq!(format_duration(Some("PT5X")), "PT5X");
        assert_eq!(format_duration(Some("P1Y")), "P1Y");
        assert_eq!(format_duration(Some("-5")), "-5");
    }

    #[test]
    fn test_extract_domain() {
        assert_eq!(
            extract_domain("https://www.youtube.com/watch?v=123"),
            Some("youtube.com".to_string())
        );
        assert_eq!(extract_domain("https://x.com/user/status/123"), Some("x.com".to_string()));
        assert_eq!(extract_domain("invalid-url"), None);
    }

    #[test]
    fn test_validate_and_normalize_url() {
        assert!(validate_and_normalize_url("https://example.com").is_ok());
        assert!(validate_and_normalize_url("http://example.com").is_ok());
        assert!(validate_and_normalize_url("ftp://example.com").is_err());
        assert!(validate_and_normalize_url("not-a-url").is_err());
    }
}
