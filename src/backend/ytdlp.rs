use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

use super::{AcquireRequest, Acquired, FormatSelector, MediaBackend, MediaInfo, Rendition};
use crate::Result;

/// Media backend that shells out to yt-dlp (and ffmpeg through it)
pub struct YtDlpBackend {
    yt_dlp_path: String,
}

/// The subset of `yt-dlp --dump-single-json` output we read
#[derive(Debug, Deserialize)]
struct RawInfo {
    title: Option<String>,
    duration: Option<f64>,
    thumbnail: Option<String>,
    webpage_url: Option<String>,
    original_url: Option<String>,
    #[serde(default)]
    formats: Vec<RawFormat>,
    entries: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    vcodec: Option<String>,
    acodec: Option<String>,
    ext: Option<String>,
    height: Option<u32>,
    filesize: Option<u64>,
    filesize_approx: Option<f64>,
}

impl From<RawFormat> for Rendition {
    fn from(raw: RawFormat) -> Self {
        Rendition {
            // a missing codec field means "unknown", only an explicit "none" rules the stream out
            has_video: raw.vcodec.as_deref() != Some("none"),
            has_audio: raw.acodec.as_deref() != Some("none"),
            ext: raw.ext.unwrap_or_default(),
            height: raw.height,
            size: raw.filesize.or(raw.filesize_approx.map(|s| s as u64)),
        }
    }
}

impl YtDlpBackend {
    pub fn new(yt_dlp_path: impl Into<String>) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
        }
    }

    /// Installed yt-dlp version, if the binary runs at all
    pub async fn version(&self) -> Option<String> {
        let output = Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .ok()?;

        if !output.status.success() {
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn run(&self, args: &[String]) -> Result<String> {
        tracing::debug!("Running {} {}", self.yt_dlp_path, args.join(" "));

        let output = Command::new(&self.yt_dlp_path)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("yt-dlp failed: {}", last_error_line(&error));
        }

        Ok(String::from_utf8(output.stdout)?)
    }
}

impl Default for YtDlpBackend {
    fn default() -> Self {
        Self::new("yt-dlp")
    }
}

#[async_trait]
impl MediaBackend for YtDlpBackend {
    async fn resolve_metadata(&self, url: &str) -> Result<MediaInfo> {
        tracing::debug!("Extracting media info for: {}", url);

        let args: Vec<String> = [
            "--dump-single-json",
            "--no-playlist",
            "--flat-playlist",
            "--no-warnings",
            url,
        ]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let json = self.run(&args).await?;
        parse_metadata(&json, url)
    }

    async fn acquire(&self, request: &AcquireRequest) -> Result<Acquired> {
        let args = acquire_args(request);
        let stdout = self.run(&args).await?;

        let reported_files: Vec<PathBuf> = stdout
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(PathBuf::from)
            .collect();

        if reported_files.is_empty() {
            anyhow::bail!("yt-dlp finished without reporting an output file");
        }

        Ok(Acquired { reported_files })
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Turn yt-dlp JSON into a `MediaInfo`
pub(crate) fn parse_metadata(json: &str, requested_url: &str) -> Result<MediaInfo> {
    let raw: RawInfo = serde_json::from_str(json)?;

    let source_url = raw
        .webpage_url
        .or(raw.original_url)
        .unwrap_or_else(|| requested_url.to_string());

    Ok(MediaInfo {
        title: raw.title,
        duration: raw.duration,
        thumbnail: raw.thumbnail,
        source_url,
        renditions: raw.formats.into_iter().map(Rendition::from).collect(),
        entry_count: raw.entries.map(|entries| entries.len()),
    })
}

/// Command line for one download
pub(crate) fn acquire_args(request: &AcquireRequest) -> Vec<String> {
    let template = request.output_dir.join("%(id)s.%(ext)s");

    let mut args: Vec<String> = vec![
        "--no-warnings".into(),
        "--no-progress".into(),
        "--no-simulate".into(),
        "--print".into(),
        "filename".into(),
        "--output".into(),
        template.to_string_lossy().into_owned(),
    ];

    match &request.selector {
        FormatSelector::VideoUpTo { height, container } => {
            args.push("--format".into());
            args.push(format!(
                "bestvideo[height<={h}][ext={c}]+bestaudio[ext=m4a]/best[height<={h}][ext={c}]/best[height<={h}]",
                h = height,
                c = container
            ));
            args.push("--merge-output-format".into());
            args.push(container.clone());
        }
        FormatSelector::AudioOnly { codec } => {
            args.push("--format".into());
            args.push("bestaudio/best".into());
            args.push("--extract-audio".into());
            args.push("--audio-format".into());
            args.push(codec.clone());
        }
        FormatSelector::BestVideo { container } => {
            args.push("--format".into());
            args.push(format!("best[ext={}]/best", container));
        }
    }

    if let Some(trim) = &request.trim {
        args.push("--download-sections".into());
        args.push(trim.as_download_section());
        args.push("--force-keyframes-at-cuts".into());
    }

    match request.playlist_limit {
        Some(limit) => {
            args.push("--yes-playlist".into());
            args.push("--playlist-items".into());
            args.push(format!("1:{}", limit));
        }
        None => args.push("--no-playlist".into()),
    }

    args.push(request.url.clone());
    args
}

fn last_error_line(stderr: &str) -> String {
    stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("unknown error")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trim::parse_trim;

    const SAMPLE: &str = r#"{
        "id": "abc",
        "title": "Sample clip",
        "duration": 125.0,
        "thumbnail": "https://example.com/t.jpg",
        "webpage_url": "https://example.com/v/1",
        "formats": [
            {"vcodec": "none", "acodec": "mp4a.40.2", "ext": "m4a", "filesize": 1000},
            {"vcodec": "avc1", "acodec": "mp4a.40.2", "ext": "mp4", "height": 720, "filesize_approx": 2048.6},
            {"vcodec": "avc1", "acodec": "none", "ext": "mp4", "height": 1080}
        ]
    }"#;

    fn request(selector: FormatSelector) -> AcquireRequest {
        AcquireRequest {
            url: "https://example.com/v/1".into(),
            selector,
            trim: None,
            playlist_limit: None,
            output_dir: PathBuf::from("/tmp/job"),
        }
    }

    #[test]
    fn test_parse_metadata() {
        let info = parse_metadata(SAMPLE, "https://short/1").unwrap();
        assert_eq!(info.title.as_deref(), Some("Sample clip"));
        assert_eq!(info.source_url, "https://example.com/v/1");
        assert_eq!(info.renditions.len(), 3);
        assert!(!info.renditions[0].has_video);
        assert!(info.renditions[1].has_video && info.renditions[1].has_audio);
        assert_eq!(info.renditions[1].size, Some(2048));
        assert!(!info.renditions[2].has_audio);
        assert_eq!(info.entry_count, None);
        assert!(!info.is_empty());
    }

    #[test]
    fn test_parse_playlist_falls_back_to_requested_url() {
        let json = r#"{"title": "List", "entries": [{"id": "a"}, {"id": "b"}]}"#;
        let info = parse_metadata(json, "https://example.com/list").unwrap();
        assert_eq!(info.source_url, "https://example.com/list");
        assert_eq!(info.entry_count, Some(2));
        assert!(info.is_playlist());
        assert!(!info.is_empty());
    }

    #[test]
    fn test_parse_rejects_non_json() {
        assert!(parse_metadata("ERROR: private video", "https://x").is_err());
    }

    #[test]
    fn test_video_args_cap_height() {
        let args = acquire_args(&request(FormatSelector::VideoUpTo {
            height: 480,
            container: "mp4".into(),
        }));
        let format = &args[args.iter().position(|a| a == "--format").unwrap() + 1];
        assert!(format.starts_with("bestvideo[height<=480][ext=mp4]"));
        assert!(args.contains(&"--no-playlist".to_string()));
        assert_eq!(args.last().unwrap(), "https://example.com/v/1");
    }

    #[test]
    fn test_audio_args_with_trim_and_playlist() {
        let mut req = request(FormatSelector::AudioOnly { codec: "mp3".into() });
        req.trim = Some(parse_trim("0:30-1:45").unwrap());
        req.playlist_limit = Some(5);

        let args = acquire_args(&req);
        assert!(args.contains(&"--extract-audio".to_string()));
        assert!(args.contains(&"*30-105".to_string()));
        assert!(args.contains(&"1:5".to_string()));
        assert!(!args.contains(&"--no-playlist".to_string()));
    }

    #[test]
    fn test_audio_from_playlist_is_bounded() {
        let mut req = request(FormatSelector::AudioOnly { codec: "mp3".into() });
        req.url = "https://www.youtube.com/playlist?list=PL123".into();
        req.playlist_limit = Some(1);

        let args = acquire_args(&req);
        let items = &args[args.iter().position(|a| a == "--playlist-items").unwrap() + 1];
        assert_eq!(items, "1:1");
        assert!(!args.contains(&"--no-playlist".to_string()));
    }

    #[test]
    fn test_last_error_line() {
        assert_eq!(last_error_line("WARNING: x\nERROR: Private video\n\n"), "ERROR: Private video");
        assert_eq!(last_error_line(""), "unknown error");
    }
}
