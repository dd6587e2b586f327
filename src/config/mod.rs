use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::menu::MenuOptions;
use crate::messages::{Locale, Messages};
use crate::pipeline::PipelineConfig;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Telegram bot settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Application settings
    #[serde(default)]
    pub app: AppConfig,

    /// Extractor settings
    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot API token; `TELEGRAM_TOKEN` takes precedence
    pub bot_token: String,

    /// Channel users must belong to, `@name` or numeric id
    pub channel_id: String,

    /// Invite link shown next to the join prompt
    pub join_url: Option<String>,

    /// Long-poll timeout for getUpdates
    pub poll_timeout_secs: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Parent directory for per-job downloads (system temp dir if unset)
    pub download_dir: Option<PathBuf>,

    /// Smallest video height offered in the menu
    pub min_quality: u32,

    /// Container for delivered video
    pub delivery_container: String,

    /// Codec for audio-only downloads
    pub audio_codec: String,

    /// Seconds without input before a session is reset
    pub idle_timeout_secs: u64,

    /// How often idle sessions are swept
    pub sweep_interval_secs: u64,

    /// Upper bound for a single upload
    pub upload_timeout_secs: u64,

    /// Entries fetched by the playlist option
    pub playlist_limit: usize,

    /// Language of user facing messages
    pub locale: Locale,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// yt-dlp executable
    pub yt_dlp_path: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            channel_id: String::new(),
            join_url: None,
            poll_timeout_secs: 30,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            download_dir: None,
            min_quality: 360,
            delivery_container: "mp4".to_string(),
            audio_codec: "mp3".to_string(),
            idle_timeout_secs: 300,
            sweep_interval_secs: 30,
            upload_timeout_secs: 180,
            playlist_limit: 5,
            locale: Locale::default(),
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from `path` (or the default location), writing a
    /// default file if none exists yet
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if config_path.exists() {
            let content =
                fs_err::read_to_string(&config_path).context("Failed to read config file")?;

            let config: Config =
                serde_yaml::from_str(&content).context("Failed to parse config file")?;

            Ok(config)
        } else {
            let config = Self::default();
            config.save(&config_path).await?;
            tracing::info!("Wrote default configuration to {}", config_path.display());
            Ok(config)
        }
    }

    /// Save configuration to file
    pub async fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(config_path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("naqra-bot").join("config.yaml"))
    }

    /// Replace the file's token with one from the command line or environment
    pub fn with_token(mut self, token: Option<String>) -> Self {
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.telegram.bot_token = token;
        }
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            anyhow::bail!(
                "Telegram bot token must be configured (telegram.bot_token or TELEGRAM_TOKEN)"
            );
        }

        if self.telegram.channel_id.trim().is_empty() {
            anyhow::bail!("Membership channel must be configured (telegram.channel_id)");
        }

        if self.app.idle_timeout_secs == 0 {
            anyhow::bail!("app.idle_timeout_secs must be greater than zero");
        }

        if self.app.upload_timeout_secs == 0 {
            anyhow::bail!("app.upload_timeout_secs must be greater than zero");
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        let token = if self.telegram.bot_token.is_empty() {
            "(not set)"
        } else {
            "(set)"
        };
        println!("  Bot Token: {}", token);
        println!("  Channel: {}", self.telegram.channel_id);
        if let Some(url) = &self.telegram.join_url {
            println!("  Join URL: {}", url);
        }
        println!("  Download Dir: {}", self.pipeline_config().work_root.display());
        println!("  Minimum Quality: {}p", self.app.min_quality);
        println!("  Container: {}", self.app.delivery_container);
        println!("  Audio Codec: {}", self.app.audio_codec);
        println!("  Idle Timeout: {}s", self.app.idle_timeout_secs);
        println!("  Upload Timeout: {}s", self.app.upload_timeout_secs);
        println!("  Playlist Limit: {}", self.app.playlist_limit);
        println!("  yt-dlp: {}", self.backend.yt_dlp_path);
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        let defaults = PipelineConfig::default();
        PipelineConfig {
            work_root: self.app.download_dir.clone().unwrap_or(defaults.work_root),
            container: self.app.delivery_container.clone(),
            audio_codec: self.app.audio_codec.clone(),
            upload_timeout: Duration::from_secs(self.app.upload_timeout_secs),
        }
    }

    pub fn menu_options(&self) -> MenuOptions {
        MenuOptions {
            min_height: self.app.min_quality,
            container: self.app.delivery_container.clone(),
            playlist_limit: self.app.playlist_limit,
        }
    }

    pub fn messages(&self) -> Messages {
        Messages::new(self.app.locale)
    }

    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.app.idle_timeout_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        // sweeping less often than the window would let sessions overstay
        let upper = self.app.idle_timeout_secs.max(1);
        Duration::from_secs(self.app.sweep_interval_secs.clamp(1, upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn valid() -> Config {
        let mut config = Config::default();
        config.telegram.bot_token = "123:abc".into();
        config.telegram.channel_id = "@naqra".into();
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.app.min_quality, 360);
        assert_eq!(config.app.idle_timeout_secs, 300);
        assert_eq!(config.app.playlist_limit, 5);
        assert_eq!(config.backend.yt_dlp_path, "yt-dlp");
        assert_eq!(config.app.locale, Locale::Arabic);
    }

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let yaml = concat!(
            "telegram:\n",
            "  bot_token: \"1:x\"\n",
            "  channel_id: \"@chan\"\n",
            "app:\n",
            "  min_quality: 480\n",
            "  locale: en\n",
        );
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.app.min_quality, 480);
        assert_eq!(config.app.audio_codec, "mp3");
        assert_eq!(config.app.locale, Locale::English);
        assert_eq!(config.telegram.poll_timeout_secs, 30);
        assert_eq!(config.backend.yt_dlp_path, "yt-dlp");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_credentials() {
        assert_err!(Config::default().validate());
        assert_ok!(valid().validate());

        let mut config = valid();
        config.telegram.channel_id = " ".into();
        assert_err!(config.validate());

        let mut config = valid();
        config.app.idle_timeout_secs = 0;
        assert_err!(config.validate());

        let mut config = valid();
        config.app.upload_timeout_secs = 0;
        assert_err!(config.validate());
    }

    #[test]
    fn test_token_override() {
        let config = valid().with_token(Some("999:env".into()));
        assert_eq!(config.telegram.bot_token, "999:env");

        let config = valid().with_token(Some("".into()));
        assert_eq!(config.telegram.bot_token, "123:abc");

        let config = Config::default().with_token(None);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_derived_settings() {
        let mut config = valid();
        config.app.download_dir = Some(PathBuf::from("/srv/naqra"));
        config.app.min_quality = 480;
        config.app.sweep_interval_secs = 900;

        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.work_root, PathBuf::from("/srv/naqra"));
        assert_eq!(pipeline.upload_timeout, Duration::from_secs(180));
        assert_eq!(config.menu_options().min_height, 480);
        assert_eq!(config.sweep_interval(), Duration::from_secs(300));
    }

    #[tokio::test]
    async fn test_load_writes_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.yaml");

        let config = assert_ok!(Config::load(Some(&path)).await);
        assert!(path.exists());
        assert_eq!(config.app.min_quality, 360);

        let mut edited = valid();
        edited.app.playlist_limit = 3;
        edited.save(&path).await.unwrap();
        let reloaded = Config::load(Some(&path)).await.unwrap();
        assert_eq!(reloaded.app.playlist_limit, 3);
        assert_eq!(reloaded.telegram.channel_id, "@naqra");
    }
}
