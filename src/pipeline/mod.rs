use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub mod artifact;

use crate::backend::{AcquireRequest, FormatSelector, MediaBackend, MediaInfo};
use crate::gateway::{ChatId, MessagingGateway, UserId};
use crate::menu::Choice;
use crate::messages::Messages;
use crate::trim::TrimSpec;
use crate::BotError;

pub use artifact::{locate_artifact, ArtifactFile, JobWorkspace};

/// Everything a download needs, detached from the session that asked for it
#[derive(Debug, Clone)]
pub struct Job {
    pub user_id: UserId,
    pub chat_id: ChatId,
    pub media: MediaInfo,
    pub choice: Choice,
    pub trim: Option<TrimSpec>,
}

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Parent of the per-job directories
    pub work_root: PathBuf,
    /// Container for delivered video
    pub container: String,
    /// Codec for audio-only downloads
    pub audio_codec: String,
    /// Upper bound for a single upload
    pub upload_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            work_root: std::env::temp_dir().join("naqra-bot"),
            container: "mp4".to_string(),
            audio_codec: "mp3".to_string(),
            upload_timeout: Duration::from_secs(180),
        }
    }
}

/// How a pipeline run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Delivered { files: usize },
    Failed { category: &'static str },
}

/// Download, deliver, clean up
pub struct AcquisitionPipeline {
    backend: Arc<dyn MediaBackend>,
    gateway: Arc<dyn MessagingGateway>,
    config: PipelineConfig,
    messages: Messages,
}

impl AcquisitionPipeline {
    pub fn new(
        backend: Arc<dyn MediaBackend>,
        gateway: Arc<dyn MessagingGateway>,
        config: PipelineConfig,
        messages: Messages,
    ) -> Self {
        Self {
            backend,
            gateway,
            config,
            messages,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Map a menu choice to the backend request
    pub fn build_request(&self, job: &Job, output_dir: PathBuf) -> AcquireRequest {
        let container = self.config.container.clone();
        // a playlist-only URL ignores --no-playlist, so single picks take the first entry
        let single = job.media.is_playlist().then_some(1);
        let (selector, playlist_limit) = match job.choice {
            Choice::Quality { height } => (FormatSelector::VideoUpTo { height, container }, single),
            Choice::Audio => (
                FormatSelector::AudioOnly {
                    codec: self.config.audio_codec.clone(),
                },
                single,
            ),
            Choice::Trim => (FormatSelector::BestVideo { container }, single),
            Choice::Playlist { limit } => (FormatSelector::BestVideo { container }, Some(limit)),
        };

        AcquireRequest {
            url: job.media.source_url.clone(),
            selector,
            trim: job.trim,
            playlist_limit,
            output_dir,
        }
    }

    /// Run one job to completion. Never fails: errors are reported to the
    /// chat and the job directory is removed on every path.
    pub async fn run(&self, job: Job) -> PipelineOutcome {
        let job_id = Uuid::new_v4();
        tracing::info!(
            %job_id,
            user_id = job.user_id,
            choice = %job.choice,
            trim = ?job.trim.map(|t| t.to_string()),
            "Starting pipeline"
        );

        let result = match JobWorkspace::create(&self.config.work_root) {
            Ok(workspace) => {
                let result = self.execute(&job, &workspace).await;
                workspace.release();
                result
            }
            Err(e) => Err(BotError::Acquisition(format!("{:#}", e))),
        };

        match result {
            Ok(files) => {
                tracing::info!(%job_id, files, "Pipeline finished");
                PipelineOutcome::Delivered { files }
            }
            Err(e) => {
                tracing::error!(%job_id, error = %e, "Pipeline failed");
                let text = self.messages.pipeline_failed(e.category());
                if let Err(send_err) = self.gateway.send_text(job.chat_id, &text, None).await {
                    tracing::warn!(%job_id, error = %send_err, "Could not report pipeline failure");
                }
                PipelineOutcome::Failed { category: e.category() }
            }
        }
    }

    async fn execute(&self, job: &Job, workspace: &JobWorkspace) -> Result<usize, BotError> {
        let request = self.build_request(job, workspace.path().to_path_buf());

        self.notify(job.chat_id, &self.messages.download_started()).await;
        let acquired = self
            .backend
            .acquire(&request)
            .await
            .map_err(|e| BotError::Acquisition(format!("{:#}", e)))?;

        let artifacts: Vec<ArtifactFile> = acquired
            .reported_files
            .iter()
            .filter_map(|reported| {
                let found = locate_artifact(reported, &request.selector, workspace.path());
                if found.is_none() {
                    tracing::warn!(
                        "Backend reported {} but no such file exists",
                        reported.display()
                    );
                }
                found
            })
            .collect();

        if artifacts.is_empty() {
            return Err(BotError::Acquisition("no output file found".to_string()));
        }

        self.notify(job.chat_id, &self.messages.upload_started()).await;
        for artifact in &artifacts {
            self.gateway
                .send_media(job.chat_id, artifact.kind, &artifact.path, self.config.upload_timeout)
                .await
                .map_err(|e| BotError::Delivery(format!("{:#}", e)))?;
        }

        Ok(artifacts.len())
    }

    async fn notify(&self, chat_id: ChatId, text: &str) {
        if let Err(e) = self.gateway.send_text(chat_id, text, None).await {
            tracing::warn!(chat_id, error = %e, "Failed to send status message");
        }
    }
}
