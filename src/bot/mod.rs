//! Long-polling runner wiring Telegram, yt-dlp and the session machine together

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;

pub mod dispatcher;

use crate::backend::{MediaBackend, YtDlpBackend};
use crate::config::Config;
use crate::gateway::{MessagingGateway, TelegramGateway};
use crate::membership::MembershipGate;
use crate::pipeline::{AcquisitionPipeline, JobWorkspace};
use crate::session::{IdleSupervisor, SessionMachine, SessionStore, SystemClock};

pub use dispatcher::{Dispatcher, EventHandler};

/// Wait before polling again after getUpdates failed
const POLL_RETRY_DELAY: Duration = Duration::from_secs(5);

/// A per-user worker is dropped after this long without events
const WORKER_IDLE: Duration = Duration::from_secs(600);

pub struct Bot {
    telegram: Arc<TelegramGateway>,
    machine: Arc<SessionMachine>,
    config: Config,
}

impl Bot {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let telegram = Arc::new(TelegramGateway::new(&config.telegram.bot_token));
        let gateway: Arc<dyn MessagingGateway> = telegram.clone();
        let backend: Arc<dyn MediaBackend> =
            Arc::new(YtDlpBackend::new(config.backend.yt_dlp_path.clone()));
        let messages = config.messages();

        let store = Arc::new(SessionStore::new(Arc::new(SystemClock)));
        let gate = MembershipGate::new(telegram.clone(), config.telegram.channel_id.clone());
        let pipeline = Arc::new(AcquisitionPipeline::new(
            backend.clone(),
            gateway.clone(),
            config.pipeline_config(),
            messages,
        ));

        let machine = SessionMachine::new(
            store,
            gate,
            backend,
            gateway,
            pipeline,
            config.menu_options(),
            messages,
        )
        .with_join_url(config.telegram.join_url.clone());

        Ok(Self {
            telegram,
            machine: Arc::new(machine),
            config,
        })
    }

    /// Poll until Ctrl-C
    pub async fn run(self) -> Result<()> {
        let work_root = self.config.pipeline_config().work_root;
        let purged = JobWorkspace::purge_stale(&work_root);
        if purged > 0 {
            tracing::info!("Removed {} job directories left by a previous run", purged);
        }

        let supervisor = IdleSupervisor::new(
            self.machine.store().clone(),
            self.config.idle_timeout(),
            self.config.sweep_interval(),
        )
        .spawn();

        let dispatcher = Dispatcher::new(self.machine.clone(), WORKER_IDLE);
        let poll_timeout = self.config.telegram.poll_timeout_secs;

        tracing::info!(
            channel = %self.config.telegram.channel_id,
            idle_timeout_secs = self.config.app.idle_timeout_secs,
            "Starting Telegram bot"
        );

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        let mut offset: Option<i64> = None;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown requested");
                    break;
                }
                result = self.telegram.get_updates(offset, poll_timeout) => match result {
                    Ok(updates) => {
                        for update in updates {
                            offset = Some(update.update_id + 1);
                            match update.into_event() {
                                Some(event) => dispatcher.dispatch(event),
                                None => tracing::trace!("Ignoring unsupported update"),
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Telegram getUpdates failed");
                        tokio::time::sleep(POLL_RETRY_DELAY).await;
                    }
                }
            }
        }

        supervisor.abort();
        tracing::info!("Telegram bot polling stopped");
        Ok(())
    }
}
