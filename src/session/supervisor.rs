use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::store::SessionStore;

// longer windows would overflow `now - window`; ten years is "never"
const MAX_WINDOW_SECS: u64 = 10 * 365 * 24 * 3600;

/// Background sweep resetting sessions that saw no activity for `window`.
///
/// Pipelines already running are not touched, they own copies of what they need.
pub struct IdleSupervisor {
    store: Arc<SessionStore>,
    window: chrono::Duration,
    interval: Duration,
}

impl IdleSupervisor {
    pub fn new(store: Arc<SessionStore>, window: Duration, interval: Duration) -> Self {
        Self {
            store,
            window: chrono::Duration::seconds(window.as_secs().min(MAX_WINDOW_SECS) as i64),
            interval,
        }
    }

    /// Run a single sweep, returning how many sessions were reset
    pub async fn sweep(&self) -> usize {
        let expired = self.store.expire_idle(self.window).await;
        for user_id in &expired {
            tracing::info!(
                user_id,
                "Session expired after {}s of inactivity",
                self.window.num_seconds()
            );
        }
        expired.len()
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.sweep().await;
            }
        })
    }
}
