use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::SendError, UnboundedReceiver, UnboundedSender};

use crate::gateway::{InboundEvent, UserId};
use crate::session::SessionMachine;

/// Consumer of inbound events
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn on_event(&self, event: InboundEvent);
}

#[async_trait]
impl EventHandler for SessionMachine {
    async fn on_event(&self, event: InboundEvent) {
        let chat_id = event.chat_id;
        // a started download keeps running on its own task
        if let Some(job) = self.handle(event).await.job {
            self.watch_pipeline(chat_id, job);
        }
    }
}

type Queues = Arc<Mutex<HashMap<UserId, UnboundedSender<InboundEvent>>>>;

/// Feeds events to the handler one at a time per user while different users
/// are handled concurrently.
///
/// Each active user gets a queue drained by a single worker task; the worker
/// goes away after `idle` without events.
pub struct Dispatcher<H: EventHandler> {
    handler: Arc<H>,
    queues: Queues,
    idle: Duration,
}

impl<H: EventHandler> Dispatcher<H> {
    pub fn new(handler: Arc<H>, idle: Duration) -> Self {
        Self {
            handler,
            queues: Arc::new(Mutex::new(HashMap::new())),
            idle,
        }
    }

    pub fn dispatch(&self, event: InboundEvent) {
        let user_id = event.user_id;
        let mut queues = lock(&self.queues);

        let event = match queues.get(&user_id) {
            Some(tx) => match tx.send(event) {
                Ok(()) => return,
                // worker died mid-event
                Err(SendError(event)) => {
                    tracing::warn!(user_id, "Event worker gone, restarting it");
                    event
                }
            },
            None => event,
        };

        let (tx, rx) = mpsc::unbounded_channel();
        // the receiver is alive until the worker below exits
        let _ = tx.send(event);
        queues.insert(user_id, tx);
        drop(queues);

        tokio::spawn(worker(user_id, rx, self.handler.clone(), self.queues.clone(), self.idle));
    }

    /// Users with a live worker
    pub fn active_users(&self) -> usize {
        lock(&self.queues).len()
    }
}

async fn worker<H: EventHandler>(
    user_id: UserId,
    mut rx: UnboundedReceiver<InboundEvent>,
    handler: Arc<H>,
    queues: Queues,
    idle: Duration,
) {
    tracing::debug!(user_id, "Event worker started");
    loop {
        let event = match tokio::time::timeout(idle, rx.recv()).await {
            Ok(Some(event)) => Some(event),
            Ok(None) => None,
            Err(_) => {
                // deregister under the lock so no event lands in a dead queue
                let mut queues = lock(&queues);
                let next = rx.try_recv().ok();
                if next.is_none() {
                    queues.remove(&user_id);
                }
                next
            }
        };

        match event {
            Some(event) => handler.on_event(event).await,
            None => break,
        }
    }
    tracing::debug!(user_id, "Event worker stopped");
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::EventKind;
    use tokio::time::Instant;

    #[derive(Default)]
    struct Recorder {
        seen: Mutex<Vec<(UserId, String, Instant)>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn on_event(&self, event: InboundEvent) {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let EventKind::Text(text) = event.kind else { return };
            self.seen.lock().unwrap().push((event.user_id, text, Instant::now()));
        }
    }

    impl Recorder {
        fn texts_of(&self, user_id: UserId) -> Vec<String> {
            self.seen
                .lock()
                .unwrap()
                .iter()
                .filter(|(u, _, _)| *u == user_id)
                .map(|(_, t, _)| t.clone())
                .collect()
        }
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(300)).await;
    }

    #[tokio::test]
    async fn test_events_of_one_user_keep_order() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(recorder.clone(), Duration::from_secs(60));

        for n in 0..5 {
            dispatcher.dispatch(InboundEvent::text(1, 1, &n.to_string()));
        }
        settle().await;

        assert_eq!(recorder.texts_of(1), vec!["0", "1", "2", "3", "4"]);
        assert_eq!(dispatcher.active_users(), 1);
    }

    #[tokio::test]
    async fn test_users_run_concurrently() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(recorder.clone(), Duration::from_secs(60));

        let started = Instant::now();
        for user in 0..8 {
            dispatcher.dispatch(InboundEvent::text(user, user, "hi"));
        }
        settle().await;

        let seen = recorder.seen.lock().unwrap();
        assert_eq!(seen.len(), 8);
        // serial handling would need 8 * 20ms
        let last = seen.iter().map(|(_, _, at)| *at).max().unwrap();
        assert!(last.duration_since(started) < Duration::from_millis(150));
    }

    #[tokio::test]
    async fn test_idle_worker_exits_and_restarts() {
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::new(recorder.clone(), Duration::from_millis(50));

        dispatcher.dispatch(InboundEvent::text(3, 3, "first"));
        settle().await;
        assert_eq!(dispatcher.active_users(), 0);

        dispatcher.dispatch(InboundEvent::text(3, 3, "second"));
        settle().await;
        assert_eq!(recorder.texts_of(3), vec!["first", "second"]);
    }
}
