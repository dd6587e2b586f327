use std::sync::Arc;
use tokio::task::JoinHandle;

use super::state::{Session, SessionState};
use super::store::SessionStore;
use crate::backend::{MediaBackend, MediaInfo};
use crate::gateway::{
    Button, ChatId, EventKind, InboundEvent, Keyboard, MessageId, MessagingGateway, UserId,
};
use crate::membership::MembershipGate;
use crate::menu::{derive_menu, offers, Choice, MenuEntry, MenuOptions};
use crate::messages::Messages;
use crate::pipeline::{AcquisitionPipeline, Job, PipelineOutcome};
use crate::trim::parse_trim;
use crate::utils::{extract_domain, validate_and_normalize_url};
use crate::BotError;

const START_COMMAND: &str = "start";
const CANCEL_COMMAND: &str = "cancel";
const INTERNAL_FAILURE: &str = "internal";

/// Handler picked for an event in a given state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route {
    Begin,
    BeginWithLink,
    ResolveLink,
    SelectFormat,
    TrimTimes,
    Cancel,
}

/// Which handler, if any, is registered for `kind` while in `state`
fn route_for(state: SessionState, kind: &EventKind) -> Option<Route> {
    use SessionState::*;

    match (state, kind) {
        (Idle, EventKind::Command { name, .. }) if name == START_COMMAND => Some(Route::Begin),
        (Idle, EventKind::Command { .. }) => None,
        (Idle, EventKind::Text(_)) => Some(Route::BeginWithLink),
        (Idle, EventKind::Callback { .. }) => None,

        (SelectingFormat | AwaitingTrimTimes, EventKind::Command { name, .. })
            if name == CANCEL_COMMAND =>
        {
            Some(Route::Cancel)
        }
        (SelectingFormat | AwaitingTrimTimes, EventKind::Command { .. }) => None,

        (SelectingFormat, EventKind::Text(_)) => Some(Route::ResolveLink),
        (SelectingFormat, EventKind::Callback { .. }) => Some(Route::SelectFormat),

        (AwaitingTrimTimes, EventKind::Text(_)) => Some(Route::TrimTimes),
        (AwaitingTrimTimes, EventKind::Callback { .. }) => None,
    }
}

/// Result of handling one event
#[derive(Debug)]
pub struct Handled {
    /// State of the user after the event
    pub state: SessionState,
    /// Download started by this event, if any
    pub job: Option<JoinHandle<PipelineOutcome>>,
}

impl Handled {
    fn stay(state: SessionState) -> Self {
        Self { state, job: None }
    }
}

/// Per-user conversation driver.
///
/// Callers must not feed two events of the same user concurrently; the bot
/// dispatcher queues them per user.
pub struct SessionMachine {
    store: Arc<SessionStore>,
    gate: MembershipGate,
    backend: Arc<dyn MediaBackend>,
    gateway: Arc<dyn MessagingGateway>,
    pipeline: Arc<AcquisitionPipeline>,
    menu_options: MenuOptions,
    messages: Messages,
    join_url: Option<String>,
}

impl SessionMachine {
    pub fn new(
        store: Arc<SessionStore>,
        gate: MembershipGate,
        backend: Arc<dyn MediaBackend>,
        gateway: Arc<dyn MessagingGateway>,
        pipeline: Arc<AcquisitionPipeline>,
        menu_options: MenuOptions,
        messages: Messages,
    ) -> Self {
        Self {
            store,
            gate,
            backend,
            gateway,
            pipeline,
            menu_options,
            messages,
            join_url: None,
        }
    }

    /// Link appended to the join prompt
    pub fn with_join_url(mut self, join_url: Option<String>) -> Self {
        self.join_url = join_url;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub async fn handle(&self, event: InboundEvent) -> Handled {
        let session = self.store.get(event.user_id).await;
        let state = session.as_ref().map_or(SessionState::Idle, |s| s.state);

        let Some(route) = route_for(state, &event.kind) else {
            tracing::debug!(user_id = event.user_id, %state, "No handler for event, ignoring");
            return Handled::stay(state);
        };
        tracing::debug!(user_id = event.user_id, %state, ?route, "Dispatching event");

        let handled = match (route, session, event.kind) {
            (Route::Begin, _, _) => self.begin(event.user_id, event.chat_id).await,
            (Route::BeginWithLink, _, EventKind::Text(text)) => {
                self.begin_with_link(event.user_id, event.chat_id, &text).await
            }
            (Route::ResolveLink, Some(session), EventKind::Text(text)) => {
                self.resolve_link(session, &text).await
            }
            (
                Route::SelectFormat,
                Some(session),
                EventKind::Callback {
                    query_id,
                    data,
                    message_id,
                },
            ) => self.select_format(session, &query_id, &data, message_id).await,
            (Route::TrimTimes, Some(session), EventKind::Text(text)) => {
                self.trim_times(session, &text).await
            }
            (Route::Cancel, _, _) => self.cancel(event.user_id, event.chat_id).await,
            // the routing table and the session lookup agree, see `route_for`
            (route, _, _) => {
                tracing::warn!(
                    user_id = event.user_id,
                    ?route,
                    "Route without matching session, ignoring"
                );
                Handled::stay(state)
            }
        };

        if handled.state != state {
            tracing::info!(
                user_id = event.user_id,
                from = %state,
                to = %handled.state,
                "Session transition"
            );
        }
        handled
    }

    async fn begin(&self, user_id: UserId, chat_id: ChatId) -> Handled {
        if !self.admit(user_id, chat_id).await {
            return Handled::stay(SessionState::Idle);
        }

        self.notify(chat_id, &self.messages.welcome()).await;
        self.store.save(Session::new(user_id, chat_id, self.store.now())).await;
        Handled::stay(SessionState::SelectingFormat)
    }

    async fn begin_with_link(&self, user_id: UserId, chat_id: ChatId, text: &str) -> Handled {
        if !self.admit(user_id, chat_id).await {
            return Handled::stay(SessionState::Idle);
        }

        let session = Session::new(user_id, chat_id, self.store.now());
        self.resolve_link(session, text).await
    }

    /// Membership check, sending the join prompt on refusal
    async fn admit(&self, user_id: UserId, chat_id: ChatId) -> bool {
        if self.gate.is_member(user_id).await {
            return true;
        }

        let prompt = self.messages.join_prompt(self.gate.channel_id(), self.join_url.as_deref());
        self.notify(chat_id, &prompt).await;
        false
    }

    async fn resolve_link(&self, mut session: Session, text: &str) -> Handled {
        let chat_id = session.chat_id;

        let url = match validate_and_normalize_url(text) {
            Ok(url) => url,
            Err(e) => {
                tracing::info!(user_id = session.user_id, error = %e, "Not a link");
                self.notify(chat_id, &self.messages.not_a_link()).await;
                return self.reset(session.user_id).await;
            }
        };

        let status = self.send(chat_id, &self.messages.analysing(), None).await;

        let resolved = match self.backend.resolve_metadata(&url).await {
            Ok(media) if !media.is_empty() => Ok(media),
            Ok(_) => Err(BotError::Resolution("empty result".into())),
            Err(e) => Err(BotError::Resolution(format!("{:#}", e))),
        };
        let media = match resolved {
            Ok(media) => media,
            Err(error) => return self.resolution_failed(&session, status, error).await,
        };

        let menu = derive_menu(&media, &self.menu_options, &self.messages);
        if !self.present_menu(chat_id, &media, &menu).await {
            let error = BotError::Resolution("menu could not be delivered".into());
            return self.resolution_failed(&session, status, error).await;
        }
        if let Some(message_id) = status {
            if let Err(e) = self.gateway.delete_message(chat_id, message_id).await {
                tracing::debug!(error = %e, "Failed to delete status message");
            }
        }

        tracing::info!(
            user_id = session.user_id,
            site = extract_domain(&url).as_deref().unwrap_or("?"),
            options = menu.len(),
            "Presented format menu"
        );
        session.clear_selection();
        session.media = Some(media);
        session.menu = menu;
        session.state = SessionState::SelectingFormat;
        self.store.save(session).await;
        Handled::stay(SessionState::SelectingFormat)
    }

    async fn resolution_failed(
        &self,
        session: &Session,
        status: Option<MessageId>,
        error: BotError,
    ) -> Handled {
        tracing::warn!(user_id = session.user_id, error = %error, "Link resolution failed");

        let text = self.messages.resolve_failed();
        match status {
            Some(message_id) => {
                if self.gateway.edit_message(session.chat_id, message_id, &text).await.is_err() {
                    self.notify(session.chat_id, &text).await;
                }
            }
            None => self.notify(session.chat_id, &text).await,
        }
        self.reset(session.user_id).await
    }

    /// Send the menu as a photo card when there is a thumbnail, else as text
    async fn present_menu(&self, chat_id: ChatId, media: &MediaInfo, menu: &[MenuEntry]) -> bool {
        let title = media.title.as_deref().unwrap_or(self.messages.untitled());
        let duration = self.messages.duration(media.duration);
        let caption = self.messages.caption(title, &duration);
        let keyboard: Keyboard = menu
            .iter()
            .map(|entry| {
                vec![Button {
                    text: entry.label.clone(),
                    callback_data: entry.choice.callback_data(),
                }]
            })
            .collect();

        if let Some(thumbnail) = &media.thumbnail {
            match self.gateway.send_photo(chat_id, thumbnail, &caption, &keyboard).await {
                Ok(_) => return true,
                Err(e) => tracing::warn!(error = %e, "Thumbnail rejected, sending text menu"),
            }
        }

        match self.gateway.send_text(chat_id, &caption, Some(&keyboard)).await {
            Ok(_) => true,
            Err(e) => {
                tracing::error!(chat_id, error = %e, "Failed to send format menu");
                false
            }
        }
    }

    async fn select_format(
        &self,
        mut session: Session,
        query_id: &str,
        data: &str,
        message_id: Option<MessageId>,
    ) -> Handled {
        if let Err(e) = self.gateway.answer_callback(query_id).await {
            tracing::debug!(error = %e, "Failed to answer callback query");
        }

        let choice =
            Choice::from_callback_data(data).filter(|choice| offers(&session.menu, choice));
        let Some(choice) = choice else {
            tracing::info!(
                user_id = session.user_id,
                data,
                "Rejected stale or unknown menu choice"
            );
            self.notify(session.chat_id, &self.messages.stale_choice()).await;
            self.store.save(session).await;
            return Handled::stay(SessionState::SelectingFormat);
        };

        session.choice = Some(choice);

        if choice == Choice::Trim {
            self.replace_or_send(session.chat_id, message_id, &self.messages.trim_prompt()).await;
            session.state = SessionState::AwaitingTrimTimes;
            self.store.save(session).await;
            return Handled::stay(SessionState::AwaitingTrimTimes);
        }

        self.replace_or_send(session.chat_id, message_id, &self.messages.choice_accepted()).await;
        self.start_pipeline(session).await
    }

    async fn trim_times(&self, mut session: Session, text: &str) -> Handled {
        match parse_trim(text) {
            Ok(trim) => {
                self.notify(session.chat_id, &self.messages.trim_received(&trim.to_string())).await;
                session.trim = Some(trim);
            }
            Err(e) => {
                let error = BotError::from(e);
                tracing::warn!(
                    user_id = session.user_id,
                    error = %error,
                    "Continuing without trim"
                );
                self.notify(session.chat_id, &self.messages.trim_invalid()).await;
                session.trim = None;
            }
        }

        self.start_pipeline(session).await
    }

    async fn cancel(&self, user_id: UserId, chat_id: ChatId) -> Handled {
        self.notify(chat_id, &self.messages.cancelled()).await;
        self.reset(user_id).await
    }

    /// Hand the session's selection to the pipeline and reset the user.
    ///
    /// The download runs on its own task; the user is `Idle` as soon as it is
    /// spawned so a new link can be sent while the file is still uploading.
    async fn start_pipeline(&self, session: Session) -> Handled {
        let (Some(media), Some(choice)) = (session.media, session.choice) else {
            tracing::warn!(user_id = session.user_id, "Pipeline requested without media or choice");
            return self.reset(session.user_id).await;
        };

        let job = Job {
            user_id: session.user_id,
            chat_id: session.chat_id,
            media,
            choice,
            trim: session.trim,
        };

        let reset = self.reset(session.user_id).await;
        let pipeline = self.pipeline.clone();
        Handled {
            job: Some(tokio::spawn(async move { pipeline.run(job).await })),
            ..reset
        }
    }

    /// Report a pipeline task that died before sending its own failure message
    pub fn watch_pipeline(
        &self,
        chat_id: ChatId,
        job: JoinHandle<PipelineOutcome>,
    ) -> JoinHandle<()> {
        let gateway = self.gateway.clone();
        let messages = self.messages;
        tokio::spawn(async move {
            let Err(e) = job.await else { return };
            if !e.is_panic() {
                return;
            }
            tracing::error!(chat_id, "Pipeline task panicked");
            let text = messages.pipeline_failed(INTERNAL_FAILURE);
            if let Err(send_err) = gateway.send_text(chat_id, &text, None).await {
                tracing::warn!(chat_id, error = %send_err, "Could not report pipeline panic");
            }
        })
    }

    async fn reset(&self, user_id: UserId) -> Handled {
        self.store.remove(user_id).await;
        Handled::stay(SessionState::Idle)
    }

    async fn replace_or_send(&self, chat_id: ChatId, message_id: Option<MessageId>, text: &str) {
        if let Some(message_id) = message_id {
            if self.gateway.edit_message(chat_id, message_id, text).await.is_ok() {
                return;
            }
        }
        self.notify(chat_id, text).await;
    }

    async fn send(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Option<MessageId> {
        match self.gateway.send_text(chat_id, text, keyboard).await {
            Ok(message_id) => Some(message_id),
            Err(e) => {
                tracing::warn!(chat_id, error = %e, "Failed to send message");
                None
            }
        }
    }

    async fn notify(&self, chat_id: ChatId, text: &str) {
        self.send(chat_id, text, None).await;
    }
}
