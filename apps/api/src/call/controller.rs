//! Call Lifecycle Controller.
//!
//! One controller per call: `INACTIVE → CONNECTING → ACTIVE → FINISHED`.
//! SDK events drive the transitions; entering FINISHED triggers exactly one
//! handoff (redirect for generate calls, feedback for interview calls), after
//! which every subscription is removed.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::call::events::{
    EventKind, SdkMessage, SubscriptionHandle, TranscriptMessage, TranscriptType, VoiceEvent,
};
use crate::call::voice::{AssistantConfig, VoiceClient, VoiceError};
use crate::generation::feedback::FeedbackSink;
use crate::models::transcript::TranscriptTurn;

/// Delay between the end of a generate call and the redirect home.
pub const GENERATE_REDIRECT_DELAY: Duration = Duration::from_secs(2);

const GENERATE_NOTICE: &str = "Your interview is being generated. You'll be redirected to the \
    homepage shortly. Check the 'Your Interviews' section to find it once it's ready.";
const CONNECTION_ERROR_NOTICE: &str = "Connection error! Please try again later.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CallStatus {
    Inactive,
    Connecting,
    Active,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CallMode {
    Generate,
    Interview,
}

#[derive(Debug, Clone, Default)]
pub struct CallContext {
    pub username: String,
    pub user_id: Option<String>,
    pub interview_id: Option<Uuid>,
    pub questions: Vec<String>,
    /// Call-scoped credential handed to the generate workflow.
    pub auth_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Error,
}

/// A toast-style message for the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Where the controller sends user-visible notices and navigation.
pub trait Navigator: Send + Sync {
    fn notify(&self, notice: Notice);
    fn redirect(&self, path: String);
}

#[derive(Debug, Default)]
struct ViewState {
    notice: Option<Notice>,
    redirect: Option<String>,
}

/// Navigator backing the status endpoint: the browser polls the latest
/// notice and redirect target.
#[derive(Debug, Default)]
pub struct CallView {
    state: Mutex<ViewState>,
}

impl CallView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notice(&self) -> Option<Notice> {
        lock(&self.state).notice.clone()
    }

    pub fn redirect_target(&self) -> Option<String> {
        lock(&self.state).redirect.clone()
    }
}

impl Navigator for CallView {
    fn notify(&self, notice: Notice) {
        lock(&self.state).notice = Some(notice);
    }

    fn redirect(&self, path: String) {
        lock(&self.state).redirect = Some(path);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallSnapshot {
    pub status: CallStatus,
    pub speaking: bool,
    pub latest_message: Option<String>,
}

struct Inner {
    status: CallStatus,
    speaking: bool,
    turns: Vec<TranscriptTurn>,
    subscriptions: Vec<SubscriptionHandle>,
    finish_handled: bool,
    last_activity: Instant,
    settled_at: Option<Instant>,
}

pub struct CallController {
    mode: CallMode,
    context: CallContext,
    voice: Arc<dyn VoiceClient>,
    feedback: Arc<dyn FeedbackSink>,
    navigator: Arc<dyn Navigator>,
    inner: Mutex<Inner>,
}

type EventCallback = fn(&Arc<CallController>, &VoiceEvent);

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl CallController {
    pub fn new(
        mode: CallMode,
        context: CallContext,
        voice: Arc<dyn VoiceClient>,
        feedback: Arc<dyn FeedbackSink>,
        navigator: Arc<dyn Navigator>,
    ) -> Arc<Self> {
        Arc::new(Self {
            mode,
            context,
            voice,
            feedback,
            navigator,
            inner: Mutex::new(Inner {
                status: CallStatus::Inactive,
                speaking: false,
                turns: Vec::new(),
                subscriptions: Vec::new(),
                finish_handled: false,
                last_activity: Instant::now(),
                settled_at: None,
            }),
        })
    }

    /// The assistant the browser should launch for this call.
    pub fn assistant_config(&self, workflow_assistant_id: &str) -> AssistantConfig {
        match self.mode {
            CallMode::Generate => AssistantConfig::workflow(
                workflow_assistant_id,
                &self.context.username,
                self.context.user_id.as_deref().unwrap_or_default(),
                self.context.auth_token.as_deref(),
            ),
            CallMode::Interview => AssistantConfig::interviewer(&self.context.questions),
        }
    }

    /// Subscribes the six SDK handlers, moves to CONNECTING and launches the session.
    pub async fn start(self: &Arc<Self>, config: &AssistantConfig) -> Result<(), VoiceError> {
        let handlers: [(EventKind, EventCallback); 6] = [
            (EventKind::CallStart, |this, _| this.on_call_start()),
            (EventKind::CallEnd, |this, _| this.finish()),
            (EventKind::Message, |this, event| {
                if let VoiceEvent::Message {
                    message: SdkMessage::Transcript(message),
                } = event
                {
                    this.on_transcript_event(message);
                }
            }),
            (EventKind::SpeechStart, |this, _| this.on_speech_boundary(true)),
            (EventKind::SpeechEnd, |this, _| this.on_speech_boundary(false)),
            (EventKind::Error, |this, event| {
                if let VoiceEvent::Error { message } = event {
                    this.on_error(message);
                }
            }),
        ];

        let subscriptions = handlers
            .into_iter()
            .map(|(kind, callback)| self.subscribe(kind, callback))
            .collect();
        {
            let mut inner = lock(&self.inner);
            inner.subscriptions = subscriptions;
            inner.status = CallStatus::Connecting;
            inner.last_activity = Instant::now();
        }

        if let Err(e) = self.voice.start(config).await {
            self.on_error(&e.to_string());
            return Err(e);
        }
        Ok(())
    }

    fn subscribe(self: &Arc<Self>, kind: EventKind, callback: EventCallback) -> SubscriptionHandle {
        let weak = Arc::downgrade(self);
        self.voice.events().subscribe(
            kind,
            Arc::new(move |event: &VoiceEvent| {
                if let Some(this) = weak.upgrade() {
                    lock(&this.inner).last_activity = Instant::now();
                    callback(&this, event);
                }
            }),
        )
    }

    fn on_call_start(&self) {
        let mut inner = lock(&self.inner);
        if inner.status == CallStatus::Connecting {
            inner.status = CallStatus::Active;
        }
    }

    /// Final fragments only; partials are superseded by the final one.
    pub fn on_transcript_event(&self, message: &TranscriptMessage) {
        if message.transcript_type != TranscriptType::Final {
            return;
        }
        let mut inner = lock(&self.inner);
        if inner.status == CallStatus::Finished {
            return;
        }
        inner
            .turns
            .push(TranscriptTurn::new(message.role, message.transcript.clone()));
    }

    pub fn on_speech_boundary(&self, is_speaking: bool) {
        let mut inner = lock(&self.inner);
        if inner.status != CallStatus::Finished {
            inner.speaking = is_speaking;
        }
    }

    pub fn on_error(self: &Arc<Self>, message: &str) {
        error!("Voice agent error: {message}");
        self.navigator.notify(Notice::error(CONNECTION_ERROR_NOTICE));
        self.finish();
    }

    /// User hang-up.
    pub fn stop(self: &Arc<Self>) {
        self.voice.stop();
        self.finish();
    }

    fn finish(self: &Arc<Self>) {
        let turns = {
            let mut inner = lock(&self.inner);
            if inner.finish_handled {
                return;
            }
            inner.finish_handled = true;
            inner.status = CallStatus::Finished;
            inner.speaking = false;
            inner.turns.clone()
        };
        info!("Call finished ({:?} mode, {} turns)", self.mode, turns.len());

        let this = Arc::clone(self);
        tokio::spawn(async move {
            this.hand_off(turns).await;
            this.teardown();
        });
    }

    async fn hand_off(&self, turns: Vec<TranscriptTurn>) {
        match self.mode {
            CallMode::Generate => {
                self.navigator.notify(Notice::info(GENERATE_NOTICE));
                tokio::time::sleep(GENERATE_REDIRECT_DELAY).await;
                self.navigator.redirect("/".to_string());
            }
            CallMode::Interview => {
                let (Some(user_id), Some(interview_id)) =
                    (self.context.user_id.as_deref(), self.context.interview_id)
                else {
                    warn!("Interview call ended without a user or interview; skipping feedback");
                    self.navigator.redirect("/".to_string());
                    return;
                };

                match self.feedback.submit(interview_id, user_id, turns).await {
                    Ok(feedback_id) => {
                        info!("Feedback {feedback_id} ready for interview {interview_id}");
                        self.navigator
                            .redirect(format!("/interview/{interview_id}/feedback"));
                    }
                    Err(failure) => {
                        warn!("Feedback generation failed ({}): {}", failure.code, failure.message);
                        self.navigator.notify(Notice::error(failure.message));
                        self.navigator.redirect("/".to_string());
                    }
                }
            }
        }
    }

    fn teardown(&self) {
        let subscriptions = {
            let mut inner = lock(&self.inner);
            inner.settled_at = Some(Instant::now());
            std::mem::take(&mut inner.subscriptions)
        };
        for handle in subscriptions {
            self.voice.events().unsubscribe(handle);
        }
    }

    pub fn status(&self) -> CallStatus {
        lock(&self.inner).status
    }

    /// Time since the last relayed SDK event, or since `start`.
    pub fn idle_for(&self) -> Duration {
        lock(&self.inner).last_activity.elapsed()
    }

    /// Set once the handoff has completed and subscriptions are gone.
    pub fn settled_at(&self) -> Option<Instant> {
        lock(&self.inner).settled_at
    }

    pub fn snapshot(&self) -> CallSnapshot {
        let inner = lock(&self.inner);
        CallSnapshot {
            status: inner.status,
            speaking: inner.speaking,
            latest_message: inner.turns.last().map(|t| t.content.clone()),
        }
    }
}
