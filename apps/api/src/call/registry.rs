use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::call::controller::{
    CallContext, CallController, CallMode, CallSnapshot, CallStatus, CallView, Notice,
};
use crate::call::events::VoiceEvent;
use crate::call::voice::{AssistantConfig, RelayVoiceClient, VoiceClient};
use crate::errors::AppError;
use crate::generation::feedback::FeedbackSink;
use crate::session::identity::IdentityProvider;

/// How long a settled call stays readable so the browser can pick up its redirect.
const SETTLED_GRACE: Duration = Duration::from_secs(60);

/// A live call with no relayed event for this long is treated as abandoned.
const CALL_IDLE_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Lifetime of the credential a generate workflow uses to create the interview.
const CALL_TOKEN_TTL_MINUTES: i64 = 60;

struct CallEntry {
    owner: String,
    controller: Arc<CallController>,
    voice: Arc<RelayVoiceClient>,
    view: Arc<CallView>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallStarted {
    pub call_id: Uuid,
    pub status: CallStatus,
    pub assistant: AssistantConfig,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallState {
    pub call_id: Uuid,
    #[serde(flatten)]
    pub snapshot: CallSnapshot,
    pub notice: Option<Notice>,
    pub redirect: Option<String>,
    pub stop_requested: bool,
}

/// Live calls keyed by id. At most one CONNECTING or ACTIVE call per user.
#[derive(Clone)]
pub struct CallRegistry {
    calls: Arc<Mutex<HashMap<Uuid, CallEntry>>>,
    feedback: Arc<dyn FeedbackSink>,
    identity: Arc<dyn IdentityProvider>,
    workflow_assistant_id: String,
}

impl CallRegistry {
    pub fn new(
        feedback: Arc<dyn FeedbackSink>,
        identity: Arc<dyn IdentityProvider>,
        workflow_assistant_id: impl Into<String>,
    ) -> Self {
        Self {
            calls: Arc::new(Mutex::new(HashMap::new())),
            feedback,
            identity,
            workflow_assistant_id: workflow_assistant_id.into(),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Uuid, CallEntry>> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub async fn start(
        &self,
        owner: &str,
        mode: CallMode,
        mut context: CallContext,
    ) -> Result<CallStarted, AppError> {
        if mode == CallMode::Generate {
            let token = self
                .identity
                .issue_call_token(owner, chrono::Duration::minutes(CALL_TOKEN_TTL_MINUTES))
                .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?;
            context.auth_token = Some(token);
        }

        let call_id = Uuid::new_v4();
        let voice = Arc::new(RelayVoiceClient::new());
        let view = Arc::new(CallView::new());
        let controller = CallController::new(
            mode,
            context,
            voice.clone(),
            Arc::clone(&self.feedback),
            view.clone(),
        );

        {
            let mut calls = self.lock();
            prune(&mut calls);
            let busy = calls.values().any(|entry| {
                entry.owner == owner
                    && matches!(
                        entry.controller.status(),
                        CallStatus::Inactive | CallStatus::Connecting | CallStatus::Active
                    )
            });
            if busy {
                return Err(AppError::Conflict(
                    "A call is already in progress! End it before starting another.".to_string(),
                ));
            }
            calls.insert(
                call_id,
                CallEntry {
                    owner: owner.to_string(),
                    controller: Arc::clone(&controller),
                    voice: Arc::clone(&voice),
                    view,
                },
            );
        }

        let assistant = controller.assistant_config(&self.workflow_assistant_id);
        controller
            .start(&assistant)
            .await
            .map_err(|e| AppError::Conflict(e.to_string()))?;

        info!("Started {mode:?} call {call_id} for {owner}");

        Ok(CallStarted {
            call_id,
            status: controller.status(),
            assistant,
        })
    }

    /// Feeds one relayed SDK event into the call's hub.
    pub fn relay(&self, owner: &str, call_id: Uuid, event: &VoiceEvent) -> Result<CallState, AppError> {
        let voice = self.with_entry(owner, call_id, |entry| Arc::clone(&entry.voice))?;
        debug!("Call {call_id} event {:?}", event.kind());
        voice.events().emit(event);
        self.state(owner, call_id)
    }

    pub fn stop(&self, owner: &str, call_id: Uuid) -> Result<CallState, AppError> {
        let controller = self.with_entry(owner, call_id, |entry| Arc::clone(&entry.controller))?;
        controller.stop();
        self.state(owner, call_id)
    }

    pub fn state(&self, owner: &str, call_id: Uuid) -> Result<CallState, AppError> {
        self.with_entry(owner, call_id, |entry| CallState {
            call_id,
            snapshot: entry.controller.snapshot(),
            notice: entry.view.notice(),
            redirect: entry.view.redirect_target(),
            stop_requested: entry.voice.stop_requested(),
        })
    }

    /// Another user's call id reads as not found.
    fn with_entry<T>(
        &self,
        owner: &str,
        call_id: Uuid,
        f: impl FnOnce(&CallEntry) -> T,
    ) -> Result<T, AppError> {
        let calls = self.lock();
        calls
            .get(&call_id)
            .filter(|entry| entry.owner == owner)
            .map(f)
            .ok_or_else(|| AppError::NotFound(format!("Call {call_id} not found")))
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }
}

/// Stops abandoned calls, then drops settled ones past their grace period.
fn prune(calls: &mut HashMap<Uuid, CallEntry>) {
    for (call_id, entry) in calls.iter() {
        if entry.controller.status() != CallStatus::Finished
            && entry.controller.idle_for() >= CALL_IDLE_TIMEOUT
        {
            warn!("Call {call_id} idle for {CALL_IDLE_TIMEOUT:?}; stopping it");
            entry.controller.stop();
        }
    }

    calls.retain(|call_id, entry| match entry.controller.settled_at() {
        Some(at) if at.elapsed() >= SETTLED_GRACE => {
            debug!("Pruned settled call {call_id}");
            false
        }
        _ => true,
    });
}
