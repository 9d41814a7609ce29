//! Axum route handlers for the call relay.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::call::controller::{CallContext, CallMode};
use crate::call::events::VoiceEvent;
use crate::call::registry::{CallStarted, CallState};
use crate::errors::AppError;
use crate::session::RequireUser;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartCallRequest {
    pub mode: CallMode,
    #[serde(default)]
    pub interview_id: Option<Uuid>,
}

/// POST /api/calls
///
/// Creates a controller for the signed-in user and returns the assistant the
/// browser SDK should start.
pub async fn handle_start_call(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(request): Json<StartCallRequest>,
) -> Result<(StatusCode, Json<CallStarted>), AppError> {
    let context = match request.mode {
        CallMode::Generate => CallContext {
            username: user.name.clone(),
            user_id: Some(user.id.clone()),
            ..Default::default()
        },
        CallMode::Interview => {
            let interview_id = request
                .interview_id
                .ok_or_else(|| AppError::missing_fields(vec!["interviewId".to_string()]))?;
            let interview = state
                .store
                .interview_by_id(interview_id)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Interview {interview_id} not found")))?;
            CallContext {
                username: user.name.clone(),
                user_id: Some(user.id.clone()),
                interview_id: Some(interview.id),
                questions: interview.questions,
                auth_token: None,
            }
        }
    };

    let started = state.calls.start(&user.id, request.mode, context).await?;
    Ok((StatusCode::CREATED, Json(started)))
}

/// POST /api/calls/:id/events
pub async fn handle_call_event(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(call_id): Path<Uuid>,
    Json(event): Json<VoiceEvent>,
) -> Result<Json<CallState>, AppError> {
    Ok(Json(state.calls.relay(&user.id, call_id, &event)?))
}

/// POST /api/calls/:id/stop
pub async fn handle_stop_call(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(call_id): Path<Uuid>,
) -> Result<Json<CallState>, AppError> {
    Ok(Json(state.calls.stop(&user.id, call_id)?))
}

/// GET /api/calls/:id
pub async fn handle_get_call(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(call_id): Path<Uuid>,
) -> Result<Json<CallState>, AppError> {
    Ok(Json(state.calls.state(&user.id, call_id)?))
}
