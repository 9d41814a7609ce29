//! Axum route handlers for the Generation API.

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::errors::{AppError, Failure};
use crate::generation::feedback::{generate_feedback, FeedbackRequest};
use crate::generation::questions::{generate_interview, parse_question_request};
use crate::models::transcript::TranscriptTurn;
use crate::session::RequireUser;
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct GenerateHealthResponse {
    pub success: bool,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    pub success: bool,
    pub message: String,
    pub interview_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackSubmission {
    #[serde(default)]
    pub interview_id: Option<String>,
    #[serde(default)]
    pub transcript: Vec<TranscriptTurn>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Failure>,
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/vapi/generate
///
/// Liveness probe for the voice workflow's tool call. No side effects.
pub async fn handle_generate_health() -> Json<GenerateHealthResponse> {
    Json(GenerateHealthResponse {
        success: true,
        message: "Interview Generation API is operational!".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// POST /api/vapi/generate
///
/// Called by the voice workflow once it has collected the interview details.
/// The bearer is either a provider ID token or the call credential minted when
/// the generate call started. The owner is its uid; any `userId` in the body is
/// ignored.
pub async fn handle_generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<GenerateResponse>), AppError> {
    let token = bearer_token(&headers).ok_or_else(|| {
        AppError::Unauthorized("A bearer ID token is required!".to_string())
    })?;
    let identity = state.sessions.identity();
    let claims = match identity.verify_id_token(token).await {
        Ok(claims) => claims,
        Err(_) => identity.verify_call_token(token).await.map_err(|e| {
            warn!("Rejected generation credential: {e}");
            AppError::Forbidden("The ID token could not be verified!".to_string())
        })?,
    };

    let body: Value = serde_json::from_slice(&body)
        .map_err(|_| AppError::invalid_input("Invalid JSON in request body!"))?;
    let request = parse_question_request(&body, &claims.uid)?;

    let interview =
        generate_interview(state.store.as_ref(), state.llm.as_ref(), request).await?;

    Ok((
        StatusCode::CREATED,
        Json(GenerateResponse {
            success: true,
            message: "Interview generated successfully".to_string(),
            interview_id: interview.id,
        }),
    ))
}

/// POST /api/feedback
///
/// Scores a finished interview's transcript for the signed-in user.
pub async fn handle_create_feedback(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    body: Bytes,
) -> (StatusCode, Json<FeedbackResponse>) {
    let result = match parse_feedback_submission(&body) {
        Ok((interview_id, transcript)) => {
            generate_feedback(
                state.store.as_ref(),
                state.llm.as_ref(),
                FeedbackRequest {
                    interview_id,
                    user_id: user.id,
                    transcript,
                },
            )
            .await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(feedback) => (
            StatusCode::CREATED,
            Json(FeedbackResponse {
                success: true,
                feedback_id: Some(feedback.id),
                error: None,
            }),
        ),
        Err(e) => {
            let status = match e {
                AppError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
                AppError::NotFound(_) => StatusCode::NOT_FOUND,
                AppError::Parse(_) => StatusCode::UNPROCESSABLE_ENTITY,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            };
            warn!("Feedback generation failed: {e}");
            (
                status,
                Json(FeedbackResponse {
                    success: false,
                    feedback_id: None,
                    error: Some(e.failure()),
                }),
            )
        }
    }
}

fn parse_feedback_submission(body: &[u8]) -> Result<(Uuid, Vec<TranscriptTurn>), AppError> {
    let submission: FeedbackSubmission = serde_json::from_slice(body)
        .map_err(|_| AppError::invalid_input("Invalid JSON in request body!"))?;
    let raw_id = submission
        .interview_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::missing_fields(vec!["interviewId".to_string()]))?;
    let interview_id = Uuid::parse_str(raw_id)
        .map_err(|_| AppError::invalid_input(format!("Invalid interviewId: {raw_id}")))?;
    Ok((interview_id, submission.transcript))
}
