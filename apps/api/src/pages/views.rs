//! JSON view models for the page routes. Guards run before these handlers,
//! so protected views can take the `User` extension directly.

use axum::{
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
    Extension, Json,
};
use serde::Serialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::feedback::Feedback;
use crate::models::interview::Interview;
use crate::models::user::User;
use crate::pages::cards::{
    display_date, display_type, final_verdict, tech_icons, InterviewCard, TechIcon, Verdict,
};
use crate::state::AppState;
use crate::store::DEFAULT_LISTING_LIMIT;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeView {
    pub user: User,
    pub user_interviews: Vec<InterviewCard>,
    pub latest_interviews: Vec<InterviewCard>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateView {
    pub username: String,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewDetailView {
    pub interview: Interview,
    pub interview_type: String,
    pub tech_icons: Vec<TechIcon>,
    pub username: String,
    pub user_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackView {
    pub interview_id: Uuid,
    pub job_role: String,
    pub feedback: Option<Feedback>,
    pub verdict: Option<Verdict>,
    pub display_date: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AuthPageView {
    pub form: &'static str,
}

/// Unknown or malformed ids both resolve to `None`.
async fn find_interview(state: &AppState, raw_id: &str) -> Result<Option<Interview>, AppError> {
    let Ok(id) = raw_id.parse::<Uuid>() else {
        return Ok(None);
    };
    Ok(state.store.interview_by_id(id).await?)
}

/// GET /
pub async fn home(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
) -> Result<Json<HomeView>, AppError> {
    let (own, latest) = tokio::join!(
        state.store.interviews_by_owner(&user.id),
        state.store.latest_interviews(&user.id, DEFAULT_LISTING_LIMIT),
    );

    let mut user_interviews = Vec::new();
    for interview in own? {
        let feedback = state.store.feedback_for(interview.id, &user.id).await?;
        user_interviews.push(InterviewCard::new(&interview, feedback.as_ref(), true));
    }
    let latest_interviews = latest?
        .iter()
        .map(|interview| InterviewCard::new(interview, None, false))
        .collect();

    Ok(Json(HomeView {
        user,
        user_interviews,
        latest_interviews,
    }))
}

/// GET /interview
pub async fn generate(Extension(user): Extension<User>) -> Json<GenerateView> {
    Json(GenerateView {
        username: user.name,
        user_id: user.id,
    })
}

/// GET /interview/:id
pub async fn interview_detail(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let Some(interview) = find_interview(&state, &id).await? else {
        return Ok(Redirect::to("/").into_response());
    };

    Ok(Json(InterviewDetailView {
        interview_type: display_type(&interview.interview_type),
        tech_icons: tech_icons(&interview.tech_stack),
        interview,
        username: user.name,
        user_id: user.id,
    })
    .into_response())
}

/// GET /interview/:id/feedback
pub async fn interview_feedback(
    State(state): State<AppState>,
    Extension(user): Extension<User>,
    Path(id): Path<String>,
) -> Result<Response, AppError> {
    let Some(interview) = find_interview(&state, &id).await? else {
        return Ok(Redirect::to("/").into_response());
    };

    let feedback = state.store.feedback_for(interview.id, &user.id).await?;

    Ok(Json(FeedbackView {
        interview_id: interview.id,
        job_role: interview.job_role,
        verdict: feedback.as_ref().map(|f| final_verdict(f.total_score)),
        display_date: feedback.as_ref().map(|f| display_date(f.created_at)),
        feedback,
    })
    .into_response())
}

/// GET /sign-in
pub async fn sign_in_page() -> Json<AuthPageView> {
    Json(AuthPageView { form: "sign-in" })
}

/// GET /sign-up
pub async fn sign_up_page() -> Json<AuthPageView> {
    Json(AuthPageView { form: "sign-up" })
}
