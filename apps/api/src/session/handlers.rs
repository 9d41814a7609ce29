//! Axum route handlers for sign-up, sign-in, current user and sign-out.

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::user::User;
use crate::session::identity::AuthError;
use crate::session::{CurrentUser, RequireUser};
use crate::state::AppState;
use crate::store::DeleteSummary;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpRequest {
    pub id_token: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInRequest {
    pub email: String,
    pub id_token: String,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub user: Option<User>,
}

#[derive(Debug, Serialize)]
pub struct SignOutResponse {
    pub success: bool,
    pub message: String,
    pub deleted: DeleteSummary,
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Expired => {
                AppError::Unauthorized("Credential has expired! Please sign in again.".to_string())
            }
            AuthError::StaleSignIn => AppError::Unauthorized(e.to_string()),
            AuthError::Invalid(_) => AppError::Unauthorized(
                "Invalid credentials! Please check your email and password.".to_string(),
            ),
            AuthError::Signing(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

/// POST /api/auth/sign-up
///
/// Creates the user document for a freshly registered provider account.
pub async fn handle_sign_up(
    State(state): State<AppState>,
    Json(request): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<ActionResponse>), AppError> {
    let claims = state
        .sessions
        .identity()
        .verify_id_token(&request.id_token)
        .await?;

    // The form name wins; the provider's display name is the fallback.
    let name = Some(request.name.trim())
        .filter(|n| !n.is_empty())
        .or_else(|| claims.name.as_deref().map(str::trim).filter(|n| !n.is_empty()))
        .map(str::to_string)
        .ok_or_else(|| AppError::missing_fields(vec!["name".to_string()]))?;

    state
        .store
        .insert_user(&User {
            id: claims.uid.clone(),
            name,
            email: claims.email,
            created_at: Utc::now(),
        })
        .await?;

    info!("Created user {}", claims.uid);

    Ok((
        StatusCode::CREATED,
        Json(ActionResponse {
            success: true,
            message: "Account created successfully! Please sign in.".to_string(),
        }),
    ))
}

/// POST /api/auth/sign-in
///
/// Exchanges the provider ID token for the `session` cookie.
pub async fn handle_sign_in(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SignInRequest>,
) -> Result<(CookieJar, Json<ActionResponse>), AppError> {
    if state
        .store
        .find_user_by_email(&request.email)
        .await?
        .is_none()
    {
        return Err(AppError::NotFound(
            "No user exists with the given email! Create an account instead.".to_string(),
        ));
    }

    let (jar, claims) = state
        .sessions
        .establish_session(jar, &request.id_token)
        .await?;

    if !claims.email.eq_ignore_ascii_case(&request.email) {
        warn!("Sign-in email does not match ID token for {}", claims.uid);
        return Err(AppError::Forbidden(
            "Credential does not belong to the given email!".to_string(),
        ));
    }

    info!("User {} signed in", claims.uid);

    Ok((
        jar,
        Json(ActionResponse {
            success: true,
            message: "Signed in successfully!".to_string(),
        }),
    ))
}

/// GET /api/auth/me
pub async fn handle_me(current: CurrentUser) -> Json<MeResponse> {
    Json(MeResponse {
        user: current.user().cloned(),
    })
}

/// POST /api/auth/sign-out
///
/// Deletes the account with all of its interviews and feedback, then clears the cookie.
pub async fn handle_sign_out(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    jar: CookieJar,
) -> Result<(CookieJar, Json<SignOutResponse>), AppError> {
    let deleted = state.store.delete_user_cascade(&user.id).await?;
    let jar = state.sessions.clear_session(jar);

    Ok((
        jar,
        Json(SignOutResponse {
            success: true,
            message: "Account and all associated data successfully deleted!".to_string(),
            deleted,
        }),
    ))
}
