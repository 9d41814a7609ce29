use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::session::CurrentUser;
use crate::state::AppState;

/// Protected pages: anonymous visitors go to `/sign-in`; the resolved `User`
/// is attached as a request extension.
pub async fn require_user(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Response {
    match state.sessions.resolve_current_user(&jar).await {
        CurrentUser::Authenticated(user) => {
            req.extensions_mut().insert(user);
            next.run(req).await
        }
        CurrentUser::Anonymous => Redirect::to("/sign-in").into_response(),
    }
}

/// Auth pages: signed-in users go home.
pub async fn redirect_signed_in(
    State(state): State<AppState>,
    jar: CookieJar,
    req: Request,
    next: Next,
) -> Response {
    if state.sessions.is_authenticated(&jar).await {
        return Redirect::to("/").into_response();
    }
    next.run(req).await
}
