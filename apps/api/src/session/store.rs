use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Serialize;
use tracing::warn;

use crate::errors::AppError;
use crate::models::user::User;
use crate::session::identity::{AuthError, IdentityClaims, IdentityProvider};
use crate::state::AppState;
use crate::store::Store;

pub const SESSION_COOKIE: &str = "session";
pub const SESSION_TTL_DAYS: i64 = 7;

/// Outcome of resolving a request's session. Verification failure is data:
/// it yields `Anonymous`, never an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", content = "user", rename_all = "lowercase")]
pub enum CurrentUser {
    Authenticated(User),
    Anonymous,
}

impl CurrentUser {
    pub fn user(&self) -> Option<&User> {
        match self {
            CurrentUser::Authenticated(user) => Some(user),
            CurrentUser::Anonymous => None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, CurrentUser::Authenticated(_))
    }
}

/// Wraps session-artifact issuance/verification and the user-document lookup.
#[derive(Clone)]
pub struct SessionStore {
    identity: Arc<dyn IdentityProvider>,
    store: Arc<dyn Store>,
    secure_cookies: bool,
}

impl SessionStore {
    pub fn new(identity: Arc<dyn IdentityProvider>, store: Arc<dyn Store>, secure_cookies: bool) -> Self {
        Self {
            identity,
            store,
            secure_cookies,
        }
    }

    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    /// Exchanges an ID token for a 7-day session cookie added to `jar`.
    pub async fn establish_session(
        &self,
        jar: CookieJar,
        id_token: &str,
    ) -> Result<(CookieJar, IdentityClaims), AuthError> {
        let (artifact, claims) = self
            .identity
            .create_session(id_token, chrono::Duration::days(SESSION_TTL_DAYS))
            .await?;

        let cookie = Cookie::build((SESSION_COOKIE, artifact))
            .http_only(true)
            .secure(self.secure_cookies)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(time::Duration::days(SESSION_TTL_DAYS))
            .build();

        Ok((jar.add(cookie), claims))
    }

    pub async fn resolve_current_user(&self, jar: &CookieJar) -> CurrentUser {
        let Some(artifact) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
            return CurrentUser::Anonymous;
        };

        let claims = match self.identity.verify_session(&artifact).await {
            Ok(claims) => claims,
            Err(AuthError::Expired) => {
                warn!("Session cookie has expired; user needs to sign in again");
                return CurrentUser::Anonymous;
            }
            Err(e) => {
                warn!("Rejected session cookie: {e}");
                return CurrentUser::Anonymous;
            }
        };

        match self.store.find_user(&claims.uid).await {
            Ok(Some(user)) => CurrentUser::Authenticated(user),
            Ok(None) => {
                warn!("Session for {} has no user record; treating as revoked", claims.uid);
                CurrentUser::Anonymous
            }
            Err(e) => {
                warn!("User lookup failed while resolving session: {e}");
                CurrentUser::Anonymous
            }
        }
    }

    pub async fn is_authenticated(&self, jar: &CookieJar) -> bool {
        self.resolve_current_user(jar).await.is_authenticated()
    }

    pub fn clear_session(&self, jar: CookieJar) -> CookieJar {
        jar.remove(Cookie::build((SESSION_COOKIE, "")).path("/").build())
    }
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        Ok(state.sessions.resolve_current_user(&jar).await)
    }
}

/// Extractor for API routes that need a signed-in user; rejects with 401.
pub struct RequireUser(pub User);

#[async_trait]
impl FromRequestParts<AppState> for RequireUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        match state.sessions.resolve_current_user(&jar).await {
            CurrentUser::Authenticated(user) => Ok(RequireUser(user)),
            CurrentUser::Anonymous => Err(AppError::Unauthorized(
                "Authentication required".to_string(),
            )),
        }
    }
}
