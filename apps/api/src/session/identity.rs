//! Identity-provider seam.
//!
//! The hosted provider signs short-lived ID tokens; this service exchanges them
//! for long-lived session artifacts and verifies those on every request.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// ID tokens older than this cannot be exchanged for a session.
const MAX_ID_TOKEN_AGE_SECS: i64 = 5 * 60;
const SESSION_KIND: &str = "session";
const CALL_KIND: &str = "call";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Credential has expired")]
    Expired,

    #[error("Credential is invalid: {0}")]
    Invalid(String),

    #[error("Sign-in is too old; sign in again to start a session")]
    StaleSignIn,

    #[error("Could not sign credential: {0}")]
    Signing(String),
}

/// Identity asserted by a verified credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityClaims {
    pub uid: String,
    pub email: String,
    pub name: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn verify_id_token(&self, id_token: &str) -> Result<IdentityClaims, AuthError>;

    /// Exchanges a fresh ID token for a session artifact valid for `ttl`.
    async fn create_session(
        &self,
        id_token: &str,
        ttl: Duration,
    ) -> Result<(String, IdentityClaims), AuthError>;

    async fn verify_session(&self, session: &str) -> Result<IdentityClaims, AuthError>;

    /// Signs a credential the voice workflow presents when it creates an
    /// interview on behalf of `uid` during one call.
    fn issue_call_token(&self, uid: &str, ttl: Duration) -> Result<String, AuthError>;

    async fn verify_call_token(&self, token: &str) -> Result<IdentityClaims, AuthError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct IdTokenClaims {
    sub: String,
    email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionClaims {
    sub: String,
    email: String,
    kind: String,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
struct CallClaims {
    sub: String,
    kind: String,
    iat: i64,
    exp: i64,
}

/// HS256 verifier for provider ID tokens and issuer of session artifacts.
/// The two keys are distinct so an ID token can never pass as a session.
pub struct JwtIdentityProvider {
    id_token_key: DecodingKey,
    session_encoding: EncodingKey,
    session_decoding: DecodingKey,
    #[cfg(test)]
    id_token_encoding: EncodingKey,
}

impl JwtIdentityProvider {
    pub fn new(id_token_secret: &str, session_secret: &str) -> Self {
        Self {
            id_token_key: DecodingKey::from_secret(id_token_secret.as_bytes()),
            session_encoding: EncodingKey::from_secret(session_secret.as_bytes()),
            session_decoding: DecodingKey::from_secret(session_secret.as_bytes()),
            #[cfg(test)]
            id_token_encoding: EncodingKey::from_secret(id_token_secret.as_bytes()),
        }
    }

    /// Mints an ID token the way the hosted provider would. Tests only.
    #[cfg(test)]
    pub fn issue_id_token(&self, uid: &str, email: &str, issued_secs_ago: i64) -> String {
        let iat = Utc::now().timestamp() - issued_secs_ago;
        let claims = IdTokenClaims {
            sub: uid.to_string(),
            email: email.to_string(),
            name: None,
            iat,
            exp: iat + 3600,
        };
        encode(&Header::default(), &claims, &self.id_token_encoding).unwrap()
    }

    fn decode_id_token(&self, id_token: &str) -> Result<IdTokenClaims, AuthError> {
        decode::<IdTokenClaims>(id_token, &self.id_token_key, &Validation::new(Algorithm::HS256))
            .map(|data| data.claims)
            .map_err(map_jwt_error)
    }
}

fn map_jwt_error(e: jsonwebtoken::errors::Error) -> AuthError {
    match e.kind() {
        ErrorKind::ExpiredSignature => AuthError::Expired,
        other => AuthError::Invalid(format!("{other:?}")),
    }
}

#[async_trait]
impl IdentityProvider for JwtIdentityProvider {
    async fn verify_id_token(&self, id_token: &str) -> Result<IdentityClaims, AuthError> {
        let claims = self.decode_id_token(id_token)?;
        Ok(IdentityClaims {
            uid: claims.sub,
            email: claims.email,
            name: claims.name,
        })
    }

    async fn create_session(
        &self,
        id_token: &str,
        ttl: Duration,
    ) -> Result<(String, IdentityClaims), AuthError> {
        let id_claims = self.decode_id_token(id_token)?;
        let now = Utc::now().timestamp();
        if now - id_claims.iat > MAX_ID_TOKEN_AGE_SECS {
            return Err(AuthError::StaleSignIn);
        }

        let session = SessionClaims {
            sub: id_claims.sub.clone(),
            email: id_claims.email.clone(),
            kind: SESSION_KIND.to_string(),
            iat: now,
            exp: now + ttl.num_seconds(),
        };
        let token = encode(&Header::default(), &session, &self.session_encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))?;

        Ok((
            token,
            IdentityClaims {
                uid: id_claims.sub,
                email: id_claims.email,
                name: id_claims.name,
            },
        ))
    }

    async fn verify_session(&self, session: &str) -> Result<IdentityClaims, AuthError> {
        let claims = decode::<SessionClaims>(
            session,
            &self.session_decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(map_jwt_error)?
        .claims;

        if claims.kind != SESSION_KIND {
            return Err(AuthError::Invalid("not a session artifact".to_string()));
        }

        Ok(IdentityClaims {
            uid: claims.sub,
            email: claims.email,
            name: None,
        })
    }

    fn issue_call_token(&self, uid: &str, ttl: Duration) -> Result<String, AuthError> {
        let now = Utc::now().timestamp();
        let claims = CallClaims {
            sub: uid.to_string(),
            kind: CALL_KIND.to_string(),
            iat: now,
            exp: now + ttl.num_seconds(),
        };
        encode(&Header::default(), &claims, &self.session_encoding)
            .map_err(|e| AuthError::Signing(e.to_string()))
    }

    async fn verify_call_token(&self, token: &str) -> Result<IdentityClaims, AuthError> {
        let claims = decode::<CallClaims>(
            token,
            &self.session_decoding,
            &Validation::new(Algorithm::HS256),
        )
        .map_err(map_jwt_error)?
        .claims;

        if claims.kind != CALL_KIND {
            return Err(AuthError::Invalid("not a call credential".to_string()));
        }

        Ok(IdentityClaims {
            uid: claims.sub,
            email: String::new(),
            name: None,
        })
    }
}
