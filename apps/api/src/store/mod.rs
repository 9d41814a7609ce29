//! Interview/Feedback repository.
//!
//! `Store` is the seam between handlers and persistence. `PgStore` backs
//! production; `MemoryStore` backs tests and `STORE_BACKEND=memory`.
//! Lookups return `Ok(None)` for missing records rather than an error.

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::feedback::{Feedback, NewFeedback};
use crate::models::interview::{Interview, NewInterview};
use crate::models::user::User;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Default bound for "interviews from other users" listings.
pub const DEFAULT_LISTING_LIMIT: usize = 20;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Duplicate(String),

    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Counts removed by `delete_user_cascade`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteSummary {
    pub feedback_deleted: u64,
    pub interviews_deleted: u64,
    pub user_deleted: bool,
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_user(&self, user: &User) -> Result<User, StoreError>;

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    async fn insert_interview(&self, interview: NewInterview) -> Result<Interview, StoreError>;

    /// Interviews owned by `owner`, newest first.
    async fn interviews_by_owner(&self, owner: &str) -> Result<Vec<Interview>, StoreError>;

    /// Finalized interviews NOT owned by `exclude_owner`, newest first, at most `limit`.
    async fn latest_interviews(
        &self,
        exclude_owner: &str,
        limit: usize,
    ) -> Result<Vec<Interview>, StoreError>;

    async fn interview_by_id(&self, id: Uuid) -> Result<Option<Interview>, StoreError>;

    /// Writes the feedback for (interview_id, user_id), replacing any earlier one.
    async fn upsert_feedback(&self, feedback: NewFeedback) -> Result<Feedback, StoreError>;

    async fn feedback_for(
        &self,
        interview_id: Uuid,
        user_id: &str,
    ) -> Result<Option<Feedback>, StoreError>;

    /// Removes the user's feedback, interviews and user record.
    async fn delete_user_cascade(&self, user_id: &str) -> Result<DeleteSummary, StoreError>;
}
