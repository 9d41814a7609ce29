use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{DeleteSummary, Store, StoreError};
use crate::models::feedback::{Feedback, NewFeedback};
use crate::models::interview::{Interview, NewInterview};
use crate::models::user::User;

#[derive(Default)]
struct Collections {
    users: Vec<User>,
    interviews: Vec<Interview>,
    feedback: Vec<Feedback>,
}

/// In-process store. Records live in insertion order; listings sort newest first.
#[derive(Default)]
pub struct MemoryStore {
    data: RwLock<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest first. Ties on `created_at` resolve to the later insertion.
fn newest_first<'a>(iter: impl DoubleEndedIterator<Item = &'a Interview>) -> Vec<Interview> {
    let mut out: Vec<Interview> = iter.rev().cloned().collect();
    out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    out
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, user: &User) -> Result<User, StoreError> {
        let mut data = self.data.write().await;
        if data
            .users
            .iter()
            .any(|u| u.id == user.id || u.email.eq_ignore_ascii_case(&user.email))
        {
            return Err(StoreError::Duplicate(
                "A user with the given credentials already exists! Please sign in instead."
                    .to_string(),
            ));
        }
        data.users.push(user.clone());
        Ok(user.clone())
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        let data = self.data.read().await;
        Ok(data.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn insert_interview(&self, interview: NewInterview) -> Result<Interview, StoreError> {
        let row = Interview {
            id: Uuid::new_v4(),
            user_id: interview.user_id,
            interview_type: interview.interview_type,
            job_role: interview.job_role,
            experience_level: interview.experience_level,
            tech_stack: interview.tech_stack,
            question_count: interview.question_count,
            questions: interview.questions,
            cover_image_url: interview.cover_image_url,
            finalized: interview.finalized,
            created_at: Utc::now(),
        };
        self.data.write().await.interviews.push(row.clone());
        Ok(row)
    }

    async fn interviews_by_owner(&self, owner: &str) -> Result<Vec<Interview>, StoreError> {
        let data = self.data.read().await;
        Ok(newest_first(
            data.interviews.iter().filter(|i| i.user_id == owner),
        ))
    }

    async fn latest_interviews(
        &self,
        exclude_owner: &str,
        limit: usize,
    ) -> Result<Vec<Interview>, StoreError> {
        let data = self.data.read().await;
        let mut rows = newest_first(
            data.interviews
                .iter()
                .filter(|i| i.finalized && i.user_id != exclude_owner),
        );
        rows.truncate(limit);
        Ok(rows)
    }

    async fn interview_by_id(&self, id: Uuid) -> Result<Option<Interview>, StoreError> {
        let data = self.data.read().await;
        Ok(data.interviews.iter().find(|i| i.id == id).cloned())
    }

    async fn upsert_feedback(&self, feedback: NewFeedback) -> Result<Feedback, StoreError> {
        let row = Feedback {
            id: Uuid::new_v4(),
            interview_id: feedback.interview_id,
            user_id: feedback.user_id,
            total_score: feedback.total_score,
            categories: feedback.categories,
            strengths: feedback.strengths,
            areas_for_improvement: feedback.areas_for_improvement,
            final_assessment: feedback.final_assessment,
            created_at: Utc::now(),
        };

        let mut data = self.data.write().await;
        data.feedback
            .retain(|f| !(f.interview_id == row.interview_id && f.user_id == row.user_id));
        data.feedback.push(row.clone());
        Ok(row)
    }

    async fn feedback_for(
        &self,
        interview_id: Uuid,
        user_id: &str,
    ) -> Result<Option<Feedback>, StoreError> {
        let data = self.data.read().await;
        Ok(data
            .feedback
            .iter()
            .find(|f| f.interview_id == interview_id && f.user_id == user_id)
            .cloned())
    }

    async fn delete_user_cascade(&self, user_id: &str) -> Result<DeleteSummary, StoreError> {
        let mut data = self.data.write().await;

        let feedback_before = data.feedback.len();
        data.feedback.retain(|f| f.user_id != user_id);
        let interviews_before = data.interviews.len();
        data.interviews.retain(|i| i.user_id != user_id);
        let users_before = data.users.len();
        data.users.retain(|u| u.id != user_id);

        Ok(DeleteSummary {
            feedback_deleted: (feedback_before - data.feedback.len()) as u64,
            interviews_deleted: (interviews_before - data.interviews.len()) as u64,
            user_deleted: users_before != data.users.len(),
        })
    }
}
