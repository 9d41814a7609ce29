use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use super::{DeleteSummary, Store, StoreError};
use crate::models::feedback::{CategoryScore, Feedback, NewFeedback};
use crate::models::interview::{Interview, NewInterview};
use crate::models::user::User;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct FeedbackRow {
    id: Uuid,
    interview_id: Uuid,
    user_id: String,
    total_score: i16,
    categories: Json<Vec<CategoryScore>>,
    strengths: Vec<String>,
    areas_for_improvement: Vec<String>,
    final_assessment: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<FeedbackRow> for Feedback {
    type Error = StoreError;

    fn try_from(row: FeedbackRow) -> Result<Self, Self::Error> {
        let total_score = u8::try_from(row.total_score)
            .map_err(|_| StoreError::Corrupt(format!("feedback {} total_score", row.id)))?;
        Ok(Feedback {
            id: row.id,
            interview_id: row.interview_id,
            user_id: row.user_id,
            total_score,
            categories: row.categories.0,
            strengths: row.strengths,
            areas_for_improvement: row.areas_for_improvement,
            final_assessment: row.final_assessment,
            created_at: row.created_at,
        })
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|d| d.is_unique_violation())
        .unwrap_or(false)
}

#[async_trait]
impl Store for PgStore {
    async fn insert_user(&self, user: &User) -> Result<User, StoreError> {
        sqlx::query_as::<_, User>(
            "INSERT INTO users (id, name, email, created_at) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(
                    "A user with the given credentials already exists! Please sign in instead."
                        .to_string(),
                )
            } else {
                StoreError::Database(e)
            }
        })
    }

    async fn find_user(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(
            sqlx::query_as::<_, User>("SELECT * FROM users WHERE lower(email) = lower($1)")
                .bind(email)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn insert_interview(&self, interview: NewInterview) -> Result<Interview, StoreError> {
        let row = sqlx::query_as::<_, Interview>(
            r#"
            INSERT INTO interviews
                (id, user_id, interview_type, job_role, experience_level,
                 tech_stack, question_count, questions, cover_image_url, finalized)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&interview.user_id)
        .bind(&interview.interview_type)
        .bind(&interview.job_role)
        .bind(&interview.experience_level)
        .bind(&interview.tech_stack)
        .bind(interview.question_count)
        .bind(&interview.questions)
        .bind(&interview.cover_image_url)
        .bind(interview.finalized)
        .fetch_one(&self.pool)
        .await?;

        info!("Inserted interview {} for user {}", row.id, row.user_id);
        Ok(row)
    }

    async fn interviews_by_owner(&self, owner: &str) -> Result<Vec<Interview>, StoreError> {
        Ok(sqlx::query_as::<_, Interview>(
            "SELECT * FROM interviews WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(owner)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn latest_interviews(
        &self,
        exclude_owner: &str,
        limit: usize,
    ) -> Result<Vec<Interview>, StoreError> {
        Ok(sqlx::query_as::<_, Interview>(
            r#"
            SELECT * FROM interviews
            WHERE finalized AND user_id <> $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(exclude_owner)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn interview_by_id(&self, id: Uuid) -> Result<Option<Interview>, StoreError> {
        Ok(
            sqlx::query_as::<_, Interview>("SELECT * FROM interviews WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?,
        )
    }

    async fn upsert_feedback(&self, feedback: NewFeedback) -> Result<Feedback, StoreError> {
        let row = sqlx::query_as::<_, FeedbackRow>(
            r#"
            INSERT INTO feedback
                (id, interview_id, user_id, total_score, categories,
                 strengths, areas_for_improvement, final_assessment)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (interview_id, user_id) DO UPDATE SET
                id = EXCLUDED.id,
                total_score = EXCLUDED.total_score,
                categories = EXCLUDED.categories,
                strengths = EXCLUDED.strengths,
                areas_for_improvement = EXCLUDED.areas_for_improvement,
                final_assessment = EXCLUDED.final_assessment,
                created_at = now()
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(feedback.interview_id)
        .bind(&feedback.user_id)
        .bind(i16::from(feedback.total_score))
        .bind(Json(&feedback.categories))
        .bind(&feedback.strengths)
        .bind(&feedback.areas_for_improvement)
        .bind(&feedback.final_assessment)
        .fetch_one(&self.pool)
        .await?;

        info!(
            "Stored feedback {} for interview {} (user {})",
            row.id, row.interview_id, row.user_id
        );
        row.try_into()
    }

    async fn feedback_for(
        &self,
        interview_id: Uuid,
        user_id: &str,
    ) -> Result<Option<Feedback>, StoreError> {
        sqlx::query_as::<_, FeedbackRow>(
            "SELECT * FROM feedback WHERE interview_id = $1 AND user_id = $2 LIMIT 1",
        )
        .bind(interview_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Feedback::try_from)
        .transpose()
    }

    async fn delete_user_cascade(&self, user_id: &str) -> Result<DeleteSummary, StoreError> {
        let mut tx = self.pool.begin().await?;

        let feedback = sqlx::query("DELETE FROM feedback WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let interviews = sqlx::query("DELETE FROM interviews WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        let user = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        let summary = DeleteSummary {
            feedback_deleted: feedback.rows_affected(),
            interviews_deleted: interviews.rows_affected(),
            user_deleted: user.rows_affected() > 0,
        };
        info!("Deleted user {user_id} and owned records: {summary:?}");
        Ok(summary)
    }
}
