use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One rubric line of a feedback record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryScore {
    pub name: String,
    pub score: u8,
    pub comment: String,
}

/// Rubric-scored evaluation of one interview transcript.
/// At most one exists per (interview_id, user_id).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feedback {
    #[serde(rename = "feedbackId")]
    pub id: Uuid,
    pub interview_id: Uuid,
    pub user_id: String,
    pub total_score: u8,
    pub categories: Vec<CategoryScore>,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub final_assessment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFeedback {
    pub interview_id: Uuid,
    pub user_id: String,
    pub total_score: u8,
    pub categories: Vec<CategoryScore>,
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub final_assessment: String,
}
