use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A generated interview. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Interview {
    #[serde(rename = "interviewId")]
    pub id: Uuid,
    pub user_id: String,
    pub interview_type: String,
    pub job_role: String,
    pub experience_level: String,
    pub tech_stack: Vec<String>,
    pub question_count: i32,
    pub questions: Vec<String>,
    #[serde(rename = "coverImageURL")]
    pub cover_image_url: String,
    pub finalized: bool,
    pub created_at: DateTime<Utc>,
}

/// Everything the question generator supplies; the store assigns id and timestamp.
#[derive(Debug, Clone)]
pub struct NewInterview {
    pub user_id: String,
    pub interview_type: String,
    pub job_role: String,
    pub experience_level: String,
    pub tech_stack: Vec<String>,
    pub question_count: i32,
    pub questions: Vec<String>,
    pub cover_image_url: String,
    pub finalized: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewType {
    Behavioural,
    Technical,
    Mixed,
}

impl InterviewType {
    /// Known spellings only; free-form types stay as stored text.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "behavioural" | "behavioral" => Some(InterviewType::Behavioural),
            "technical" => Some(InterviewType::Technical),
            "mixed" | "balanced" => Some(InterviewType::Mixed),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            InterviewType::Behavioural => "Behavioural",
            InterviewType::Technical => "Technical",
            InterviewType::Mixed => "Mixed",
        }
    }
}

/// Splits a comma-joined tech stack, trimming entries and keeping order.
pub fn split_tech_stack(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_tech_stack_preserves_order() {
        assert_eq!(split_tech_stack("Go,Postgres"), vec!["Go", "Postgres"]);
        assert_eq!(
            split_tech_stack(" React , Next.js,, TypeScript "),
            vec!["React", "Next.js", "TypeScript"]
        );
    }

    #[test]
    fn test_interview_type_accepts_us_spelling() {
        assert_eq!(
            InterviewType::parse("Behavioral"),
            Some(InterviewType::Behavioural)
        );
        assert_eq!(InterviewType::parse("technical"), Some(InterviewType::Technical));
        assert_eq!(InterviewType::parse("pairing"), None);
    }

    #[test]
    fn test_interview_serializes_wire_names() {
        let interview = Interview {
            id: Uuid::new_v4(),
            user_id: "u1".into(),
            interview_type: "technical".into(),
            job_role: "backend engineer".into(),
            experience_level: "mid".into(),
            tech_stack: vec!["Go".into()],
            question_count: 1,
            questions: vec!["Why Go?".into()],
            cover_image_url: "/covers/adobe.png".into(),
            finalized: true,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&interview).unwrap();
        assert!(json.get("interviewId").is_some());
        assert_eq!(json["coverImageURL"], "/covers/adobe.png");
        assert_eq!(json["techStack"][0], "Go");
    }
}
