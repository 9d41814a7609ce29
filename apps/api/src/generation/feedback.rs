//! Feedback Generator: scores a transcript against the five fixed rubric
//! categories with one structured LLM call and stores the result.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::{AppError, Failure};
use crate::generation::prompts::{FEEDBACK_PROMPT_TEMPLATE, FEEDBACK_SYSTEM};
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{generate_json, TextGenerator};
use crate::models::feedback::{CategoryScore, Feedback, NewFeedback};
use crate::models::transcript::{render_transcript, TranscriptTurn};
use crate::store::Store;

/// Rubric categories, in display order. The model may not rename or extend them.
pub const FEEDBACK_CATEGORIES: [(&str, &str); 5] = [
    ("Communication Skills", "Clarity, articulation, structured responses."),
    ("Technical Knowledge", "Understanding of key concepts for the role."),
    ("Problem-Solving", "Ability to analyze problems and propose solutions."),
    ("Cultural & Role Fit", "Alignment with company values and job role."),
    ("Confidence & Clarity", "Confidence in responses, engagement, and clarity."),
];

const MAX_SCORE: i64 = 100;

#[derive(Debug, Clone)]
pub struct FeedbackRequest {
    pub interview_id: Uuid,
    pub user_id: String,
    pub transcript: Vec<TranscriptTurn>,
}

/// Shape the model is asked to return.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Assessment {
    total_score: i64,
    categories: Vec<RawCategory>,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    areas_for_improvement: Vec<String>,
    final_assessment: String,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    name: String,
    score: i64,
    #[serde(default)]
    comment: String,
}

/// "Cultural and Role Fit", "cultural & role-fit" and "Cultural & Role Fit" all match.
fn category_key(name: &str) -> String {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty() && !w.eq_ignore_ascii_case("and"))
        .map(str::to_lowercase)
        .collect()
}

fn checked_score(what: &str, score: i64) -> Result<u8, AppError> {
    if (0..=MAX_SCORE).contains(&score) {
        Ok(score as u8)
    } else {
        Err(AppError::Parse(format!("{what} score {score} is outside 0-100")))
    }
}

/// Enforces the fixed rubric: exactly the five categories, canonical names and
/// order, every score within 0-100.
fn validate_assessment(raw: Assessment) -> Result<(u8, Vec<CategoryScore>, Assessment), AppError> {
    let total = checked_score("total", raw.total_score)?;

    if raw.categories.len() != FEEDBACK_CATEGORIES.len() {
        return Err(AppError::Parse(format!(
            "expected {} categories, got {}",
            FEEDBACK_CATEGORIES.len(),
            raw.categories.len()
        )));
    }

    let mut categories = Vec::with_capacity(FEEDBACK_CATEGORIES.len());
    for (name, _) in FEEDBACK_CATEGORIES {
        let key = category_key(name);
        let found = raw
            .categories
            .iter()
            .find(|c| category_key(&c.name) == key)
            .ok_or_else(|| AppError::Parse(format!("category '{name}' is missing")))?;
        categories.push(CategoryScore {
            name: name.to_string(),
            score: checked_score(name, found.score)?,
            comment: found.comment.trim().to_string(),
        });
    }

    Ok((total, categories, raw))
}

pub fn build_feedback_prompt(transcript: &[TranscriptTurn]) -> String {
    let categories = FEEDBACK_CATEGORIES
        .iter()
        .map(|(name, description)| format!("- **{name}**: {description}"))
        .collect::<Vec<_>>()
        .join("\n");

    FEEDBACK_PROMPT_TEMPLATE
        .replace("{transcript}", &render_transcript(transcript))
        .replace("{categories}", &categories)
        .replace("{json_only}", JSON_ONLY_SYSTEM)
}

/// Scores the transcript and upserts the feedback for (interview, user).
pub async fn generate_feedback(
    store: &dyn Store,
    llm: &dyn TextGenerator,
    request: FeedbackRequest,
) -> Result<Feedback, AppError> {
    if request.user_id.trim().is_empty() || request.transcript.is_empty() {
        return Err(AppError::invalid_input("Missing required parameters!"));
    }

    if store.interview_by_id(request.interview_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Interview {} not found",
            request.interview_id
        )));
    }

    info!(
        "Scoring {} transcript turns for interview {} (user {})",
        request.transcript.len(),
        request.interview_id,
        request.user_id
    );

    let prompt = build_feedback_prompt(&request.transcript);
    let raw: Assessment = generate_json(llm, &prompt, FEEDBACK_SYSTEM).await?;
    let (total_score, categories, raw) = validate_assessment(raw).map_err(|e| {
        warn!("Feedback output rejected for interview {}: {e}", request.interview_id);
        e
    })?;

    let feedback = store
        .upsert_feedback(NewFeedback {
            interview_id: request.interview_id,
            user_id: request.user_id,
            total_score,
            categories,
            strengths: raw.strengths,
            areas_for_improvement: raw.areas_for_improvement,
            final_assessment: raw.final_assessment.trim().to_string(),
        })
        .await?;

    Ok(feedback)
}

/// Where a finished interview call hands its transcript.
#[async_trait]
pub trait FeedbackSink: Send + Sync {
    async fn submit(
        &self,
        interview_id: Uuid,
        user_id: &str,
        transcript: Vec<TranscriptTurn>,
    ) -> Result<Uuid, Failure>;
}

/// Production sink: runs the generator in-process.
pub struct GeneratorFeedbackSink {
    store: Arc<dyn Store>,
    llm: Arc<dyn TextGenerator>,
}

impl GeneratorFeedbackSink {
    pub fn new(store: Arc<dyn Store>, llm: Arc<dyn TextGenerator>) -> Self {
        Self { store, llm }
    }
}

#[async_trait]
impl FeedbackSink for GeneratorFeedbackSink {
    async fn submit(
        &self,
        interview_id: Uuid,
        user_id: &str,
        transcript: Vec<TranscriptTurn>,
    ) -> Result<Uuid, Failure> {
        generate_feedback(
            self.store.as_ref(),
            self.llm.as_ref(),
            FeedbackRequest {
                interview_id,
                user_id: user_id.to_string(),
                transcript,
            },
        )
        .await
        .map(|feedback| feedback.id)
        .map_err(|e| e.failure())
    }
}
