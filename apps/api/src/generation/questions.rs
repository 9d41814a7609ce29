//! Question Generator: one LLM call turns an interview request into an ordered
//! list of spoken-safe questions, persisted as a finalized Interview.

use rand::seq::SliceRandom;
use serde_json::Value;
use tracing::info;

use crate::errors::AppError;
use crate::generation::prompts::{QUESTION_PROMPT_TEMPLATE, QUESTION_SYSTEM};
use crate::llm_client::prompts::VOICE_SAFE_INSTRUCTION;
use crate::llm_client::{strip_json_fences, TextGenerator};
use crate::models::interview::{split_tech_stack, Interview, NewInterview};
use crate::store::Store;

/// Request fields in the order they are reported when missing.
pub const REQUIRED_FIELDS: [&str; 5] = [
    "interviewType",
    "jobRole",
    "experienceLevel",
    "techStack",
    "questionCount",
];

/// Characters a speech synthesizer stumbles over.
const FORBIDDEN_CHARS: [char; 2] = ['/', '*'];

const INTERVIEW_COVERS: [&str; 12] = [
    "adobe",
    "amazon",
    "facebook",
    "hostinger",
    "pinterest",
    "quora",
    "reddit",
    "skype",
    "spotify",
    "telegram",
    "tiktok",
    "yahoo",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRequest {
    pub interview_type: String,
    pub job_role: String,
    pub experience_level: String,
    /// Comma-joined, as collected by the voice workflow.
    pub tech_stack: String,
    pub question_count: usize,
    pub owner: String,
}

/// Absent, null, false, 0, empty or whitespace-only strings and [] are all
/// "missing". Blank text would otherwise reach the prompt as a real value.
fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) | Some(Value::Bool(false)) => false,
        Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(_) => true,
    }
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(items) => items
            .iter()
            .map(|v| v.as_str().map(str::trim))
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join(",")),
        _ => None,
    }
}

fn as_count(value: &Value) -> Option<usize> {
    let count = match value {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    count.filter(|n| *n > 0)
}

/// Validates a raw request body. `owner` comes from the verified credential,
/// never from the body.
pub fn parse_question_request(body: &Value, owner: &str) -> Result<QuestionRequest, AppError> {
    let missing: Vec<String> = REQUIRED_FIELDS
        .iter()
        .filter(|field| !is_present(body.get(**field)))
        .map(|field| field.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(AppError::missing_fields(missing));
    }
    if owner.trim().is_empty() {
        return Err(AppError::invalid_input("Owner identity is required"));
    }

    let text = |field: &str| {
        as_text(&body[field])
            .ok_or_else(|| AppError::invalid_input(format!("{field} must be a string")))
    };

    Ok(QuestionRequest {
        interview_type: text("interviewType")?,
        job_role: text("jobRole")?,
        experience_level: text("experienceLevel")?,
        tech_stack: text("techStack")?,
        question_count: as_count(&body["questionCount"]).ok_or_else(|| {
            AppError::invalid_input("questionCount must be a positive integer")
        })?,
        owner: owner.to_string(),
    })
}

pub fn build_question_prompt(request: &QuestionRequest) -> String {
    QUESTION_PROMPT_TEMPLATE
        .replace("{job_role}", &request.job_role)
        .replace("{experience_level}", &request.experience_level)
        .replace("{tech_stack}", &request.tech_stack)
        .replace("{interview_type}", &request.interview_type)
        .replace("{question_count}", &request.question_count.to_string())
        .replace("{voice_safe_instruction}", VOICE_SAFE_INSTRUCTION)
}

/// Parses the model's literal array of strings into exactly `count` questions.
pub fn parse_questions(text: &str, count: usize) -> Result<Vec<String>, AppError> {
    let raw: Vec<String> = serde_json::from_str(strip_json_fences(text))
        .map_err(|e| AppError::Parse(format!("questions are not an array of strings: {e}")))?;

    let mut questions: Vec<String> = raw
        .iter()
        .map(|q| {
            q.replace(FORBIDDEN_CHARS, " ")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
        })
        .filter(|q| !q.is_empty())
        .collect();

    if questions.len() < count {
        return Err(AppError::Parse(format!(
            "expected {count} questions, model returned {}",
            questions.len()
        )));
    }
    questions.truncate(count);
    Ok(questions)
}

pub fn random_cover_image() -> String {
    let name = INTERVIEW_COVERS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(INTERVIEW_COVERS[0]);
    format!("/covers/{name}.png")
}

/// Generates questions and stores the finalized interview.
pub async fn generate_interview(
    store: &dyn Store,
    llm: &dyn TextGenerator,
    request: QuestionRequest,
) -> Result<Interview, AppError> {
    info!(
        "Generating {} {} questions for {} ({})",
        request.question_count, request.interview_type, request.job_role, request.owner
    );

    let prompt = build_question_prompt(&request);
    let text = llm.generate(&prompt, QUESTION_SYSTEM).await?;
    let questions = parse_questions(&text, request.question_count)?;

    let interview = store
        .insert_interview(NewInterview {
            user_id: request.owner,
            interview_type: request.interview_type,
            job_role: request.job_role,
            experience_level: request.experience_level,
            tech_stack: split_tech_stack(&request.tech_stack),
            question_count: request.question_count as i32,
            questions,
            cover_image_url: random_cover_image(),
            finalized: true,
        })
        .await?;

    info!("Interview {} generated", interview.id);
    Ok(interview)
}
