// All LLM prompt constants for the generation module.
// Reuses cross-cutting fragments from llm_client::prompts.

/// System prompt for interview question generation.
pub const QUESTION_SYSTEM: &str = "You are an experienced technical recruiter preparing \
    questions for a spoken mock job interview.";

/// Question prompt template. Replace every `{placeholder}` before sending.
pub const QUESTION_PROMPT_TEMPLATE: &str = r#"Prepare questions for a job interview.
The job role is {job_role}.
The job experience level is {experience_level}.
The tech stack used in the job is: {tech_stack}.
The focus between behavioural and technical questions should lean towards: {interview_type}.
The amount of questions required is: {question_count}.
Please return only the questions, without any additional text.
{voice_safe_instruction}
Return the questions formatted like this:
["Question 1", "Question 2", "Question 3"]
"#;

/// System prompt for transcript scoring.
pub const FEEDBACK_SYSTEM: &str = "You are a professional interviewer analyzing a mock \
    interview. Your task is to evaluate the candidate based on structured categories.";

/// Feedback prompt template. Replace `{transcript}`, `{categories}` and
/// `{json_only}` before sending.
pub const FEEDBACK_PROMPT_TEMPLATE: &str = r#"You are an AI interviewer analyzing a mock interview. Your task is to evaluate the candidate based on structured categories. Be thorough and detailed in your analysis. Don't be lenient with the candidate. If there are mistakes or areas for improvement, point them out.

Transcript:
{transcript}

Please score the candidate from 0 to 100 in the following areas. Do not add categories other than the ones provided, and keep their names exactly as written:
{categories}

Return a JSON object with this EXACT schema (no extra fields):
{
  "totalScore": 0,
  "categories": [
    {"name": "Communication Skills", "score": 0, "comment": "..."}
  ],
  "strengths": ["..."],
  "areasForImprovement": ["..."],
  "finalAssessment": "..."
}
"categories" must contain exactly the five areas above, in that order. Every score is an integer from 0 to 100.

{json_only}"#;
