//! Display helpers shared by the page views.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::feedback::Feedback;
use crate::models::interview::{Interview, InterviewType};

const TECH_ICONS_BASE_URL: &str = "https://cdn.jsdelivr.net/gh/devicons/devicon/icons";
const FALLBACK_TECH_ICON: &str = "/tech.svg";
const SUMMARY_MAX_CHARS: usize = 99;

const NOT_TAKEN_SUMMARY: &str = "You haven't taken this interview yet! Complete it to get \
    valuable feedback and improve your skills.";
const OTHERS_SUMMARY: &str = "Take the interview to sharpen your skills for real-world success!";

/// Normalized tech name → devicon directory.
const TECH_STACK_MAP: &[(&str, &str)] = &[
    ("angular", "angularjs"),
    ("aws", "amazonwebservices"),
    ("c#", "csharp"),
    ("c++", "cplusplus"),
    ("cpp", "cplusplus"),
    ("csharp", "csharp"),
    ("css", "css3"),
    ("css3", "css3"),
    ("django", "django"),
    ("docker", "docker"),
    ("express", "express"),
    ("firebase", "firebase"),
    ("flask", "flask"),
    ("git", "git"),
    ("go", "go"),
    ("golang", "go"),
    ("graphql", "graphql"),
    ("html", "html5"),
    ("html5", "html5"),
    ("java", "java"),
    ("javascript", "javascript"),
    ("js", "javascript"),
    ("kotlin", "kotlin"),
    ("kubernetes", "kubernetes"),
    ("mongo", "mongodb"),
    ("mongodb", "mongodb"),
    ("mysql", "mysql"),
    ("next", "nextjs"),
    ("node", "nodejs"),
    ("php", "php"),
    ("postgres", "postgresql"),
    ("postgresql", "postgresql"),
    ("python", "python"),
    ("react", "react"),
    ("reactnative", "react"),
    ("redis", "redis"),
    ("ruby", "ruby"),
    ("rust", "rust"),
    ("sass", "sass"),
    ("swift", "swift"),
    ("tailwind", "tailwindcss"),
    ("tailwindcss", "tailwindcss"),
    ("ts", "typescript"),
    ("typescript", "typescript"),
    ("vue", "vuejs"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TechIcon {
    pub tech: String,
    pub url: String,
}

/// Lowercase, drop a trailing `.js`, strip whitespace.
pub fn normalize_tech_name(tech: &str) -> String {
    let lower = tech.trim().to_lowercase();
    let base = lower.strip_suffix(".js").unwrap_or(&lower);
    base.chars().filter(|c| !c.is_whitespace()).collect()
}

pub fn tech_icons(tech_stack: &[String]) -> Vec<TechIcon> {
    tech_stack
        .iter()
        .map(|tech| {
            let key = normalize_tech_name(tech);
            let url = TECH_STACK_MAP
                .iter()
                .find(|(name, _)| *name == key)
                .map(|(_, icon)| format!("{TECH_ICONS_BASE_URL}/{icon}/{icon}-original.svg"))
                .unwrap_or_else(|| FALLBACK_TECH_ICON.to_string());
            TechIcon {
                tech: tech.clone(),
                url,
            }
        })
        .collect()
}

/// `MMM D, YYYY`, e.g. "Mar 7, 2026".
pub fn display_date(at: DateTime<Utc>) -> String {
    at.format("%b %-d, %Y").to_string()
}

/// Known types get their canonical label; anything mentioning "mix" reads as Mixed.
pub fn display_type(raw: &str) -> String {
    match InterviewType::parse(raw) {
        Some(kind) => kind.label().to_string(),
        None if raw.to_lowercase().contains("mix") => InterviewType::Mixed.label().to_string(),
        None => raw.to_string(),
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", text.chars().take(max_chars + 1).collect::<String>())
    } else {
        text.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Verdict {
    pub text: &'static str,
    pub color: &'static str,
}

pub fn final_verdict(total_score: u8) -> Verdict {
    match total_score {
        0..=19 => Verdict {
            text: "not recommended",
            color: "#f75353",
        },
        20..=49 => Verdict {
            text: "needs improvement",
            color: "#ffcc00",
        },
        50..=79 => Verdict {
            text: "recommended with reservations",
            color: "#ffcc00",
        },
        _ => Verdict {
            text: "definitely recommended",
            color: "#49de50",
        },
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewCard {
    pub interview_id: Uuid,
    pub job_role: String,
    pub interview_type: String,
    #[serde(rename = "coverImageURL")]
    pub cover_image_url: String,
    pub tech_icons: Vec<TechIcon>,
    pub display_date: String,
    pub score: String,
    pub summary: String,
    pub href: String,
    pub is_self_generated: bool,
}

impl InterviewCard {
    /// `feedback` is the viewer's feedback on their own interview, if any.
    pub fn new(interview: &Interview, feedback: Option<&Feedback>, is_self_generated: bool) -> Self {
        let feedback = feedback.filter(|_| is_self_generated);
        let summary = if is_self_generated {
            let text = feedback
                .map(|f| f.final_assessment.as_str())
                .filter(|s| !s.is_empty())
                .unwrap_or(NOT_TAKEN_SUMMARY);
            truncate(text, SUMMARY_MAX_CHARS)
        } else {
            OTHERS_SUMMARY.to_string()
        };
        let href = match feedback {
            Some(_) => format!("/interview/{}/feedback", interview.id),
            None => format!("/interview/{}", interview.id),
        };

        Self {
            interview_id: interview.id,
            job_role: interview.job_role.clone(),
            interview_type: display_type(&interview.interview_type),
            cover_image_url: interview.cover_image_url.clone(),
            tech_icons: tech_icons(&interview.tech_stack),
            display_date: display_date(feedback.map_or(interview.created_at, |f| f.created_at)),
            score: score_label(feedback.map(|f| f.total_score)),
            summary,
            href,
            is_self_generated,
        }
    }
}

/// A stored score of 0 is a real result and shows as `0/100`.
fn score_label(total_score: Option<u8>) -> String {
    match total_score {
        Some(score) => format!("{score}/100"),
        None => "N/A".to_string(),
    }
}
