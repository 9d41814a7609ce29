//! Voice-session seam. The hosted voice SDK runs in the browser; the server
//! decides which assistant it starts and receives its events over HTTP.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::call::events::EventHub;

const INTERVIEWER_NAME: &str = "Interviewer";
const INTERVIEWER_FIRST_MESSAGE: &str = "Hello! Thank you for taking the time to speak with me \
    today. I'm excited to learn more about you and your experience.";
/// `{{questions}}` is substituted by the voice SDK from `variable_values`.
const INTERVIEWER_SYSTEM_PROMPT: &str = r#"You are a professional job interviewer conducting a real-time voice interview with a candidate. Your goal is to assess their qualifications, motivation, and fit for the role.

Interview Guidelines:
Follow the structured question flow:
{{questions}}

Engage naturally and react appropriately:
Listen actively to responses and acknowledge them before moving forward.
Ask brief follow-up questions if a response is vague or requires more detail.
Keep the conversation flowing smoothly while maintaining control.

Be professional, yet warm and welcoming. Keep responses short and simple, as in a real voice conversation.

Conclude the interview properly:
Thank the candidate for their time.
Inform them that the company will reach out soon with feedback.
End the conversation on a polite and positive note."#;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VoiceError {
    #[error("voice session was already started")]
    AlreadyStarted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Assistant {
    /// Configured template workflow that collects interview details.
    Workflow { id: String },
    /// Fixed interviewer that walks through stored questions.
    Interviewer {
        name: String,
        #[serde(rename = "firstMessage")]
        first_message: String,
        #[serde(rename = "systemPrompt")]
        system_prompt: String,
    },
}

/// What the browser SDK is told to start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantConfig {
    pub assistant: Assistant,
    pub variable_values: BTreeMap<String, String>,
}

impl AssistantConfig {
    /// `authToken` is the bearer credential the workflow sends to the
    /// generation endpoint.
    pub fn workflow(
        assistant_id: &str,
        username: &str,
        user_id: &str,
        auth_token: Option<&str>,
    ) -> Self {
        let mut variable_values = BTreeMap::from([
            ("username".to_string(), username.to_string()),
            ("userId".to_string(), user_id.to_string()),
        ]);
        if let Some(token) = auth_token {
            variable_values.insert("authToken".to_string(), token.to_string());
        }
        Self {
            assistant: Assistant::Workflow {
                id: assistant_id.to_string(),
            },
            variable_values,
        }
    }

    pub fn interviewer(questions: &[String]) -> Self {
        Self {
            assistant: Assistant::Interviewer {
                name: INTERVIEWER_NAME.to_string(),
                first_message: INTERVIEWER_FIRST_MESSAGE.to_string(),
                system_prompt: INTERVIEWER_SYSTEM_PROMPT.to_string(),
            },
            variable_values: BTreeMap::from([(
                "questions".to_string(),
                format_questions(questions),
            )]),
        }
    }
}

/// `- question` lines joined by `\n`.
pub fn format_questions(questions: &[String]) -> String {
    questions
        .iter()
        .map(|q| format!("- {q}"))
        .collect::<Vec<_>>()
        .join("\n")
}

#[async_trait]
pub trait VoiceClient: Send + Sync {
    async fn start(&self, config: &AssistantConfig) -> Result<(), VoiceError>;

    /// Fire-and-forget termination request.
    fn stop(&self);

    fn events(&self) -> &EventHub;
}

/// Voice client whose SDK lives in the browser: `start` records the config the
/// browser must launch and `stop` raises a flag the browser polls for.
#[derive(Default)]
pub struct RelayVoiceClient {
    hub: EventHub,
    started: AtomicBool,
    stop_requested: AtomicBool,
}

impl RelayVoiceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VoiceClient for RelayVoiceClient {
    async fn start(&self, _config: &AssistantConfig) -> Result<(), VoiceError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(VoiceError::AlreadyStarted);
        }
        Ok(())
    }

    fn stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    fn events(&self) -> &EventHub {
        &self.hub
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_questions_render_as_dash_lines() {
        let questions = vec!["Why Rust?".to_string(), "What is a lifetime?".to_string()];
        assert_eq!(
            format_questions(&questions),
            "- Why Rust?\n- What is a lifetime?"
        );
        let config = AssistantConfig::interviewer(&questions);
        assert_eq!(
            config.variable_values["questions"],
            "- Why Rust?\n- What is a lifetime?"
        );
    }

    #[test]
    fn test_workflow_config_carries_user_variables() {
        let config = AssistantConfig::workflow("wf-1", "Ada", "u1", Some("call.jwt"));
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["assistant"]["kind"], "workflow");
        assert_eq!(json["assistant"]["id"], "wf-1");
        assert_eq!(json["variableValues"]["username"], "Ada");
        assert_eq!(json["variableValues"]["userId"], "u1");
        assert_eq!(json["variableValues"]["authToken"], "call.jwt");

        let bare = AssistantConfig::workflow("wf-1", "Ada", "u1", None);
        assert!(!bare.variable_values.contains_key("authToken"));
    }

    #[tokio::test]
    async fn test_relay_client_starts_once() {
        let client = RelayVoiceClient::new();
        let config = AssistantConfig::interviewer(&[]);
        assert!(client.start(&config).await.is_ok());
        assert_eq!(client.start(&config).await, Err(VoiceError::AlreadyStarted));
        assert!(!client.stop_requested());
        client.stop();
        assert!(client.stop_requested());
    }
}
