// Interview generation: question lists before a call, scored feedback after it.
// All LLM calls go through llm_client.

pub mod feedback;
pub mod handlers;
pub mod prompts;
pub mod questions;
