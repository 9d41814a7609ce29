// Shared prompt fragments. Each generator keeps its own prompts.rs alongside it.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Output is read aloud by a speech synthesizer.
pub const VOICE_SAFE_INSTRUCTION: &str = "\
    The text is going to be read by a voice assistant, so do not use \"/\" or \"*\" \
    or any other special characters which might break the voice assistant.";
