use anyhow::{bail, Context, Result};

/// Which `Store` backend the server runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    /// Only read when `store_backend` is Postgres.
    pub database_url: Option<String>,
    pub anthropic_api_key: String,
    pub identity_token_secret: String,
    pub session_secret: String,
    pub voice_workflow_assistant_id: String,
    pub production: bool,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let store_backend = match std::env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => bail!("STORE_BACKEND must be 'postgres' or 'memory', got '{other}'"),
        };

        let database_url = match store_backend {
            StoreBackend::Postgres => Some(require_env("DATABASE_URL")?),
            StoreBackend::Memory => None,
        };

        Ok(Config {
            store_backend,
            database_url,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            identity_token_secret: require_env("IDENTITY_TOKEN_SECRET")?,
            session_secret: require_env("SESSION_SECRET")?,
            voice_workflow_assistant_id: require_env("VOICE_WORKFLOW_ASSISTANT_ID")?,
            production: std::env::var("APP_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
