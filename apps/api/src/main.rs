mod call;
mod config;
mod db;
mod errors;
mod generation;
mod llm_client;
mod models;
mod pages;
mod routes;
mod session;
mod state;
mod store;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::call::CallRegistry;
use crate::config::{Config, StoreBackend};
use crate::db::create_pool;
use crate::generation::feedback::GeneratorFeedbackSink;
use crate::llm_client::{LlmClient, TextGenerator};
use crate::routes::build_router;
use crate::session::identity::JwtIdentityProvider;
use crate::session::SessionStore;
use crate::state::AppState;
use crate::store::{MemoryStore, PgStore, Store};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Mockview API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize the repository
    let store: Arc<dyn Store> = match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres backend")?;
            Arc::new(PgStore::new(create_pool(url).await?))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    // Initialize LLM client
    let llm: Arc<dyn TextGenerator> = Arc::new(LlmClient::new(config.anthropic_api_key.clone()));
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    // Sessions verify provider ID tokens and issue 7-day cookies
    let identity = Arc::new(JwtIdentityProvider::new(
        &config.identity_token_secret,
        &config.session_secret,
    ));
    let sessions = SessionStore::new(identity.clone(), Arc::clone(&store), config.production);

    // Finished interview calls hand their transcript to the feedback generator;
    // generate calls get a call-scoped credential for the workflow
    let calls = CallRegistry::new(
        Arc::new(GeneratorFeedbackSink::new(Arc::clone(&store), Arc::clone(&llm))),
        identity,
        config.voice_workflow_assistant_id.clone(),
    );

    // Build app state
    let state = AppState {
        store,
        llm,
        sessions,
        calls,
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
