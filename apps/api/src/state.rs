use std::sync::Arc;

use crate::call::CallRegistry;
use crate::llm_client::TextGenerator;
use crate::session::SessionStore;
use crate::store::Store;

/// Shared application state injected into all route handlers via Axum extractors.
/// Every client is built once in `main`.
#[derive(Clone)]
pub struct AppState {
    /// Pluggable repository. `PgStore` in production, `MemoryStore` via STORE_BACKEND=memory.
    pub store: Arc<dyn Store>,
    pub llm: Arc<dyn TextGenerator>,
    pub sessions: SessionStore,
    pub calls: CallRegistry,
}
