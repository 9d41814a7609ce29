// Session Store Adapter: ID-token exchange, session cookie, current-user resolution.

pub mod handlers;
pub mod identity;
pub mod store;

pub use store::{CurrentUser, RequireUser, SessionStore, SESSION_COOKIE};
