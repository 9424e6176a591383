pub mod auth;
pub mod authoring;
pub mod browse;
pub mod config;
pub mod contact;
pub mod error;
pub mod identity;
pub mod images;
pub mod models;
pub mod openapi;
pub mod profile;
pub mod rate_limit; // in-memory rate limiting
pub mod repo;
pub mod routes;
pub mod security;
pub mod session;
pub mod storage;

// Re-export commonly used items for tests / external users
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
pub use session::{SessionCache, SessionListener, SessionStore};
