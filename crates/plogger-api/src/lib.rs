//! Plogger API crate - axum HTTP server, flow handlers, session registry.
//!
//! Exposes the plogging flows (location extraction, place and route
//! recommendation, image chat, trash-bag evaluation, waste-bin lookup) plus
//! session management endpoints.

pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::{create_router, start_server};
pub use state::{AppState, SessionRegistry, DEFAULT_SESSION};
