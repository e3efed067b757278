//! Services module - Coordinatore per i service handler HTTP
//!
//! Questo modulo organizza i service handlers in sotto-moduli separati.
//! Ogni modulo gestisce gli endpoint HTTP per una specifica funzionalità.

pub mod auth;
pub mod message;

// Re-exports per facilitare l'import
pub use auth::{login_user, register_user};
pub use message::{get_conversation, get_unread_count};

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse};
use std::sync::Arc;

/// Root endpoint - health check
pub async fn root(State(_state): State<Arc<AppState>>) -> impl IntoResponse {
    (StatusCode::OK, "Server is running!")
}
