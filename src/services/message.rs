//! Message services - Storico conversazioni e conteggio non letti
//!
//! Route REST di supporto al canale real-time: un client appena connesso
//! recupera di qua lo storico e il conteggio, poi resta aggiornato via
//! WebSocket.

use axum::{
    Extension,
    extract::{Json, Path, State},
};
use axum_macros::debug_handler;
use serde::Serialize;
use std::sync::Arc;

use crate::core::{AppError, AppState};
use crate::dtos::MessageDTO;
use crate::entities::User;

#[derive(Serialize)]
pub struct UnreadCountDTO {
    pub count: i64,
}

/// Conversazione completa tra l'utente autenticato e un altro utente,
/// in entrambe le direzioni, dal più vecchio al più recente
#[debug_handler]
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    Path(other_user_id): Path<i32>,
) -> Result<Json<Vec<MessageDTO>>, AppError> {
    if state.directory.find_by_id(other_user_id).await?.is_none() {
        return Err(AppError::not_found("User not found"));
    }

    let messages = state
        .messages
        .find_conversation(current_user.user_id, other_user_id)
        .await?;

    Ok(Json(messages.into_iter().map(MessageDTO::from).collect()))
}

/// Totale dei messaggi non letti destinati all'utente autenticato
#[debug_handler]
pub async fn get_unread_count(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
) -> Result<Json<UnreadCountDTO>, AppError> {
    let count = state.messages.count_unread(current_user.user_id).await?;
    Ok(Json(UnreadCountDTO { count }))
}
