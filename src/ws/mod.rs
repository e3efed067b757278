//! WebSocket Module - Canale real-time della piattaforma
//!
//! Questo modulo gestisce le connessioni WebSocket per la comunicazione in
//! tempo reale tra clienti, vendor, supervisor e admin. Include:
//! - Gestione upgrade HTTP -> WebSocket (connessione accettata NON autenticata)
//! - Gestione connessioni (split sender/receiver, un task di lettura e uno di scrittura)
//! - Handler per eventi WebSocket (authenticate, messaggi, read receipt, allocazioni)
//! - Indici concorrenti per connessioni vive e fan-out per-utente

pub mod connection;
pub mod event_handlers;
pub mod fanout;
pub mod registry;

// Re-exports pubblici
pub use connection::handle_socket;
pub use fanout::UserChannelMap;
pub use registry::{ConnectionMap, InternalSignal};

use crate::AppState;
use axum::{
    extract::{State, ws::WebSocketUpgrade},
    response::Response,
};
use std::sync::Arc;

/// Capacità dei canali broadcast per-utente
pub const BROADCAST_CHANNEL_CAPACITY: usize = 128;
/// Intervallo minimo tra frame in ingresso sulla stessa connessione
pub const RATE_LIMITER_MILLIS: u64 = 25;
/// Una connessione senza traffico oltre questa soglia viene chiusa
pub const TIMEOUT_DURATION_SECONDS: u64 = 300;

/// Entry point per gestire richieste di upgrade WebSocket
/// Operazioni:
/// 1. Eseguire upgrade HTTP -> WebSocket (nessuna autenticazione qui)
/// 2. Passare la connessione ad handle_socket
///
/// A differenza delle route REST non c'è middleware JWT: la connessione
/// nasce non autenticata e viene legata ad un utente solo quando arriva
/// un evento authenticate valido.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}
