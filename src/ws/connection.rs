//! WebSocket Connection Management - Ciclo di vita di una connessione
//!
//! Ogni socket accettato viene diviso in due metà, ciascuna servita da un
//! task dedicato:
//! - listen_ws: legge i frame in ingresso e li passa agli event handler
//! - write_ws: serializza verso il client sia gli eventi diretti alla
//!   connessione sia il fan-out del canale broadcast dell'utente legato

use axum::extract::ws::Utf8Bytes;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, unbounded_channel};
use tokio::time::Duration;
use tokio::time::{interval, timeout};
use tokio_stream::StreamMap;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info, instrument, warn};

use crate::ws::{RATE_LIMITER_MILLIS, TIMEOUT_DURATION_SECONDS};
use crate::{
    AppState,
    dtos::{ClientEventDTO, ServerEventDTO},
    ws::{event_handlers::process_event, registry::InternalSignal},
};

pub async fn handle_socket(ws: WebSocket, state: Arc<AppState>) {
    // Dividiamo il WebSocket in due metà: sender e receiver
    let (ws_tx, ws_rx) = ws.split();

    // Canale unbounded per la comunicazione interna listener -> writer,
    // unbounded per non perdere segnali sotto carico
    let (int_tx, int_rx) = unbounded_channel::<InternalSignal>();

    // La connessione nasce in stato non autenticato
    let connection_id = state.connections.register(int_tx);
    info!(connection_id, "WebSocket connection established");

    // task in ascolto dei frame del client
    tokio::spawn(listen_ws(connection_id, ws_rx, state.clone()));

    // task che scrive verso il client (eventi diretti + fan-out broadcast)
    tokio::spawn(write_ws(connection_id, ws_tx, int_rx, state));
}

#[instrument(skip(websocket_tx, internal_rx, state), fields(connection_id))]
pub async fn write_ws(
    connection_id: u64,
    mut websocket_tx: SplitSink<WebSocket, Message>,
    mut internal_rx: UnboundedReceiver<InternalSignal>,
    state: Arc<AppState>,
) {
    info!("Write task started");

    // Sottoscrizioni broadcast correnti, chiave = user_id legato.
    // Normalmente al più una entry; la chiave esplicita rende il re-auth
    // (Unbind/Bind) una semplice remove/insert.
    let mut stream_map: StreamMap<i32, BroadcastStream<Arc<ServerEventDTO>>> = StreamMap::new();

    'external: loop {
        tokio::select! {
            Some((_, result)) = tokio_stream::StreamExt::next(&mut stream_map) => {
                match result {
                    Ok(event) => {
                        if send_event(&mut websocket_tx, &event).await.is_err() {
                            warn!("Failed to forward broadcast event, closing connection");
                            break 'external;
                        }
                    }
                    Err(e) => {
                        // receiver in ritardo sul canale broadcast, gli eventi
                        // persi non vengono recuperati (i messaggi restano nello store)
                        warn!("Broadcast receiver lagged: {:?}", e);
                    }
                }
            }

            signal = internal_rx.recv() => {
                match signal {
                    Some(InternalSignal::Shutdown) => {
                        info!("Shutdown signal received");
                        break 'external;
                    }
                    Some(InternalSignal::Bind(user_id)) => {
                        info!(user_id, "Subscribing to user broadcast channel");
                        let rx = state.user_channels.subscribe(&user_id);
                        stream_map.insert(user_id, BroadcastStream::new(rx));
                    }
                    Some(InternalSignal::Unbind(user_id)) => {
                        info!(user_id, "Dropping user broadcast subscription");
                        stream_map.remove(&user_id);
                    }
                    Some(InternalSignal::Event(event)) => {
                        if send_event(&mut websocket_tx, &event).await.is_err() {
                            error!("Failed to send event to client");
                            break 'external;
                        }
                    }
                    None => {
                        info!("Internal channel closed");
                        break 'external; // canale chiuso, quindi listener chiuso, quindi stacca tutto
                    }
                }
            }
        }
    }

    info!("Write task terminated");
}

#[instrument(skip(websocket_tx, event))]
async fn send_event(
    websocket_tx: &mut SplitSink<WebSocket, Message>,
    event: &ServerEventDTO,
) -> Result<(), axum::Error> {
    let json = serde_json::to_string(event).map_err(|e| {
        error!("Failed to serialize event: {:?}", e);
        axum::Error::new(e)
    })?;
    websocket_tx
        .send(Message::Text(Utf8Bytes::from(json)))
        .await
        .map_err(|e| {
            error!("Failed to send event through WebSocket: {:?}", e);
            e
        })
}

#[instrument(skip(websocket_rx, state), fields(connection_id))]
pub async fn listen_ws(
    connection_id: u64,
    mut websocket_rx: SplitStream<WebSocket>,
    state: Arc<AppState>,
) {
    info!("Listen task started");

    let mut rate_limiter = interval(Duration::from_millis(RATE_LIMITER_MILLIS));
    let timeout_duration = Duration::from_secs(TIMEOUT_DURATION_SECONDS);

    loop {
        match timeout(timeout_duration, StreamExt::next(&mut websocket_rx)).await {
            Ok(Some(msg_result)) => {
                rate_limiter.tick().await;

                let msg = match msg_result {
                    Ok(m) => m,
                    Err(e) => {
                        warn!("WebSocket error: {:?}", e);
                        break;
                    }
                };

                match msg {
                    Message::Text(text) => {
                        // Il boundary valida: frame fuori dall'unione chiusa
                        // degli eventi vengono scartati senza chiudere
                        if let Ok(event) = serde_json::from_str::<ClientEventDTO>(&text) {
                            process_event(&state, connection_id, event).await;
                        } else {
                            warn!("Failed to deserialize client event");
                        }
                    }
                    Message::Close(_) => {
                        info!("Close message received");
                        break;
                    }
                    _ => {}
                }
            }
            Ok(None) => {
                info!("WebSocket stream ended");
                break;
            }
            Err(_) => {
                warn!(
                    timeout_secs = TIMEOUT_DURATION_SECONDS,
                    "Connection timeout"
                );
                break;
            }
        }
    }

    // Cleanup: segnala il writer e togli la connessione dagli indici.
    // remove è idempotente, un doppio close resta un no-op.
    info!("Cleaning up connection");
    state
        .connections
        .send_signal(&connection_id, InternalSignal::Shutdown);
    state.connections.remove(&connection_id);
    info!("Listen task terminated");
}
