//! User fan-out - Canali broadcast per-utente
//!
//! Un utente può avere zero o più connessioni vive (multi-tab, multi-device).
//! Ogni utente autenticato ha al più un canale broadcast: i write task delle
//! sue connessioni si sottoscrivono, e un singolo send raggiunge tutte le
//! connessioni vive. Un canale senza receiver viene rimosso pigramente al
//! prossimo send.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::sync::broadcast::{Receiver, Sender};
use tracing::{info, instrument, warn};

use crate::dtos::ServerEventDTO;
use crate::ws::BROADCAST_CHANNEL_CAPACITY;

pub struct UserChannelMap {
    /// Key: user_id, Value: testa tx del canale broadcast dell'utente
    channels: DashMap<i32, Sender<Arc<ServerEventDTO>>>,
}

impl UserChannelMap {
    pub fn new() -> Self {
        UserChannelMap {
            channels: DashMap::new(),
        }
    }

    /// Sottoscrive una connessione al canale dell'utente, creandolo se
    /// è la prima connessione viva
    #[instrument(skip(self), fields(user_id))]
    pub fn subscribe(&self, user_id: &i32) -> Receiver<Arc<ServerEventDTO>> {
        match self.channels.get(user_id) {
            None => {
                info!("Creating broadcast channel for user");
                // Arc<ServerEventDTO> per condividere il riferimento, non l'evento:
                // evitiamo copie inutili per ogni rx
                let (tx, rx) = broadcast::channel::<Arc<ServerEventDTO>>(BROADCAST_CHANNEL_CAPACITY);
                self.channels.insert(*user_id, tx);
                rx
            }
            Some(c) => {
                info!("Subscribing to existing broadcast channel");
                c.value().subscribe()
            }
        }
    }

    /// Fan-out di un evento a tutte le connessioni vive dell'utente.
    ///
    /// # Returns
    /// Numero di connessioni raggiunte. Zero se l'utente è offline: per i
    /// messaggi la durabilità è già garantita dallo store, per gli eventi
    /// di presenza il drop è voluto.
    #[instrument(skip(self, event), fields(user_id))]
    pub fn send(&self, user_id: &i32, event: Arc<ServerEventDTO>) -> usize {
        if let Some(channel) = self.channels.get(user_id) {
            match channel.send(event) {
                Ok(n) => {
                    info!(receivers = n, "Event fanned out to live connections");
                    n
                }
                Err(_) => {
                    warn!("No active receivers, removing channel");
                    // Nessuno sta ascoltando, rimuovi il channel
                    drop(channel); // Rilascia il lock
                    self.channels.remove(user_id);
                    0
                }
            }
        } else {
            info!("User has no live connections, event not delivered");
            0
        }
    }

    /// Check if a specific user has at least one live connection
    pub fn is_online(&self, user_id: &i32) -> bool {
        self.channels
            .get(user_id)
            .is_some_and(|c| c.receiver_count() > 0)
    }

    /// Numero di connessioni vive dell'utente
    #[allow(dead_code)]
    pub fn live_connections(&self, user_id: &i32) -> usize {
        self.channels
            .get(user_id)
            .map(|c| c.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for UserChannelMap {
    fn default() -> Self {
        Self::new()
    }
}
