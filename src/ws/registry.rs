//! Connection registry - Indice delle connessioni vive
//!
//! Ogni connessione WebSocket accettata viene registrata qui con un id di
//! processo univoco. Il binding utente è nullable: si riempie al primo
//! authenticate andato a buon fine e può essere sostituito da un re-auth.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, instrument, warn};

use crate::dtos::ServerEventDTO;
use crate::entities::UserRole;

/// Segnali interni dal listener (o dagli handler) verso il write task
/// della stessa connessione
pub enum InternalSignal {
    /// Il listener ha chiuso, il write task deve terminare
    Shutdown,
    /// Sottoscrivi il canale broadcast dell'utente appena legato
    Bind(i32),
    /// Rimuovi la sottoscrizione del vecchio utente (re-auth su altro account)
    Unbind(i32),
    /// Evento destinato a questa sola connessione (ack, errori, push post-auth)
    Event(ServerEventDTO),
}

struct ConnectionEntry {
    tx: UnboundedSender<InternalSignal>,
    bound: Option<(i32, UserRole)>,
    opened_at: DateTime<Utc>,
}

pub struct ConnectionMap {
    connections: DashMap<u64, ConnectionEntry>,
    next_id: AtomicU64,
}

impl ConnectionMap {
    pub fn new() -> Self {
        ConnectionMap {
            connections: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registra una nuova connessione in stato non autenticato e
    /// ritorna il suo id
    #[instrument(skip(self, tx))]
    pub fn register(&self, tx: UnboundedSender<InternalSignal>) -> u64 {
        let connection_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.connections.insert(
            connection_id,
            ConnectionEntry {
                tx,
                bound: None,
                opened_at: Utc::now(),
            },
        );
        info!(connection_id, total = self.connections.len(), "Connection registered");
        connection_id
    }

    /// Rimuove la connessione da tutti gli indici. Idempotente: chiudere
    /// una connessione già chiusa è un no-op.
    #[instrument(skip(self), fields(connection_id))]
    pub fn remove(&self, connection_id: &u64) {
        if let Some((_, entry)) = self.connections.remove(connection_id) {
            let lifetime = Utc::now() - entry.opened_at;
            info!(
                connection_id,
                lifetime_secs = lifetime.num_seconds(),
                "Connection removed"
            );
        }
    }

    /// Lega la connessione ad un utente verificato. Un re-bind sostituisce
    /// l'identità precedente (account switch senza riconnessione).
    ///
    /// # Returns
    /// * `Some(previous)` - binding precedente (None al primo authenticate)
    /// * `None` - la connessione è già stata chiusa
    #[instrument(skip(self), fields(connection_id, user_id))]
    pub fn bind(
        &self,
        connection_id: &u64,
        user_id: i32,
        role: UserRole,
    ) -> Option<Option<(i32, UserRole)>> {
        match self.connections.get_mut(connection_id) {
            Some(mut entry) => {
                let previous = entry.bound.replace((user_id, role));
                info!(connection_id, user_id, ?previous, "Connection bound to user");
                Some(previous)
            }
            None => {
                warn!(connection_id, "Cannot bind: connection already closed");
                None
            }
        }
    }

    /// Identità legata alla connessione, None se non autenticata o chiusa
    pub fn bound_identity(&self, connection_id: &u64) -> Option<(i32, UserRole)> {
        self.connections
            .get(connection_id)
            .and_then(|entry| entry.bound)
    }

    /// Query pura, nessun side effect
    pub fn is_authenticated(&self, connection_id: &u64) -> bool {
        self.bound_identity(connection_id).is_some()
    }

    /// Invia un segnale interno al write task della connessione
    #[instrument(skip(self, signal), fields(connection_id))]
    pub fn send_signal(&self, connection_id: &u64, signal: InternalSignal) -> bool {
        if let Some(entry) = self.connections.get(connection_id) {
            if let Err(e) = entry.tx.send(signal) {
                warn!(connection_id, "Failed to send signal to connection: {:?}", e);
                false
            } else {
                true
            }
        } else {
            info!(connection_id, "Connection not found, signal not sent");
            false
        }
    }

    /// Scorciatoia per gli eventi destinati a questa sola connessione
    pub fn send_event(&self, connection_id: &u64, event: ServerEventDTO) -> bool {
        self.send_signal(connection_id, InternalSignal::Event(event))
    }

    /// Get the count of live connections
    #[allow(dead_code)]
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Default for ConnectionMap {
    fn default() -> Self {
        Self::new()
    }
}
