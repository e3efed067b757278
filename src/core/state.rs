//! Application State - Stato globale dell'applicazione
//!
//! Contiene i backend di storage, la configurazione di firma JWT e gli
//! indici in-memory delle connessioni WebSocket vive. Nessun singleton:
//! lo stato viene costruito in main e passato esplicitamente a route,
//! middleware e task delle connessioni.

use sqlx::MySqlPool;
use std::sync::Arc;

use crate::repositories::{
    MemoryDirectory, MemoryMessageStore, MessageRepository, MessageStore, UserDirectory,
    UserRepository,
};
use crate::ws::fanout::UserChannelMap;
use crate::ws::registry::ConnectionMap;

/// Stato globale condiviso tra route, middleware e task WebSocket
pub struct AppState {
    /// Directory utenti, ground truth per identità e ruolo
    pub directory: Arc<dyn UserDirectory>,

    /// Store persistente dei messaggi diretti
    pub messages: Arc<dyn MessageStore>,

    /// Secret key per JWT token
    pub jwt_secret: String,

    /// Indice delle connessioni vive, autenticate o meno
    /// Key: connection_id, Value: binding + canale segnali del write task
    pub connections: ConnectionMap,

    /// Canali broadcast per-utente usati per il fan-out verso tutte le
    /// connessioni vive di un destinatario
    pub user_channels: UserChannelMap,
}

impl AppState {
    /// Stato su MySQL: entrambi i backend condividono il pool fornito
    pub fn with_mysql(pool: MySqlPool, jwt_secret: String) -> Self {
        Self {
            directory: Arc::new(UserRepository::new(pool.clone())),
            messages: Arc::new(MessageRepository::new(pool)),
            jwt_secret,
            connections: ConnectionMap::new(),
            user_channels: UserChannelMap::new(),
        }
    }

    /// Stato su backend volatile, usato con STORAGE=memory e nei test
    pub fn in_memory(jwt_secret: String) -> Self {
        Self {
            directory: Arc::new(MemoryDirectory::new()),
            messages: Arc::new(MemoryMessageStore::new()),
            jwt_secret,
            connections: ConnectionMap::new(),
            user_channels: UserChannelMap::new(),
        }
    }
}
