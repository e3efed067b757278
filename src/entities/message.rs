//! Message entity - Entità messaggio

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::MessageType;

/// Record persistito di un messaggio diretto tra due utenti.
/// Immutabile dopo la insert, con l'unica eccezione del flag di lettura
/// che viene alzato in blocco da mark_read.
#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct Message {
    pub message_id: i32,
    pub sender_id: i32,
    pub recipient_id: i32,
    pub content: String,
    // campo rinominato rispetto al wire perchè type è una parola protetta
    pub message_type: MessageType,
    // il server si aspetta una stringa litterale iso8601 che viene parsata in DateTime UTC
    pub created_at: DateTime<Utc>,
    /// Flag di lettura, colonna is_read perchè READ è riservata in MySQL
    #[sqlx(rename = "is_read")]
    pub read: bool,
}
