//! Enumerazioni - Tipi enumerati utilizzati nelle entità

use serde::{Deserialize, Serialize};

// ********************* ENUMERAZIONI UTILI **********************//

/// Ruolo piattaforma di un utente. Determina quali azioni privilegiate
/// può invocare sul canale real-time (es. allocazione supervisor).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "role", rename_all = "UPPERCASE")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Client,
    Vendor,
    Supervisor,
    Admin,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "message_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Text,
    Image,
    Document,
}

impl Default for MessageType {
    // i client che non specificano il tipo inviano testo semplice
    fn default() -> Self {
        MessageType::Text
    }
}
