//! WebSocket Event DTOs - Data Transfer Objects per eventi WebSocket
//!
//! Tagged union per gli eventi in entrambe le direzioni.
//! Serde serializza come:
//! { "type": "send_message", "data": { ... } }
//! oppure
//! { "type": "receive_message", "data": { ... } }
//! etc.
//!
//! Il payload di ogni evento è una variante chiusa validata al boundary:
//! un frame che non deserializza in una variante nota viene scartato
//! dal listener senza chiudere la connessione.

use serde::{Deserialize, Serialize};

use crate::dtos::MessageDTO;
use crate::entities::{MessageType, UserRole};

// ********************* EVENTI CLIENT -> SERVER **********************//

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientEventDTO {
    /// Identity claim: lega la connessione ad un utente della directory
    Authenticate(AuthenticateDTO),
    /// Invio messaggio diretto ad un altro utente
    SendMessage(SendMessageDTO),
    /// Marca come letti tutti i messaggi ricevuti da un mittente
    MarkMessagesRead(MarkMessagesReadDTO),
    /// Notifica di allocazione supervisor (solo admin)
    SupervisorAllocated(SupervisorAllocatedDTO),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct AuthenticateDTO {
    pub email: String,
    /// JWT opzionale emesso da POST /auth/login, se presente deve
    /// corrispondere all'email dichiarata
    pub token: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SendMessageDTO {
    pub to_user_id: i32,
    pub message: String,
    pub message_type: Option<MessageType>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MarkMessagesReadDTO {
    pub from_user_id: i32,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SupervisorAllocatedDTO {
    pub client_id: i32,
    pub supervisor_id: i32,
}

// ********************* EVENTI SERVER -> CLIENT **********************//

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEventDTO {
    /// Esito positivo dell'authenticate
    Authenticated {
        success: bool,
        user_id: i32,
        role: UserRole,
    },
    /// Claim rifiutato, la connessione resta utilizzabile per un retry
    AuthenticationError(String),
    /// Push di cortesia dopo l'authenticate
    UnreadCount { count: i64 },
    /// Nuovo messaggio in ingresso, record completo già persistito
    ReceiveMessage(MessageDTO),
    /// Ack di invio al mittente
    MessageSent { success: bool, message_id: i32 },
    /// Read receipt per il mittente originale
    MessageStatusUpdate { to_user_id: i32, read: bool },
    /// Ack del mark_messages_read al lettore
    MessagesMarkedRead { success: bool },
    /// Al cliente: gli è stato assegnato un supervisor
    SupervisorAssigned(AssignedPartyDTO),
    /// Al supervisor: gli è stato assegnato un cliente
    ClientAssigned(AssignedPartyDTO),
    /// Ack all'admin che ha invocato l'allocazione
    AllocationSuccess { success: bool },
    /// Errore generico riportato alla connessione che ha causato il problema
    Error(String),
}

/// Dati anagrafici della controparte in un evento di assegnazione
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AssignedPartyDTO {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    /// Solo per l'evento client_assigned: il pacchetto del cliente
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}
