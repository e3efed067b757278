//! Message DTOs - Data Transfer Objects per messaggi

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::{Message, MessageType};

/// Forma wire del record messaggio completo, inviata al destinatario
/// con l'evento receive_message e restituita dalle route REST di storico.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct MessageDTO {
    pub message_id: i32,
    pub sender_id: i32,
    pub recipient_id: i32,
    pub content: String,
    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
    pub read: bool,
}

impl From<Message> for MessageDTO {
    fn from(value: Message) -> Self {
        Self {
            message_id: value.message_id,
            sender_id: value.sender_id,
            recipient_id: value.recipient_id,
            content: value.content,
            message_type: value.message_type,
            created_at: value.created_at,
            read: value.read,
        }
    }
}

/// DTO per creare un nuovo messaggio lato repository (senza message_id)
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct CreateMessageDTO {
    pub sender_id: i32,
    pub recipient_id: i32,

    #[validate(length(min = 1, max = 5000, message = "Message content must be between 1 and 5000 characters"))]
    pub content: String,

    pub message_type: MessageType,
    pub created_at: DateTime<Utc>,
}
