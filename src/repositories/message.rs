//! MessageRepository - Backend MySQL dello store messaggi

use async_trait::async_trait;
use sqlx::MySqlPool;

use super::{MessageStore, StorageError};
use crate::dtos::CreateMessageDTO;
use crate::entities::Message;

// MESSAGE REPO
pub struct MessageRepository {
    connection_pool: MySqlPool,
}

impl MessageRepository {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self { connection_pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn insert(&self, data: &CreateMessageDTO) -> Result<Message, StorageError> {
        let result = sqlx::query(
            "INSERT INTO messages (sender_id, recipient_id, content, message_type, created_at, is_read) \
             VALUES (?, ?, ?, ?, ?, FALSE)",
        )
        .bind(data.sender_id)
        .bind(data.recipient_id)
        .bind(&data.content)
        .bind(data.message_type)
        .bind(data.created_at)
        .execute(&self.connection_pool)
        .await?;

        let new_id = result.last_insert_id() as i32;

        // Ritorna il record creato con il nuovo id, senza rileggere la riga
        Ok(Message {
            message_id: new_id,
            sender_id: data.sender_id,
            recipient_id: data.recipient_id,
            content: data.content.clone(),
            message_type: data.message_type,
            created_at: data.created_at,
            read: false,
        })
    }

    async fn find_conversation(
        &self,
        user_a: i32,
        user_b: i32,
    ) -> Result<Vec<Message>, StorageError> {
        let messages = sqlx::query_as::<_, Message>(
            "SELECT message_id, sender_id, recipient_id, content, message_type, created_at, is_read \
             FROM messages \
             WHERE (sender_id = ? AND recipient_id = ?) OR (sender_id = ? AND recipient_id = ?) \
             ORDER BY created_at ASC, message_id ASC",
        )
        .bind(user_a)
        .bind(user_b)
        .bind(user_b)
        .bind(user_a)
        .fetch_all(&self.connection_pool)
        .await?;

        Ok(messages)
    }

    async fn mark_read(&self, from_user_id: i32, to_user_id: i32) -> Result<u64, StorageError> {
        let result = sqlx::query(
            "UPDATE messages SET is_read = TRUE \
             WHERE sender_id = ? AND recipient_id = ? AND is_read = FALSE",
        )
        .bind(from_user_id)
        .bind(to_user_id)
        .execute(&self.connection_pool)
        .await?;

        Ok(result.rows_affected())
    }

    async fn count_unread(&self, user_id: i32) -> Result<i64, StorageError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM messages WHERE recipient_id = ? AND is_read = FALSE",
        )
        .bind(user_id)
        .fetch_one(&self.connection_pool)
        .await?;

        Ok(count)
    }
}
