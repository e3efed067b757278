//! In-memory storage - Backend volatile per sviluppo e test
//!
//! Replica il contratto dei backend MySQL senza database: vettori protetti
//! da mutex e contatori atomici per gli id. Selezionato con STORAGE=memory.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicI32, Ordering};

use super::{MessageStore, StorageError, UserDirectory};
use crate::dtos::{CreateMessageDTO, CreateUserDTO};
use crate::entities::{Message, User};

pub struct MemoryDirectory {
    users: Mutex<Vec<User>>,
    next_id: AtomicI32,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self {
            users: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(1),
        }
    }
}

impl Default for MemoryDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserDirectory for MemoryDirectory {
    async fn create(&self, data: &CreateUserDTO) -> Result<User, StorageError> {
        let mut users = self.users.lock().unwrap();

        // stessa semantica della unique key MySQL (collation case-insensitive)
        if users.iter().any(|u| u.email.eq_ignore_ascii_case(&data.email)) {
            return Err(StorageError::DuplicateEmail);
        }

        let user = User {
            user_id: self.next_id.fetch_add(1, Ordering::Relaxed),
            name: data.name.clone(),
            email: data.email.clone(),
            password: data.password.clone(),
            role: data.role,
            package: data.package.clone(),
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, user_id: i32) -> Result<Option<User>, StorageError> {
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.user_id == user_id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let users = self.users.lock().unwrap();
        Ok(users
            .iter()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }
}

pub struct MemoryMessageStore {
    messages: Mutex<Vec<Message>>,
    next_id: AtomicI32,
}

impl MemoryMessageStore {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            next_id: AtomicI32::new(1),
        }
    }
}

impl Default for MemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for MemoryMessageStore {
    async fn insert(&self, data: &CreateMessageDTO) -> Result<Message, StorageError> {
        let message = Message {
            message_id: self.next_id.fetch_add(1, Ordering::Relaxed),
            sender_id: data.sender_id,
            recipient_id: data.recipient_id,
            content: data.content.clone(),
            message_type: data.message_type,
            created_at: data.created_at,
            read: false,
        };
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn find_conversation(
        &self,
        user_a: i32,
        user_b: i32,
    ) -> Result<Vec<Message>, StorageError> {
        let messages = self.messages.lock().unwrap();
        let mut conversation: Vec<Message> = messages
            .iter()
            .filter(|m| {
                (m.sender_id == user_a && m.recipient_id == user_b)
                    || (m.sender_id == user_b && m.recipient_id == user_a)
            })
            .cloned()
            .collect();
        conversation.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then(a.message_id.cmp(&b.message_id))
        });
        Ok(conversation)
    }

    async fn mark_read(&self, from_user_id: i32, to_user_id: i32) -> Result<u64, StorageError> {
        let mut messages = self.messages.lock().unwrap();
        let mut updated = 0;
        for m in messages
            .iter_mut()
            .filter(|m| m.sender_id == from_user_id && m.recipient_id == to_user_id && !m.read)
        {
            m.read = true;
            updated += 1;
        }
        Ok(updated)
    }

    async fn count_unread(&self, user_id: i32) -> Result<i64, StorageError> {
        let messages = self.messages.lock().unwrap();
        Ok(messages
            .iter()
            .filter(|m| m.recipient_id == user_id && !m.read)
            .count() as i64)
    }
}
