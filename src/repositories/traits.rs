//! Common repository traits
//!
//! This module defines the storage interfaces the real-time core depends on.
//! The relay never talks to a concrete backend: it sees a user directory and
//! a message store as trait objects, so the same core runs against MySQL in
//! production and against the in-memory backend in the test suite.

use async_trait::async_trait;
use std::fmt;

use crate::dtos::{CreateMessageDTO, CreateUserDTO};
use crate::entities::{Message, User};

/// Errore unificato dei backend storage
#[derive(Debug)]
pub enum StorageError {
    /// Errore del driver database sottostante
    Database(sqlx::Error),
    /// Violazione di unicità sull'email utente
    DuplicateEmail,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::Database(e) => write!(f, "database error: {}", e),
            StorageError::DuplicateEmail => write!(f, "email already registered"),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<sqlx::Error> for StorageError {
    fn from(err: sqlx::Error) -> Self {
        StorageError::Database(err)
    }
}

/// Directory utenti, ground truth per identità e ruolo
///
/// # Returns
/// Le lookup ritornano `Ok(None)` quando nessun utente corrisponde;
/// `Err` è riservato ai guasti del backend.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Crea un nuovo utente (password già hashata dal chiamante)
    async fn create(&self, data: &CreateUserDTO) -> Result<User, StorageError>;

    /// Lookup per chiave primaria
    async fn find_by_id(&self, user_id: i32) -> Result<Option<User>, StorageError>;

    /// Lookup per email, usata per risolvere gli identity claim
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;
}

/// Store dei messaggi diretti tra utenti
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persiste un nuovo messaggio e ritorna il record con id assegnato
    async fn insert(&self, data: &CreateMessageDTO) -> Result<Message, StorageError>;

    /// Conversazione completa tra due utenti, in entrambe le direzioni,
    /// ordinata dal più vecchio al più recente
    async fn find_conversation(
        &self,
        user_a: i32,
        user_b: i32,
    ) -> Result<Vec<Message>, StorageError>;

    /// Alza il flag di lettura su tutti i messaggi non letti da
    /// `from_user_id` verso `to_user_id`. Ritorna le righe modificate,
    /// zero incluso: l'operazione è idempotente.
    async fn mark_read(&self, from_user_id: i32, to_user_id: i32) -> Result<u64, StorageError>;

    /// Conteggio dei messaggi non letti destinati a `user_id`
    async fn count_unread(&self, user_id: i32) -> Result<i64, StorageError>;
}
