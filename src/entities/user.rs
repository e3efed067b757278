//! User entity - Entità utente con metodi per gestione password

use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::enums::UserRole;

#[derive(Serialize, Deserialize, Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub user_id: i32,
    pub name: String,
    /// Email univoca, usata come identity claim sul canale WebSocket
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
    pub role: UserRole,
    /// Pacchetto matrimonio del cliente (silver/gold/platinum), NULL per gli altri ruoli
    pub package: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Verify if target_password matches the stored hashed password
    pub fn verify_password(&self, target_password: &str) -> bool {
        verify(target_password, &self.password).unwrap_or(false)
    }

    /// Hash a password using bcrypt with default cost
    pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
        let hash = hash(password, DEFAULT_COST)?;
        Ok(hash)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }
}
