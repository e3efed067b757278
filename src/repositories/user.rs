//! UserRepository - Backend MySQL della directory utenti

use async_trait::async_trait;
use sqlx::MySqlPool;

use super::{StorageError, UserDirectory};
use crate::dtos::CreateUserDTO;
use crate::entities::User;

// USER REPO
pub struct UserRepository {
    connection_pool: MySqlPool,
}

impl UserRepository {
    pub fn new(connection_pool: MySqlPool) -> UserRepository {
        Self { connection_pool }
    }
}

#[async_trait]
impl UserDirectory for UserRepository {
    async fn create(&self, data: &CreateUserDTO) -> Result<User, StorageError> {
        let result = sqlx::query(
            "INSERT INTO users (name, email, password, role, package) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&data.name)
        .bind(&data.email)
        .bind(&data.password)
        .bind(data.role)
        .bind(&data.package)
        .execute(&self.connection_pool)
        .await
        .map_err(|e| {
            // la unique key sull'email vale quanto il check applicativo
            if e.as_database_error()
                .is_some_and(|dbe| dbe.is_unique_violation())
            {
                StorageError::DuplicateEmail
            } else {
                StorageError::Database(e)
            }
        })?;

        let new_id = result.last_insert_id() as i32;

        // rileggiamo la riga per avere il created_at assegnato dal database
        self.find_by_id(new_id)
            .await?
            .ok_or(StorageError::Database(sqlx::Error::RowNotFound))
    }

    async fn find_by_id(&self, user_id: i32) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, name, email, password, role, package, created_at \
             FROM users WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(user)
    }

    ///considero l'email univoca
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT user_id, name, email, password, role, package, created_at \
             FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.connection_pool)
        .await?;

        Ok(user)
    }
}
