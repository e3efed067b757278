//! User DTOs - Data Transfer Objects per utenti

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::entities::{User, UserRole};

lazy_static! {
    /// Pacchetti matrimonio validi per i clienti
    static ref PACKAGE_RE: Regex = Regex::new(r"^(silver|gold|platinum)$").unwrap();
}

/// Struct per gestire io col client, la password non esce mai
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct UserDTO {
    pub user_id: i32,
    pub name: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub package: Option<String>,
}

impl From<User> for UserDTO {
    fn from(value: User) -> Self {
        Self {
            user_id: value.user_id,
            name: value.name,
            email: value.email,
            role: value.role,
            package: value.package,
        }
    }
}

/// Payload di registrazione, validato prima di toccare lo storage
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct RegisterUserDTO {
    #[validate(length(min = 1, max = 100, message = "Name must be between 1 and 100 characters"))]
    pub name: String,

    #[validate(email(message = "Invalid email address"))]
    pub email: String,

    // bcrypt tronca a 72 byte, non accettiamo password più lunghe
    #[validate(length(min = 8, max = 72, message = "Password must be between 8 and 72 characters"))]
    pub password: String,

    pub role: UserRole,

    #[validate(regex(path = *PACKAGE_RE, message = "Package must be silver, gold or platinum"))]
    pub package: Option<String>,
}

/// DTO per creare un nuovo utente lato repository (password già hashata)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CreateUserDTO {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
    pub package: Option<String>,
}

/// DTO per il login (solo email e password)
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginDTO {
    pub email: String,
    pub password: String,
}

/// Risposta di login: profilo pubblico + token da riusare sul canale WebSocket
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LoginResponseDTO {
    pub user: UserDTO,
    pub token: String,
}
