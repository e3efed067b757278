//! Entities module - Entità del dominio applicativo
//!
//! Questo modulo contiene tutte le entità (models) che rappresentano i dati persistiti.
//! Ogni entity corrisponde a una tabella nel database (o al suo equivalente in-memory).

pub mod enums;
pub mod message;
pub mod user;

// Re-exports per facilitare l'import
pub use enums::{MessageType, UserRole};
pub use message::Message;
pub use user::User;
