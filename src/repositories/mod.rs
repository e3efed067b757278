//! Repositories module - Coordinatore per i backend di storage
//!
//! Questo modulo organizza i backend in sotto-moduli separati.
//! Il core real-time dipende solo dai trait in `traits`: la scelta tra
//! MySQL e in-memory avviene una volta sola alla costruzione di AppState.

pub mod memory;
pub mod message;
pub mod traits;
pub mod user;

// Re-esportazione dei trait per facilitare l'import
pub use traits::{MessageStore, StorageError, UserDirectory};

// Re-esportazione delle struct dei repository per facilitare l'import
pub use memory::{MemoryDirectory, MemoryMessageStore};
pub use message::MessageRepository;
pub use user::UserRepository;
