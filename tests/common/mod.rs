use axum_test::TestServer;
use sehra_server::core::AppState;
use sehra_server::dtos::CreateUserDTO;
use sehra_server::entities::{User, UserRole};
use std::sync::Arc;

pub const TEST_JWT_SECRET: &str = "ilmiobellissimosegretochevaassolutamentecambiato";

/// Crea un AppState in-memory per i test
///
/// # Returns
/// Arc<AppState> configurato con il JWT secret di test, nessun database richiesto
pub fn create_test_state() -> Arc<AppState> {
    Arc::new(AppState::in_memory(TEST_JWT_SECRET.to_string()))
}

/// Crea un TestServer per i test
///
/// # Arguments
/// * `state` - AppState da utilizzare per il server
///
/// # Returns
/// TestServer configurato e pronto per eseguire richieste
pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = sehra_server::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Inserisce un utente nella directory di test.
/// La password memorizzata è un hash fittizio: sufficiente per i flussi
/// che autenticano via email/token, non per il login con password.
pub async fn seed_user(
    state: &Arc<AppState>,
    name: &str,
    email: &str,
    role: UserRole,
    package: Option<&str>,
) -> User {
    let dto = CreateUserDTO {
        name: name.to_string(),
        email: email.to_string(),
        password: "$2b$12$invalidinvalidinvalidinvalidinvalidinvalidinvalidinva".to_string(),
        role,
        package: package.map(str::to_string),
    };
    state
        .directory
        .create(&dto)
        .await
        .expect("Failed to seed test user")
}

/// Come seed_user, ma con una password reale hashata con bcrypt:
/// serve ai test di login
pub async fn seed_user_with_password(
    state: &Arc<AppState>,
    name: &str,
    email: &str,
    password: &str,
    role: UserRole,
) -> User {
    let dto = CreateUserDTO {
        name: name.to_string(),
        email: email.to_string(),
        password: User::hash_password(password).expect("Failed to hash test password"),
        role,
        package: None,
    };
    state
        .directory
        .create(&dto)
        .await
        .expect("Failed to seed test user")
}

/// Genera un JWT token per testing
///
/// # Arguments
/// * `user_id` - ID dell'utente per cui generare il token
/// * `email` - Email dell'utente
///
/// # Returns
/// Token JWT valido per 24 ore, firmato con il secret di test
pub fn create_test_jwt(user_id: i32, email: &str) -> String {
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, Serialize, Deserialize)]
    struct Claims {
        exp: usize,
        iat: usize,
        id: i32,
        email: String,
    }

    let now = Utc::now();
    let expiration = now
        .checked_add_signed(Duration::hours(24))
        .expect("valid timestamp")
        .timestamp() as usize;

    let claims = Claims {
        exp: expiration,
        iat: now.timestamp() as usize,
        id: user_id,
        email: email.to_string(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to create JWT token")
}
