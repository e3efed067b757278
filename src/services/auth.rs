//! Auth services - Registrazione e login utenti
//!
//! Il login emette il JWT che il client può ripresentare come token
//! opzionale nell'identity claim del canale WebSocket.

use axum::{
    extract::{Json, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::IntoResponse,
};
use axum_macros::debug_handler;
use std::sync::Arc;
use validator::Validate;

use crate::core::{AppError, AppState, encode_jwt};
use crate::dtos::{CreateUserDTO, LoginDTO, LoginResponseDTO, RegisterUserDTO, UserDTO};
use crate::entities::User;

#[debug_handler]
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterUserDTO>, // JSON body
) -> Result<Json<UserDTO>, AppError> {
    // Validazione con validator (formato email, lunghezza password, pacchetto)
    body.validate()?;

    if state.directory.find_by_email(&body.email).await?.is_some() {
        return Err(AppError::conflict("Email already registered"));
    }

    let password_hash = User::hash_password(&body.password)
        .map_err(|_| AppError::internal_server_error("Failed to hash password"))?;

    let new_user = CreateUserDTO {
        name: body.name,
        email: body.email,
        password: password_hash,
        role: body.role,
        package: body.package,
    };

    let created_user = state.directory.create(&new_user).await?;

    Ok(Json(UserDTO::from(created_user)))
}

#[debug_handler]
pub async fn login_user(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginDTO>, // JSON body
) -> Result<impl IntoResponse, AppError> {
    // Messaggio identico per email sconosciuta e password errata,
    // niente oracle di esistenza account
    let user = match state.directory.find_by_email(&body.email).await? {
        Some(user) => user,
        None => return Err(AppError::unauthorized("Email or password are not correct")),
    };

    if !user.verify_password(&body.password) {
        return Err(AppError::unauthorized("Email or password are not correct"));
    }

    let token = encode_jwt(user.email.clone(), user.user_id, &state.jwt_secret)?;

    let mut headers = HeaderMap::new();
    if let Ok(value) = HeaderValue::from_str(&format!("Bearer {}", token)) {
        headers.insert("Authorization", value);
    }

    let response = LoginResponseDTO {
        user: UserDTO::from(user),
        token,
    };

    Ok((StatusCode::OK, headers, Json(response)))
}
