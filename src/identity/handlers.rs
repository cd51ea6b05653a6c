// ============================================================================
// Identity handlers
// ============================================================================
//
// Endpoints:
// - POST /api/auth/register
// - POST /api/auth/login
//
// ============================================================================

use crate::identity::{store, validation, IdentityState};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use rand::rngs::OsRng;
use ripple_error::AppError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub success: bool,
    pub message: String,
    pub access_token: String,
    /// Access token expiration (Unix epoch seconds)
    pub expires_at: i64,
    pub user_id: String,
}

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<IdentityState>>,
    Json(request): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_registration(&request.username, &request.email, &request.password)?;

    if store::find_by_username_or_email(&state.pool, &request.username, &request.email)
        .await?
        .is_some()
    {
        tracing::warn!(username = %request.username, "registration for existing user");
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let password_hash = hash_password(&request.password)?;
    let role = request.role.as_deref().unwrap_or("user");

    let user = store::insert_user(
        &state.pool,
        &request.username,
        &request.email,
        &password_hash,
        role,
    )
    .await?;

    tracing::info!(user_id = %user.id, "user registered");

    let (access_token, expires_at) = state
        .auth_manager
        .create_token(&user.id, &user.role)
        .map_err(AppError::Unknown)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            success: true,
            message: "User registered successfully".to_string(),
            access_token,
            expires_at,
            user_id: user.id.to_string(),
        }),
    ))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<IdentityState>>,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    validation::validate_login(&request.email, &request.password)?;

    // Unknown email and wrong password produce the same rejection; which one
    // failed is visible only in logs.
    let user = match store::find_by_email(&state.pool, &request.email).await? {
        Some(user) => user,
        None => {
            tracing::warn!("login for unknown email");
            return Err(AppError::auth("invalid credentials"));
        }
    };

    if !verify_password(&request.password, &user.password_hash)? {
        tracing::warn!(user_id = %user.id, "login with wrong password");
        return Err(AppError::auth("invalid credentials"));
    }

    let (access_token, expires_at) = state
        .auth_manager
        .create_token(&user.id, &user.role)
        .map_err(AppError::Unknown)?;

    tracing::info!(user_id = %user.id, "user logged in");

    Ok(Json(AuthResponse {
        success: true,
        message: "User logged in successfully".to_string(),
        access_token,
        expires_at,
        user_id: user.id.to_string(),
    }))
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {}", e)))
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let parsed = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("stored password hash unreadable: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("hunter22").unwrap();
        assert!(verify_password("hunter22", &hash).unwrap());
        assert!(!verify_password("hunter23", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("hunter22").unwrap();
        let second = hash_password("hunter22").unwrap();
        assert_ne!(first, second);
    }
}
