/// JWT Token Generation and Validation
///
/// Access and refresh tokens are both HS256 JWTs over the same claims,
/// signed with independent secrets. Verification fails closed: every
/// decode, signature, or expiry problem collapses into one generic error.

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use uuid::Uuid;

use crate::auth::claims::Claims;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError};

/// Generate a short-lived access token for a user
pub fn generate_access_token(
    user_id: Uuid,
    username: &str,
    config: &JwtSettings,
) -> Result<String, AppError> {
    sign(user_id, username, &config.access_secret, config.access_token_expiry)
}

/// Generate a long-lived refresh token for a user
pub fn generate_refresh_token(
    user_id: Uuid,
    username: &str,
    config: &JwtSettings,
) -> Result<String, AppError> {
    sign(user_id, username, &config.refresh_secret, config.refresh_token_expiry)
}

fn sign(
    user_id: Uuid,
    username: &str,
    secret: &str,
    expiry_seconds: i64,
) -> Result<String, AppError> {
    let claims = Claims::new(user_id, username.to_string(), expiry_seconds);

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
}

/// Validate an access token and extract its claims
pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    verify(token, secret).map_err(|e| {
        tracing::warn!("Access token rejected: {}", e);
        AppError::Auth(AuthError::InvalidToken)
    })
}

/// Validate a refresh token's signature and expiry.
///
/// Callers must consult the persisted store first; a valid signature alone
/// does not make a refresh token acceptable.
pub fn validate_refresh_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    verify(token, secret).map_err(|e| {
        tracing::warn!("Refresh token rejected: {}", e);
        AppError::Auth(AuthError::InvalidRefreshToken)
    })
}

fn verify(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::new(Algorithm::HS256);
    // Tokens die exactly at their expiry timestamp.
    validation.leeway = 0;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
}
