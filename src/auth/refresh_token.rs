/// Refresh Token Persistence
///
/// Every issued refresh token has exactly one row, keyed by the SHA-256
/// digest of the token string (never the plaintext). The store is the
/// authority on validity: a token with no row is invalid no matter how
/// good its signature looks, and refresh never rotates or rewrites a row.

use chrono::{DateTime, Duration, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

/// Hash a refresh token for use as its storage key.
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The persisted half of a refresh token.
#[derive(Debug, sqlx::FromRow)]
pub struct StoredRefreshToken {
    pub user_id: Uuid,
    pub expires_at: DateTime<Utc>,
}

/// Persist a freshly issued refresh token along with the agent and address
/// it was issued to.
///
/// Re-issuing an identical token string (same subject, same second) is a
/// no-op rather than a second row.
pub async fn save_refresh_token(
    pool: &PgPool,
    user_id: Uuid,
    token: &str,
    expiry_seconds: i64,
    user_agent: Option<&str>,
    ip_address: Option<&str>,
) -> Result<(), AppError> {
    let token_hash = hash_token(token);
    let expires_at = Utc::now() + Duration::seconds(expiry_seconds);

    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (token_hash, user_id, user_agent, ip_address, expires_at, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (token_hash) DO NOTHING
        "#,
    )
    .bind(token_hash)
    .bind(user_id)
    .bind(user_agent)
    .bind(ip_address)
    .bind(expires_at)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}

/// Look up a refresh token by its string value.
///
/// Returns `None` when the token was never issued (or has been removed) —
/// the caller must treat that as invalid without inspecting the signature.
pub async fn find_refresh_token(
    pool: &PgPool,
    token: &str,
) -> Result<Option<StoredRefreshToken>, AppError> {
    let token_hash = hash_token(token);

    let row = sqlx::query_as::<_, StoredRefreshToken>(
        r#"
        SELECT user_id, expires_at
        FROM refresh_tokens
        WHERE token_hash = $1
        "#,
    )
    .bind(token_hash)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}
