/// Schema initialization for the auth service.
///
/// The service owns its tables and creates them on startup. The database
/// may come up after the service does, so initialization is retried with a
/// bounded number of attempts before the process gives up.

use sqlx::PgPool;
use std::time::Duration;

pub const SCHEMA_INIT_ATTEMPTS: u32 = 10;
pub const SCHEMA_INIT_DELAY: Duration = Duration::from_secs(3);

pub async fn init_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            username VARCHAR(50) UNIQUE NOT NULL,
            email VARCHAR(100) UNIQUE NOT NULL,
            password_hash VARCHAR(255) NOT NULL,
            bio TEXT NULL,
            avatar_url VARCHAR(255) NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS refresh_tokens (
            token_hash TEXT PRIMARY KEY,
            user_id UUID NOT NULL,
            user_agent VARCHAR(150) NULL,
            ip_address VARCHAR(64) NULL,
            expires_at TIMESTAMPTZ NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user_id ON refresh_tokens (user_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS auth_logs (
            id BIGSERIAL PRIMARY KEY,
            user_id UUID NULL,
            action VARCHAR(50) NOT NULL,
            ip_address VARCHAR(64) NULL,
            user_agent VARCHAR(150) NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Run `init_schema`, retrying on failure with a fixed delay.
///
/// Returns the last error once `attempts` have been exhausted; the caller
/// treats that as fatal.
pub async fn init_schema_with_retry(
    pool: &PgPool,
    attempts: u32,
    delay: Duration,
) -> Result<(), sqlx::Error> {
    let mut attempt = 1;
    loop {
        match init_schema(pool).await {
            Ok(()) => {
                tracing::info!("Database schema initialized");
                return Ok(());
            }
            Err(e) if attempt < attempts => {
                tracing::warn!(
                    attempt,
                    attempts,
                    error = %e,
                    "Schema initialization failed, retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                tracing::error!(attempts, error = %e, "Schema initialization failed");
                return Err(e);
            }
        }
    }
}
