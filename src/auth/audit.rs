/// Login audit trail
///
/// Append-only records of authentication attempts. Nothing in the services
/// reads these back; they exist for operators.

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthAction {
    LoginSuccess,
    LoginFailed,
}

impl AuthAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthAction::LoginSuccess => "LOGIN_SUCCESS",
            AuthAction::LoginFailed => "LOGIN_FAILED",
        }
    }
}

/// Append an audit row. `user_id` is `None` when the attempt did not match
/// any known account.
pub async fn record_auth_attempt(
    pool: &PgPool,
    user_id: Option<Uuid>,
    action: AuthAction,
    ip_address: Option<&str>,
    user_agent: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        INSERT INTO auth_logs (user_id, action, ip_address, user_agent, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(action.as_str())
    .bind(ip_address)
    .bind(user_agent)
    .bind(chrono::Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}
