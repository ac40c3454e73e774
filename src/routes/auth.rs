/// Authentication Routes
///
/// Registration, login, token refresh, and current-user lookup for the
/// auth service. Credential failures are always reported with the same
/// generic message so callers cannot probe which accounts exist.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::auth::{
    find_refresh_token, generate_access_token, generate_refresh_token, hash_password,
    record_auth_attempt, save_refresh_token, validate_refresh_token, verify_password, AuthAction,
    Claims,
};
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, DatabaseError, ErrorContext, ValidationError};
use crate::validators::{is_valid_email, is_valid_username};

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email_or_username: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
pub struct UserResponse {
    pub id: String,
    pub username: String,
    pub email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserResponse,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
}

/// POST /auth/register
///
/// Creates an account. Duplicate email or username is reported up front
/// with a 400; tokens are not issued here — the client logs in next.
pub async fn register(
    form: web::Json<RegisterRequest>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_registration");

    let username = is_valid_username(&form.username)?;
    let email = is_valid_email(&form.email)?;
    let password_hash = hash_password(&form.password)?;

    let existing = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM users WHERE email = $1 OR username = $2",
    )
    .bind(&email)
    .bind(&username)
    .fetch_optional(pool.get_ref())
    .await?;

    if existing.is_some() {
        return Err(AppError::Validation(ValidationError::AlreadyInUse));
    }

    let user_id = Uuid::new_v4();
    sqlx::query(
        r#"
        INSERT INTO users (id, username, email, password_hash, created_at)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(user_id)
    .bind(&username)
    .bind(&email)
    .bind(&password_hash)
    .bind(Utc::now())
    .execute(pool.get_ref())
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "User registered successfully"
    );

    Ok(HttpResponse::Created().json(UserResponse {
        id: user_id.to_string(),
        username,
        email,
    }))
}

/// POST /auth/login
///
/// Authenticates by email or username, issues an access/refresh token
/// pair, persists the refresh token, and appends an audit record. Unknown
/// identifier and wrong password produce the identical response.
pub async fn login(
    form: web::Json<LoginRequest>,
    req: HttpRequest,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");
    let (ip_address, user_agent) = client_metadata(&req);

    if form.email_or_username.trim().is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField(
            "emailOrUsername",
        )));
    }
    if form.password.is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField("password")));
    }

    let identifier = form.email_or_username.trim();
    let user = sqlx::query_as::<_, (Uuid, String, String, String)>(
        "SELECT id, username, email, password_hash FROM users WHERE email = $1 OR username = $1",
    )
    .bind(identifier)
    .fetch_optional(pool.get_ref())
    .await?;

    let (user_id, username, email, password_hash) = match user {
        Some(user) => user,
        None => {
            record_auth_attempt(
                pool.get_ref(),
                None,
                AuthAction::LoginFailed,
                ip_address.as_deref(),
                user_agent.as_deref(),
            )
            .await?;
            return Err(AppError::Auth(AuthError::InvalidCredentials));
        }
    };

    if !verify_password(&form.password, &password_hash)? {
        record_auth_attempt(
            pool.get_ref(),
            Some(user_id),
            AuthAction::LoginFailed,
            ip_address.as_deref(),
            user_agent.as_deref(),
        )
        .await?;
        return Err(AppError::Auth(AuthError::InvalidCredentials));
    }

    let access_token = generate_access_token(user_id, &username, jwt_config.get_ref())?;
    let refresh_token = generate_refresh_token(user_id, &username, jwt_config.get_ref())?;

    save_refresh_token(
        pool.get_ref(),
        user_id,
        &refresh_token,
        jwt_config.refresh_token_expiry,
        user_agent.as_deref(),
        ip_address.as_deref(),
    )
    .await?;

    record_auth_attempt(
        pool.get_ref(),
        Some(user_id),
        AuthAction::LoginSuccess,
        ip_address.as_deref(),
        user_agent.as_deref(),
    )
    .await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "User logged in successfully"
    );

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
        user: UserResponse {
            id: user_id.to_string(),
            username,
            email,
        },
    }))
}

/// POST /auth/refresh
///
/// Mints a new access token for a persisted refresh token. The store is
/// consulted before any signature work: a token that was never issued (or
/// no longer has a row) fails even if it verifies against the refresh key.
/// The refresh token itself is left untouched and stays usable until its
/// own expiry.
pub async fn refresh(
    form: web::Json<RefreshRequest>,
    pool: web::Data<PgPool>,
    jwt_config: web::Data<JwtSettings>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("token_refresh");

    if form.refresh_token.is_empty() {
        return Err(AppError::Validation(ValidationError::EmptyField(
            "refreshToken",
        )));
    }

    let stored = find_refresh_token(pool.get_ref(), &form.refresh_token)
        .await?
        .ok_or(AppError::Auth(AuthError::InvalidRefreshToken))?;

    if stored.expires_at < Utc::now() {
        return Err(AppError::Auth(AuthError::InvalidRefreshToken));
    }

    let claims = validate_refresh_token(&form.refresh_token, &jwt_config.refresh_secret)?;
    let user_id = claims.user_id().map_err(|_| AppError::Auth(AuthError::InvalidRefreshToken))?;

    let access_token = generate_access_token(user_id, &claims.username, jwt_config.get_ref())?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = %user_id,
        "Access token refreshed"
    );

    Ok(HttpResponse::Ok().json(RefreshResponse { access_token }))
}

/// GET /auth/me
///
/// Returns the authenticated user's profile. Claims are injected by the
/// JWT middleware guarding this route.
pub async fn current_user(
    claims: web::ReqData<Claims>,
    pool: web::Data<PgPool>,
) -> Result<HttpResponse, AppError> {
    let user_id = claims.user_id()?;

    let user = sqlx::query_as::<_, (Uuid, String, String)>(
        "SELECT id, username, email FROM users WHERE id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool.get_ref())
    .await?
    .ok_or(AppError::Database(DatabaseError::NotFound))?;

    Ok(HttpResponse::Ok().json(UserResponse {
        id: user.0.to_string(),
        username: user.1,
        email: user.2,
    }))
}

fn client_metadata(req: &HttpRequest) -> (Option<String>, Option<String>) {
    let ip_address = req
        .connection_info()
        .realip_remote_addr()
        .map(|addr| addr.to_string());
    let user_agent = req
        .headers()
        .get(actix_web::http::header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.to_string());
    (ip_address, user_agent)
}
