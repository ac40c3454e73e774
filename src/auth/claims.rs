/// JWT Claims structure
///
/// The payload shared by access and refresh tokens: the subject's id and
/// username plus the standard timestamps (RFC 7519).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, AuthError};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Username, relayed to backends as the `x-username` trusted header
    pub username: String,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    /// Issued at (Unix timestamp)
    pub iat: i64,
}

impl Claims {
    pub fn new(user_id: Uuid, username: String, expiry_seconds: i64) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            username,
            exp: now + expiry_seconds,
            iat: now,
        }
    }

    /// Extract the user ID from the claims.
    ///
    /// A malformed subject is treated like any other bad token.
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Auth(AuthError::InvalidToken))
    }

    pub fn is_expired(&self) -> bool {
        self.exp < chrono::Utc::now().timestamp()
    }

    /// Turn verified claims into the request-scoped identity handed to
    /// backends.
    pub fn identity(&self) -> Result<IdentityContext, AppError> {
        Ok(IdentityContext {
            user_id: self.user_id()?,
            username: self.username.clone(),
        })
    }
}

/// Verified identity derived from an access token. Lives for one request
/// and is injected toward backends as the `x-user-id` / `x-username`
/// trusted headers; never persisted.
#[derive(Debug, Clone)]
pub struct IdentityContext {
    pub user_id: Uuid,
    pub username: String,
}
