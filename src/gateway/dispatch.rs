/// Request dispatch
///
/// The per-request pipeline: classify the path, authenticate when the
/// route demands it, then forward. Rejections happen locally, before any
/// backend sees the request.

use actix_web::{web, HttpRequest, HttpResponse};
use futures::StreamExt;

use crate::auth::{validate_access_token, IdentityContext};
use crate::configuration::GatewaySettings;
use crate::error::{AppError, AuthError, GatewayError, ValidationError};
use crate::gateway::forward::ForwardClient;
use crate::gateway::routes::{rewrite_path, ForwardMode, Route, RouteTable};

/// Shared gateway state: the immutable route table, the access-token
/// verification secret, and the pooled backend client. Nothing here is
/// mutated per request.
pub struct GatewayState {
    pub routes: RouteTable,
    pub client: ForwardClient,
    access_secret: String,
}

impl GatewayState {
    pub fn new(settings: &GatewaySettings) -> Self {
        Self {
            routes: RouteTable::from_settings(settings),
            client: ForwardClient::new(settings.forward_timeout_secs),
            access_secret: settings.jwt_access_secret.clone(),
        }
    }
}

/// Catch-all handler for every path the gateway does not serve itself.
pub async fn dispatch(
    req: HttpRequest,
    payload: web::Payload,
    state: web::Data<GatewayState>,
) -> Result<HttpResponse, AppError> {
    let route = state
        .routes
        .classify(req.path())
        .ok_or(AppError::Gateway(GatewayError::RouteNotFound))?;

    let identity = authenticate_if_required(&req, route, &state.access_secret)?;
    let target = target_url(route, &req);

    match route.mode {
        ForwardMode::Streaming => {
            state
                .client
                .forward_streaming(&req, payload, &target, identity.as_ref())
                .await
        }
        ForwardMode::Buffered => {
            let body = collect_body(payload).await?;
            state
                .client
                .forward_buffered(&req, body, &target, identity.as_ref())
                .await
        }
    }
}

/// GET / — liveness answer served by the gateway itself.
pub async fn gateway_root() -> HttpResponse {
    HttpResponse::Ok().json(serde_json::json!({ "message": "Gateway up" }))
}

/// Enforce the route's authentication requirement.
///
/// Protected routes demand a bearer token that verifies against the
/// access-signing secret; anything less is rejected here, with no
/// backend involved. Public routes carry no identity.
fn authenticate_if_required(
    req: &HttpRequest,
    route: &Route,
    access_secret: &str,
) -> Result<Option<IdentityContext>, AppError> {
    if !route.requires_auth {
        return Ok(None);
    }

    let token = bearer_token(req).ok_or(AppError::Auth(AuthError::MissingToken))?;
    let claims = validate_access_token(&token, access_secret)?;

    Ok(Some(claims.identity()?))
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.to_string())
}

/// Backend base URL + path with the route prefix rewritten + the original
/// query string, byte for byte (repeated keys included).
fn target_url(route: &Route, req: &HttpRequest) -> String {
    let mut target = format!("{}{}", route.backend, rewrite_path(req.path()));
    if !req.query_string().is_empty() {
        target.push('?');
        target.push_str(req.query_string());
    }
    target
}

async fn collect_body(mut payload: web::Payload) -> Result<web::Bytes, AppError> {
    let mut body = web::BytesMut::new();
    while let Some(chunk) = payload.next().await {
        let chunk = chunk
            .map_err(|e| AppError::Validation(ValidationError::InvalidBody(e.to_string())))?;
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}
