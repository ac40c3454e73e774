use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use sqlx::PgPool;
use std::net::TcpListener;

use crate::configuration::{GatewaySettings, JwtSettings};
use crate::error::{AppError, ValidationError};
use crate::gateway::{dispatch, gateway_root, GatewayState};
use crate::logger::RequestLogger;
use crate::middleware::JwtMiddleware;
use crate::routes::{current_user, health_check, login, refresh, register};

/// Malformed or incomplete JSON bodies get the same `{"error": ...}` shape
/// as every other failure.
fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        AppError::Validation(ValidationError::InvalidBody(err.to_string())).into()
    })
}

pub fn run_auth(
    listener: TcpListener,
    connection: PgPool,
    jwt_config: JwtSettings,
) -> Result<Server, std::io::Error> {
    let connection = web::Data::new(connection);
    let jwt_config_data = web::Data::new(jwt_config.clone());

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(connection.clone())
            .app_data(jwt_config_data.clone())
            .app_data(json_config())
            // Public surface
            .route("/health_check", web::get().to(health_check))
            .route("/auth/register", web::post().to(register))
            .route("/auth/login", web::post().to(login))
            .route("/auth/refresh", web::post().to(refresh))
            // Routes that verify their own bearer token
            .service(
                web::scope("/auth")
                    .wrap(JwtMiddleware::new(jwt_config.access_secret.clone()))
                    .route("/me", web::get().to(current_user)),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}

pub fn run_gateway(
    listener: TcpListener,
    settings: GatewaySettings,
) -> Result<Server, std::io::Error> {
    let state = web::Data::new(GatewayState::new(&settings));

    let server = HttpServer::new(move || {
        App::new()
            .wrap(RequestLogger)
            .app_data(state.clone())
            .route("/", web::get().to(gateway_root))
            .route("/health_check", web::get().to(health_check))
            // Everything else goes through classification and forwarding.
            .default_service(web::route().to(dispatch))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
