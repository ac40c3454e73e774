use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;

use feedgate::configuration::get_auth_configuration;
use feedgate::db::{init_schema_with_retry, SCHEMA_INIT_ATTEMPTS, SCHEMA_INIT_DELAY};
use feedgate::startup::run_auth;
use feedgate::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting auth service");

    let configuration = match get_auth_configuration() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    // Lazy pool: the database may still be starting. The schema pass below
    // is what actually exercises the connection, with bounded retries.
    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect_lazy(&configuration.database.connection_string())
        .map_err(|e| {
            tracing::error!("Invalid database configuration: {}", e);
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "Database configuration error")
        })?;

    init_schema_with_retry(&pool, SCHEMA_INIT_ATTEMPTS, SCHEMA_INIT_DELAY)
        .await
        .map_err(|e| {
            tracing::error!("Failed to initialize database after retries: {}", e);
            std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "Database init error")
        })?;

    let address = format!("0.0.0.0:{}", configuration.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Auth service listening on {}", address);

    let server = run_auth(listener, pool, configuration.jwt)?;
    server.await
}
