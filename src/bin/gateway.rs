use std::net::TcpListener;

use feedgate::configuration::get_gateway_configuration;
use feedgate::startup::run_gateway;
use feedgate::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting gateway");

    let configuration = match get_gateway_configuration() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let address = format!("0.0.0.0:{}", configuration.port);
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Gateway listening on {}", address);

    let server = run_gateway(listener, configuration)?;
    server.await
}
