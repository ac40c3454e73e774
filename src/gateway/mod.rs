/// Gateway Router
///
/// The single entry point of the system: classifies each inbound request
/// against a static route table, enforces the bearer-token contract on
/// protected prefixes, and forwards to the owning backend service.

mod dispatch;
mod forward;
mod routes;

pub use dispatch::dispatch;
pub use dispatch::gateway_root;
pub use dispatch::GatewayState;
pub use forward::ForwardClient;
pub use routes::rewrite_path;
pub use routes::ForwardMode;
pub use routes::Route;
pub use routes::RouteTable;
