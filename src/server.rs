use std::{net::SocketAddr, sync::Arc};

use axum::{
    http::StatusCode,
    response::IntoResponse,
    routing::{get, get_service},
    Extension, Json, Router,
};
use serde::Serialize;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

use crate::{
    config::Config,
    error::Error,
    serial::{Connector, PortDescriptor, SystemConnector},
    websocket,
};

/// The default port to run the server on.
pub const DEFAULT_PORT: u16 = 8000;

async fn run(
    config: Config,
    port: Option<u16>,
    allocated_port: Option<oneshot::Sender<u16>>,
) -> Result<(), Error> {
    config.validate()?;

    let connector: Arc<dyn Connector> = Arc::new(SystemConnector::new(&config));

    let mut app = Router::new()
        .route("/ws/machine", get(websocket::ws_handler))
        .route("/api/ports", get(show_ports))
        .route("/config", get(show_config))
        .route("/version", get(show_version));

    if let Some(dir) = &config.static_dir {
        info!(?dir, "Serving static files");
        app = app.fallback(get_service(ServeDir::new(dir)).handle_error(static_error));
    }

    let app = app.layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            // Each websocket opens its ports through the connector
            .layer(Extension(connector))
            // The config should be known to the web server
            .layer(Extension(config)),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port.unwrap_or(0)));
    let server = axum::Server::try_bind(&addr)
        .map_err(|e| Error::Server(format!("Could not bind {addr}: {e}")))?
        .serve(app.into_make_service_with_connect_info::<SocketAddr>());
    let addr = server.local_addr();

    if let Some(port_reply) = allocated_port {
        if port_reply.send(addr.port()).is_err() {
            warn!("Nobody is waiting to hear which port was allocated");
        }
    }

    info!("listening on {}", addr);

    server.await.map_err(|e| Error::Server(e.to_string()))
}

/// Start the server on an arbitrary available port.
/// The port allocated will be sent on the provided channel.
pub async fn run_any_port(config: Config, allocated_port: oneshot::Sender<u16>) -> Result<(), Error> {
    run(config, None, Some(allocated_port)).await
}

/// Start the server on the given port.
pub async fn run_on_port(config: Config, port: u16) -> Result<(), Error> {
    run(config, Some(port), None).await
}

#[derive(Debug, Serialize)]
struct Ports {
    ports: Vec<PortDescriptor>,
}

async fn show_ports(Extension(connector): Extension<Arc<dyn Connector>>) -> impl IntoResponse {
    match tokio::task::spawn_blocking(move || connector.list_ports()).await {
        Ok(ports) => Ok(Json(Ports { ports })),
        Err(e) => {
            warn!(?e, "Listing ports failed");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

async fn show_config(Extension(config): Extension<Config>) -> impl IntoResponse {
    config.serialize_pretty()
}

async fn show_version() -> impl IntoResponse {
    format!("grbl-keel v{}\n", env!("CARGO_PKG_VERSION"))
}

async fn static_error(e: std::io::Error) -> impl IntoResponse {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Could not serve file: {e}"),
    )
}
