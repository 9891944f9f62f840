use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;

use crate::app::create_app;
use crate::configs::settings::Settings;
use crate::services::bus::{BusConnector, MemoryBus, MqttConnector};
use crate::services::{ModeService, RoomService, TopologyService};

pub mod app;
pub mod configs;
pub mod errors;
pub mod handles;
pub mod models;
pub mod services;
pub mod simulate;

pub async fn run(settings: &Arc<Settings>) -> anyhow::Result<()> {
    let connector: Arc<dyn BusConnector> = if settings.gateway.in_process {
        tracing::info!("using the in-process bus");
        Arc::new(MemoryBus::new())
    } else {
        tracing::info!("using the broker at {}:{}", settings.gateway.host, settings.gateway.port);
        Arc::new(MqttConnector::new(&settings.gateway))
    };

    let topology = Arc::new(TopologyService::new());
    let modes = Arc::new(ModeService::new(settings.simulation.global_mode));
    let rooms = Arc::new(RoomService::new(&topology, &modes, connector, &settings.simulation));

    let app = create_app(&topology, &modes, &rooms, &settings.server.static_dir);

    let ip_addr = settings
        .server
        .host
        .parse::<IpAddr>()
        .with_context(|| format!("invalid server host `{}`", settings.server.host))?;

    let address = SocketAddr::from((ip_addr, settings.server.port));

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;

    tracing::info!("listening on {:?}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    rooms.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for ctrl-c: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
