use std::sync::Arc;

use anyhow::Result;
use ephemera::{
    Config,
    ports::PortAllocator,
    provisioner::{Provisioner, ProvisionerConfig},
    server::{AppState, TaskServer},
    tasks::{docker::DockerRuntime, store::TaskStore},
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ephemera=debug,tower_http=debug")),
        )
        .init();

    let config = Config::from_env();
    let port_range = config.port_range()?;
    info!(
        bind_addr = %config.bind_addr,
        port_range = %port_range,
        port_pool = port_range.size(),
        stabilize_secs = config.stabilize_secs,
        "configuration loaded"
    );

    let runtime = DockerRuntime::connect()?;
    let store = Arc::new(TaskStore::new());
    let ports = Arc::new(PortAllocator::new(port_range, config.port_attempts));
    let provisioner = Provisioner::new(
        store,
        Arc::new(runtime),
        ports,
        ProvisionerConfig::from_config(&config),
    );

    let server = TaskServer::new(
        AppState::new(provisioner, &config.public_host),
        &config.bind_addr,
    );
    server.start_server().await?;

    Ok(())
}
