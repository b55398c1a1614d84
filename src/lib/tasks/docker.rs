use std::collections::HashMap;

use async_trait::async_trait;
use bollard::{
    Docker,
    container::{Config, CreateContainerOptions, InspectContainerOptions, StartContainerOptions},
    image::CreateImageOptions,
    models::{HostConfig, PortBinding, PortMap},
};
use futures_util::stream::StreamExt;
use tracing::{debug, info};

use super::runtime::{ContainerRuntime, ContainerSpec, RuntimeError};

/// [`ContainerRuntime`] backed by the local Docker Engine API.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    client: Docker,
}

impl DockerRuntime {
    pub fn connect() -> Result<Self, RuntimeError> {
        let client = Docker::connect_with_unix_defaults()
            .map_err(|e| RuntimeError::Connection(e.to_string()))?;
        Ok(DockerRuntime { client })
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        info!(image, "pulling image");

        let mut stream = self.client.create_image(
            Some(CreateImageOptions {
                from_image: image.to_string(),
                ..Default::default()
            }),
            None,
            None,
        );

        while let Some(msg) = stream.next().await {
            match msg {
                Ok(info) => {
                    if let Some(status) = info.status {
                        debug!(image, progress = info.progress.as_deref().unwrap_or(""), "{}", status);
                    }
                }
                Err(e) => {
                    return Err(RuntimeError::Pull {
                        image: image.to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(image, "image pulled");
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        let port_bindings: PortMap = HashMap::from([(
            spec.exposed_port.clone(),
            Some(vec![PortBinding {
                host_ip: Some("0.0.0.0".to_string()),
                host_port: Some(spec.host_port.to_string()),
            }]),
        )]);

        let host_config = HostConfig {
            port_bindings: Some(port_bindings),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(spec.image.clone()),
            cmd: spec.cmd.clone(),
            exposed_ports: Some(HashMap::from([(spec.exposed_port.clone(), HashMap::new())])),
            host_config: Some(host_config),
            ..Default::default()
        };

        let options = Some(CreateContainerOptions {
            name: spec.name.clone(),
            ..Default::default()
        });

        let response = self
            .client
            .create_container(options, container_config)
            .await
            .map_err(|e| RuntimeError::Create {
                name: spec.name.clone(),
                reason: e.to_string(),
            })?;

        info!(container = %response.id, name = %spec.name, host_port = spec.host_port, "container created");
        Ok(response.id)
    }

    async fn start_container(&self, handle: &str) -> Result<(), RuntimeError> {
        self.client
            .start_container(handle, None::<StartContainerOptions<String>>)
            .await
            .map_err(|e| RuntimeError::Start {
                handle: handle.to_string(),
                reason: e.to_string(),
            })?;

        info!(container = handle, "container started");
        Ok(())
    }

    async fn inspect(&self, handle: &str, exposed_port: &str) -> Result<Option<u16>, RuntimeError> {
        let details = self
            .client
            .inspect_container(handle, None::<InspectContainerOptions>)
            .await
            .map_err(|e| RuntimeError::Inspect {
                handle: handle.to_string(),
                reason: e.to_string(),
            })?;

        // Live bindings only exist once the container runs; fall back to
        // the requested ones.
        let live = details
            .network_settings
            .and_then(|settings| settings.ports)
            .and_then(|ports| bound_host_port(&ports, exposed_port));
        let requested = details
            .host_config
            .and_then(|config| config.port_bindings)
            .and_then(|ports| bound_host_port(&ports, exposed_port));

        Ok(live.or(requested))
    }
}

fn bound_host_port(ports: &PortMap, exposed_port: &str) -> Option<u16> {
    ports
        .get(exposed_port)?
        .as_ref()?
        .iter()
        .find_map(|binding| binding.host_port.as_deref()?.parse().ok())
}
