use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::types::{ProvisionError, Provisioner, ProvisionerConfig};
use crate::{
    ports::PortAllocator,
    tasks::{
        runtime::{ContainerRuntime, ContainerSpec},
        store::TaskStore,
        types::{Status, Task, TaskUpdate, WorkloadType},
    },
};

impl Provisioner {
    pub fn new(
        store: Arc<TaskStore>,
        runtime: Arc<dyn ContainerRuntime>,
        ports: Arc<PortAllocator>,
        config: ProvisionerConfig,
    ) -> Self {
        Provisioner {
            store,
            runtime,
            ports,
            config: Arc::new(config),
        }
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn ports(&self) -> &Arc<PortAllocator> {
        &self.ports
    }

    /// Queues a new task and starts its pipeline in the background. Returns
    /// as soon as the task exists; progress is only visible through the
    /// store.
    pub async fn deploy(&self, workload: WorkloadType) -> Uuid {
        let id = self.store.create_task(workload).await;
        info!(task = %id, workload = %workload, "task queued");
        self.spawn(id);
        id
    }

    fn spawn(&self, id: Uuid) {
        let pipeline = self.clone();
        let handle = tokio::spawn(async move { pipeline.run(id).await });

        // A panicking pipeline must still leave its task terminal.
        let store = self.store.clone();
        tokio::spawn(async move {
            if let Err(err) = handle.await {
                error!(task = %id, error = %err, "provisioning pipeline aborted");
                store
                    .update_task(id, TaskUpdate::Fail(format!("provisioning aborted: {}", err)))
                    .await;
            }
        });
    }

    /// Runs the pipeline for a queued task to completion. Every failure
    /// ends up on the task as `Error`; nothing is returned to the caller.
    #[instrument(skip_all, fields(task = %id))]
    pub async fn run(&self, id: Uuid) {
        // Entering Pulling claims the task; a second run for the same id
        // is rejected by the store.
        let task = match self
            .store
            .try_update_task(id, TaskUpdate::Advance(Status::Pulling))
            .await
        {
            Ok(task) => task,
            Err(err) => {
                warn!(error = %err, "task not provisionable");
                return;
            }
        };

        match self.provision(&task).await {
            Ok(()) => info!(workload = %task.workload_type, "workload running"),
            Err(err) => {
                error!(error = %err, "provisioning failed");
                self.store
                    .update_task(id, TaskUpdate::Fail(err.to_string()))
                    .await;
            }
        }
    }

    async fn provision(&self, task: &Task) -> Result<(), ProvisionError> {
        let id = task.id;
        let profile = self.config.profiles.get(task.workload_type);

        info!(image = %profile.image, "pulling workload image");
        self.runtime
            .pull_image(&profile.image)
            .await
            .map_err(ProvisionError::Pull)?;

        self.advance(id, Status::Creating).await;
        let host_port = self.ports.allocate().await?;
        let spec = ContainerSpec {
            name: container_name(task),
            image: profile.image.clone(),
            exposed_port: profile.exposed_port.clone(),
            cmd: profile.cmd.clone(),
            host_port,
        };
        let handle = match self.runtime.create_container(&spec).await {
            Ok(handle) => handle,
            Err(err) => {
                self.ports.release(host_port);
                return Err(ProvisionError::Create(err.to_string()));
            }
        };
        self.store
            .update_task(
                id,
                TaskUpdate::AssignContainer {
                    handle: handle.clone(),
                },
            )
            .await;
        let bound_port = self.confirm_port(&handle, &spec).await;
        self.store
            .update_task(id, TaskUpdate::AssignPort(bound_port))
            .await;

        self.advance(id, Status::Starting).await;
        self.runtime
            .start_container(&handle)
            .await
            .map_err(ProvisionError::Start)?;

        // Approximate readiness: give in-container services time to come up.
        tokio::time::sleep(self.config.stabilization).await;

        self.advance(id, Status::Running).await;
        Ok(())
    }

    /// The runtime's view of the bound port wins over our allocation, and
    /// the reservation follows it.
    async fn confirm_port(&self, handle: &str, spec: &ContainerSpec) -> u16 {
        match self.runtime.inspect(handle, &spec.exposed_port).await {
            Ok(Some(port)) => {
                if port != spec.host_port {
                    warn!(requested = spec.host_port, bound = port, "runtime bound a different host port");
                    if !self.ports.rebind(spec.host_port, port) {
                        warn!(port, "bound host port was already reserved");
                    }
                }
                port
            }
            Ok(None) => spec.host_port,
            Err(err) => {
                warn!(error = %err, "inspect failed, keeping allocated port");
                spec.host_port
            }
        }
    }

    async fn advance(&self, id: Uuid, status: Status) {
        info!(%status, "task advanced");
        self.store.update_task(id, TaskUpdate::Advance(status)).await;
    }
}

fn container_name(task: &Task) -> String {
    let id = task.id.simple().to_string();
    format!("ephemera-{}-{}", task.workload_type, &id[..12])
}
