use std::{sync::Arc, time::Duration};

use thiserror::Error;

use crate::{
    ports::{PortAllocator, PortError},
    tasks::{
        runtime::{ContainerRuntime, RuntimeError},
        store::TaskStore,
    },
};

/// Image and wiring for one workload type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadProfile {
    pub image: String,
    /// Container-side port the workload listens on, e.g. `80/tcp`.
    pub exposed_port: String,
    /// Overrides the image entrypoint when set.
    pub cmd: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profiles {
    pub desktop: WorkloadProfile,
    pub server: WorkloadProfile,
}

#[derive(Debug, Clone)]
pub struct ProvisionerConfig {
    pub profiles: Profiles,
    /// Grace period between container start and `Running`.
    pub stabilization: Duration,
}

/// Drives tasks from `Queued` to a terminal state. Cheap to clone; every
/// pipeline holds its own handle.
#[derive(Clone)]
pub struct Provisioner {
    pub(super) store: Arc<TaskStore>,
    pub(super) runtime: Arc<dyn ContainerRuntime>,
    pub(super) ports: Arc<PortAllocator>,
    pub(super) config: Arc<ProvisionerConfig>,
}

/// Failure of one pipeline step. Allocation failures and runtime create
/// failures both surface as `Create`.
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("image pull failed: {0}")]
    Pull(#[source] RuntimeError),

    #[error("container creation failed: {0}")]
    Create(String),

    #[error("container start failed: {0}")]
    Start(#[source] RuntimeError),
}

impl From<PortError> for ProvisionError {
    fn from(err: PortError) -> Self {
        ProvisionError::Create(err.to_string())
    }
}
