use async_trait::async_trait;
use thiserror::Error;

/// Everything the runtime needs to instantiate one workload container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerSpec {
    pub name: String,
    pub image: String,
    /// Container-side port in runtime notation, e.g. `80/tcp`.
    pub exposed_port: String,
    pub cmd: Option<Vec<String>>,
    pub host_port: u16,
}

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("cannot reach container runtime: {0}")]
    Connection(String),

    #[error("pull of {image} failed: {reason}")]
    Pull { image: String, reason: String },

    #[error("create of {name} failed: {reason}")]
    Create { name: String, reason: String },

    #[error("start of {handle} failed: {reason}")]
    Start { handle: String, reason: String },

    #[error("inspect of {handle} failed: {reason}")]
    Inspect { handle: String, reason: String },
}

/// The container engine operations the provisioning pipeline relies on.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Ensures `image` is present locally. May take arbitrarily long.
    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError>;

    /// Creates (but does not start) a container and returns its handle.
    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError>;

    async fn start_container(&self, handle: &str) -> Result<(), RuntimeError>;

    /// Host port the runtime bound to `exposed_port`, if it reports one.
    async fn inspect(&self, handle: &str, exposed_port: &str) -> Result<Option<u16>, RuntimeError>;
}
