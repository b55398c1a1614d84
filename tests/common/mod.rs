//! Shared helpers: a scriptable in-memory container runtime and a
//! provisioner wired to it.

#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use ephemera::{
    ports::{PortAllocator, PortRange},
    provisioner::{Profiles, Provisioner, ProvisionerConfig},
    server::{AppState, create_app},
    tasks::{
        runtime::{ContainerRuntime, ContainerSpec, RuntimeError},
        store::TaskStore,
        types::Task,
    },
};
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct FakeRuntime {
    pub fail_pull: bool,
    pub fail_create: bool,
    pub fail_start: bool,
    pub panic_on_start: bool,
    pub fail_inspect: bool,
    /// When set, `inspect` reports this instead of the requested port.
    pub inspect_port: Option<Option<u16>>,
    /// Applied to every pull/create/start call.
    pub step_delay: Duration,
    pub inspect_delay: Duration,
    pub created: Mutex<Vec<ContainerSpec>>,
    pub started: Mutex<Vec<String>>,
    pub pulls: AtomicUsize,
    pub next_handle: AtomicUsize,
}

impl FakeRuntime {
    pub fn healthy() -> Self {
        Self::default()
    }

    pub fn slow(step_delay: Duration) -> Self {
        FakeRuntime {
            step_delay,
            ..Self::default()
        }
    }

    pub fn created(&self) -> Vec<ContainerSpec> {
        self.created.lock().unwrap().clone()
    }

    pub fn started(&self) -> Vec<String> {
        self.started.lock().unwrap().clone()
    }

    async fn step(&self) {
        if !self.step_delay.is_zero() {
            tokio::time::sleep(self.step_delay).await;
        }
    }
}

#[async_trait]
impl ContainerRuntime for FakeRuntime {
    async fn pull_image(&self, image: &str) -> Result<(), RuntimeError> {
        self.step().await;
        self.pulls.fetch_add(1, Ordering::SeqCst);
        if self.fail_pull {
            return Err(RuntimeError::Pull {
                image: image.to_string(),
                reason: "manifest unknown".to_string(),
            });
        }
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, RuntimeError> {
        self.step().await;
        if self.fail_create {
            return Err(RuntimeError::Create {
                name: spec.name.clone(),
                reason: "port is already allocated".to_string(),
            });
        }
        let n = self.next_handle.fetch_add(1, Ordering::SeqCst);
        self.created.lock().unwrap().push(spec.clone());
        Ok(format!("fake-{}", n))
    }

    async fn start_container(&self, handle: &str) -> Result<(), RuntimeError> {
        self.step().await;
        if self.panic_on_start {
            panic!("runtime crashed");
        }
        if self.fail_start {
            return Err(RuntimeError::Start {
                handle: handle.to_string(),
                reason: "exec format error".to_string(),
            });
        }
        self.started.lock().unwrap().push(handle.to_string());
        Ok(())
    }

    async fn inspect(&self, handle: &str, _exposed_port: &str) -> Result<Option<u16>, RuntimeError> {
        if !self.inspect_delay.is_zero() {
            tokio::time::sleep(self.inspect_delay).await;
        }
        let inspect_err = || RuntimeError::Inspect {
            handle: handle.to_string(),
            reason: "no such container".to_string(),
        };
        if self.fail_inspect {
            return Err(inspect_err());
        }
        if let Some(port) = self.inspect_port {
            return Ok(port);
        }
        let index: usize = handle
            .strip_prefix("fake-")
            .and_then(|n| n.parse().ok())
            .ok_or_else(inspect_err)?;
        Ok(self.created.lock().unwrap().get(index).map(|spec| spec.host_port))
    }
}

pub const TEST_STABILIZATION: Duration = Duration::from_millis(20);

pub fn test_profiles() -> Profiles {
    Profiles::new("desktop:test", "server:test", "hunter2")
}

pub fn create_provisioner(runtime: Arc<FakeRuntime>, start: u16, end: u16) -> Provisioner {
    create_provisioner_with(runtime, start, end, TEST_STABILIZATION)
}

pub fn create_provisioner_with(
    runtime: Arc<FakeRuntime>,
    start: u16,
    end: u16,
    stabilization: Duration,
) -> Provisioner {
    let ports = PortAllocator::new(PortRange::new(start, end).unwrap(), 200);
    Provisioner::new(
        Arc::new(TaskStore::new()),
        runtime,
        Arc::new(ports),
        ProvisionerConfig {
            profiles: test_profiles(),
            stabilization,
        },
    )
}

pub fn create_test_app(provisioner: Provisioner) -> axum::Router {
    create_app(AppState::new(provisioner, "workloads.test"))
}

/// Polls until the task is terminal or five seconds pass.
/// Polls until `check` accepts the task or five seconds pass.
pub async fn wait_for_task<F>(store: &TaskStore, id: Uuid, check: F) -> Task
where
    F: Fn(&Task) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let task = store.get_task(id).await.expect("task exists");
        if check(&task) {
            return task;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {} never reached the expected state, last seen {}",
            id,
            task.status
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

pub async fn wait_for_terminal(store: &TaskStore, id: Uuid) -> Task {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let task = store.get_task(id).await.expect("task exists");
        if task.status.is_terminal() {
            return task;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {} stuck in {}",
            id,
            task.status
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

pub async fn extract_json_body<T>(response: axum::response::Response) -> T
where
    T: serde::de::DeserializeOwned,
{
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Failed to read response body");

    serde_json::from_slice(&body).expect("Failed to deserialize JSON")
}
