use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use super::state::valid_state_transition;

/// Login baked into the server workload's startup command.
pub const SSH_USER: &str = "root";

/// Lifecycle of a provisioning attempt. `Running` and `Error` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Queued,
    Pulling,
    Creating,
    Starting,
    Running,
    Error,
}

impl Status {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Running | Status::Error)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::Queued => "Queued",
            Status::Pulling => "Pulling",
            Status::Creating => "Creating",
            Status::Starting => "Starting",
            Status::Running => "Running",
            Status::Error => "Error",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkloadType {
    Desktop,
    Server,
}

impl WorkloadType {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkloadType::Desktop => "desktop",
            WorkloadType::Server => "server",
        }
    }
}

impl fmt::Display for WorkloadType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadType {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "desktop" => Ok(WorkloadType::Desktop),
            "server" => Ok(WorkloadType::Server),
            other => Err(TaskError::UnknownWorkload(other.to_string())),
        }
    }
}

/// One provisioning attempt as seen by status queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub workload_type: WorkloadType,
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_detail: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The mutations a pipeline may apply to a task.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskUpdate {
    Advance(Status),
    AssignContainer { handle: String },
    AssignPort(u16),
    Fail(String),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(Uuid),

    #[error("unknown workload type: {0:?}")]
    UnknownWorkload(String),

    #[error("invalid transition for task {id}: {from} -> {to}")]
    InvalidTransition { id: Uuid, from: Status, to: Status },

    #[error("task {id} cannot take a container while {status}")]
    NotCreating { id: Uuid, status: Status },

    #[error("task {id} already has a {field} assigned")]
    AlreadyAssigned { id: Uuid, field: &'static str },
}

impl Task {
    pub fn new(workload_type: WorkloadType) -> Self {
        let now = Utc::now();
        Task {
            id: Uuid::new_v4(),
            workload_type,
            status: Status::Queued,
            container_handle: None,
            host_port: None,
            error_detail: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies `update`, leaving the task untouched if it would break the
    /// forward-only lifecycle or overwrite an assigned container.
    pub fn apply(&mut self, update: TaskUpdate) -> Result<(), TaskError> {
        match update {
            // Error carries a detail, so it only comes through Fail.
            TaskUpdate::Advance(next) => {
                if next == Status::Error || !valid_state_transition(&self.status, &next) {
                    return Err(self.invalid(next));
                }
                self.status = next;
            }
            TaskUpdate::AssignContainer { handle } => {
                self.ensure_creating()?;
                if self.container_handle.is_some() {
                    return Err(self.already_assigned("container"));
                }
                self.container_handle = Some(handle);
            }
            TaskUpdate::AssignPort(port) => {
                self.ensure_creating()?;
                if self.host_port.is_some() {
                    return Err(self.already_assigned("host port"));
                }
                self.host_port = Some(port);
            }
            TaskUpdate::Fail(detail) => {
                if !valid_state_transition(&self.status, &Status::Error) {
                    return Err(self.invalid(Status::Error));
                }
                self.status = Status::Error;
                self.error_detail = Some(detail);
            }
        }

        self.updated_at = Utc::now();
        Ok(())
    }

    /// Address a client uses to reach a running workload on `host`.
    pub fn endpoint(&self, host: &str) -> Option<String> {
        if self.status != Status::Running {
            return None;
        }
        let port = self.host_port?;
        Some(match self.workload_type {
            WorkloadType::Desktop => format!("http://{}:{}", host, port),
            WorkloadType::Server => format!("{}@{}:{}", SSH_USER, host, port),
        })
    }

    fn ensure_creating(&self) -> Result<(), TaskError> {
        if self.status != Status::Creating {
            return Err(TaskError::NotCreating {
                id: self.id,
                status: self.status,
            });
        }
        Ok(())
    }

    fn already_assigned(&self, field: &'static str) -> TaskError {
        TaskError::AlreadyAssigned { id: self.id, field }
    }

    fn invalid(&self, to: Status) -> TaskError {
        TaskError::InvalidTransition {
            id: self.id,
            from: self.status,
            to,
        }
    }
}
