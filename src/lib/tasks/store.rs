use std::{collections::HashMap, sync::Arc};

use tokio::sync::{Mutex, RwLock};
use tracing::warn;
use uuid::Uuid;

use super::types::{Task, TaskError, TaskUpdate, WorkloadType};

/// In-memory task table shared by request handlers and pipelines.
///
/// The outer lock is only taken for writing when a task is inserted; each
/// task has its own mutex, so updates to different ids never contend.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<Uuid, Arc<Mutex<Task>>>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create_task(&self, workload_type: WorkloadType) -> Uuid {
        let mut tasks = self.tasks.write().await;
        let mut task = Task::new(workload_type);
        while tasks.contains_key(&task.id) {
            task.id = Uuid::new_v4();
        }
        let id = task.id;
        tasks.insert(id, Arc::new(Mutex::new(task)));
        id
    }

    pub async fn get_task(&self, id: Uuid) -> Result<Task, TaskError> {
        let entry = self.entry(id).await?;
        let task = entry.lock().await;
        Ok(task.clone())
    }

    pub async fn list_tasks(&self) -> Vec<Task> {
        let entries: Vec<_> = self.tasks.read().await.values().cloned().collect();
        let mut tasks = Vec::with_capacity(entries.len());
        for entry in entries {
            tasks.push(entry.lock().await.clone());
        }
        tasks.sort_by_key(|task| task.created_at);
        tasks
    }

    /// Applies `update` atomically and returns the resulting snapshot.
    pub async fn try_update_task(&self, id: Uuid, update: TaskUpdate) -> Result<Task, TaskError> {
        let entry = self.entry(id).await?;
        let mut task = entry.lock().await;
        task.apply(update)?;
        Ok(task.clone())
    }

    /// Same as [`try_update_task`](Self::try_update_task), but a rejected
    /// update is only logged. Pipelines use this so a store miss never
    /// takes them down.
    pub async fn update_task(&self, id: Uuid, update: TaskUpdate) {
        if let Err(err) = self.try_update_task(id, update).await {
            warn!(task = %id, error = %err, "task update dropped");
        }
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }

    async fn entry(&self, id: Uuid) -> Result<Arc<Mutex<Task>>, TaskError> {
        self.tasks
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(TaskError::NotFound(id))
    }
}
