use axum::{
    Json, Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    routing::{get, post},
};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::info;
use uuid::Uuid;

use super::types::{
    ApiError, ApiResult, AppState, DeployRequest, DeployResponse, TaskServer, TaskView,
};
use crate::{
    provisioner::Provisioner,
    tasks::types::{Task, WorkloadType},
};

impl AppState {
    pub fn new(provisioner: Provisioner, public_host: &str) -> Self {
        AppState {
            provisioner,
            public_host: public_host.to_string(),
        }
    }

    fn view(&self, task: Task) -> TaskView {
        let endpoint = task.endpoint(&self.public_host);
        TaskView { task, endpoint }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/deploy", post(TaskServer::deploy))
        .route("/status/{id}", get(TaskServer::status))
        .route("/tasks", get(TaskServer::list_tasks))
        .route("/health", get(TaskServer::health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

impl TaskServer {
    pub fn new(state: AppState, address: &str) -> Self {
        Self {
            state,
            address: address.to_string(),
        }
    }

    async fn deploy(
        State(state): State<AppState>,
        payload: Result<Json<DeployRequest>, JsonRejection>,
    ) -> ApiResult<(StatusCode, Json<DeployResponse>)> {
        let Json(request) = payload?;
        let workload: WorkloadType = match request.workload {
            Some(Value::String(name)) => name.parse()?,
            Some(other) => {
                return Err(ApiError::Validation(format!(
                    "workload type must be a string, got {}",
                    other
                )));
            }
            None => return Err(ApiError::Validation("missing workload type".to_string())),
        };

        let id = state.provisioner.deploy(workload).await;
        Ok((StatusCode::ACCEPTED, Json(DeployResponse { id })))
    }

    async fn status(
        State(state): State<AppState>,
        Path(id): Path<String>,
    ) -> ApiResult<Json<TaskView>> {
        let id = Uuid::parse_str(&id)
            .map_err(|_| ApiError::NotFound(format!("task {} not found", id)))?;
        let task = state.provisioner.store().get_task(id).await?;
        Ok(Json(state.view(task)))
    }

    async fn list_tasks(State(state): State<AppState>) -> Json<Vec<TaskView>> {
        let tasks = state.provisioner.store().list_tasks().await;
        Json(tasks.into_iter().map(|task| state.view(task)).collect())
    }

    async fn health() -> Json<Value> {
        Json(json!({ "status": "ok" }))
    }

    pub async fn start_server(self) -> std::io::Result<()> {
        let app = create_app(self.state);

        let listener = TcpListener::bind(&self.address).await?;
        info!("Listening on {}", self.address);

        axum::serve(listener, app).await
    }
}
