pub mod api;
pub mod types;

pub use api::create_app;
pub use types::{ApiError, ApiResult, AppState, TaskServer};
