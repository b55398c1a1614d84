pub mod docker;
pub mod runtime;
pub mod state;
pub mod store;
pub mod types;
