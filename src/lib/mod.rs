//! On-demand provisioning of ephemeral desktop and server containers.
//!
//! A deploy request queues a [`tasks::types::Task`] and hands it to the
//! [`provisioner::Provisioner`], which pulls the workload image, reserves a
//! host port, creates and starts the container, and records each step in the
//! [`tasks::store::TaskStore`]. Clients poll the store through the HTTP API
//! in [`server`].

pub mod config;
pub mod ports;
pub mod provisioner;
pub mod server;
pub mod tasks;

pub use config::Config;
