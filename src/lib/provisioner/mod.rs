pub mod profile;
pub mod provisioner;
pub mod types;

pub use types::{ProvisionError, Provisioner, ProvisionerConfig, Profiles, WorkloadProfile};
