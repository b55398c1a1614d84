use std::time::Duration;

use serde::Deserialize;

use crate::ports::{PortError, PortRange, allocator::DEFAULT_MAX_ATTEMPTS};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Host name clients use to reach provisioned workloads.
    #[serde(default = "default_public_host")]
    pub public_host: String,

    #[serde(default = "default_port_range")]
    pub port_range: String,

    #[serde(default = "default_port_attempts")]
    pub port_attempts: u32,

    #[serde(default = "default_stabilize_secs")]
    pub stabilize_secs: u64,

    #[serde(default = "default_desktop_image")]
    pub desktop_image: String,

    #[serde(default = "default_server_image")]
    pub server_image: String,

    #[serde(default = "default_ssh_password")]
    pub ssh_password: String,
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn default_bind_addr() -> String {
    env_or("EPHEMERA_BIND", "0.0.0.0:8080")
}

fn default_public_host() -> String {
    env_or("EPHEMERA_PUBLIC_HOST", "localhost")
}

fn default_port_range() -> String {
    env_or("EPHEMERA_PORT_RANGE", "30000-40000")
}

fn default_port_attempts() -> u32 {
    std::env::var("EPHEMERA_PORT_ATTEMPTS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_MAX_ATTEMPTS)
}

fn default_stabilize_secs() -> u64 {
    std::env::var("EPHEMERA_STABILIZE_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(6)
}

fn default_desktop_image() -> String {
    env_or("EPHEMERA_DESKTOP_IMAGE", "dorowu/ubuntu-desktop-lxde-vnc:focal")
}

fn default_server_image() -> String {
    env_or("EPHEMERA_SERVER_IMAGE", "ubuntu:22.04")
}

fn default_ssh_password() -> String {
    env_or("EPHEMERA_SSH_PASSWORD", "ephemera")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            public_host: default_public_host(),
            port_range: default_port_range(),
            port_attempts: default_port_attempts(),
            stabilize_secs: default_stabilize_secs(),
            desktop_image: default_desktop_image(),
            server_image: default_server_image(),
            ssh_password: default_ssh_password(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn port_range(&self) -> Result<PortRange, PortError> {
        PortRange::parse(&self.port_range)
    }

    pub fn stabilization(&self) -> Duration {
        Duration::from_secs(self.stabilize_secs)
    }
}
