use crate::{
    config::Config,
    tasks::types::{SSH_USER, WorkloadType},
};

use super::types::{Profiles, ProvisionerConfig, WorkloadProfile};

/// noVNC bridge port inside the desktop image.
pub const DESKTOP_PORT: &str = "80/tcp";
pub const SERVER_PORT: &str = "22/tcp";

/// Installs sshd into a bare image and runs it in the foreground with a
/// fixed password for [`SSH_USER`].
pub fn server_startup_command(password: &str) -> Vec<String> {
    let script = format!(
        "apt-get update \
         && DEBIAN_FRONTEND=noninteractive apt-get install -y openssh-server \
         && mkdir -p /run/sshd \
         && echo '{user}:{password}' | chpasswd \
         && sed -i 's/^#\\?PermitRootLogin.*/PermitRootLogin yes/' /etc/ssh/sshd_config \
         && exec /usr/sbin/sshd -D",
        user = SSH_USER,
        password = password,
    );
    vec!["/bin/bash".to_string(), "-c".to_string(), script]
}

impl Profiles {
    pub fn new(desktop_image: &str, server_image: &str, ssh_password: &str) -> Self {
        Profiles {
            desktop: WorkloadProfile {
                image: desktop_image.to_string(),
                exposed_port: DESKTOP_PORT.to_string(),
                cmd: None,
            },
            server: WorkloadProfile {
                image: server_image.to_string(),
                exposed_port: SERVER_PORT.to_string(),
                cmd: Some(server_startup_command(ssh_password)),
            },
        }
    }

    pub fn get(&self, workload: WorkloadType) -> &WorkloadProfile {
        match workload {
            WorkloadType::Desktop => &self.desktop,
            WorkloadType::Server => &self.server,
        }
    }
}

impl ProvisionerConfig {
    pub fn from_config(config: &Config) -> Self {
        ProvisionerConfig {
            profiles: Profiles::new(
                &config.desktop_image,
                &config.server_image,
                &config.ssh_password,
            ),
            stabilization: config.stabilization(),
        }
    }
}
