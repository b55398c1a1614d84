use std::{collections::HashSet, sync::Mutex};

use thiserror::Error;

use super::range::PortRange;

/// Hands out host ports from a fixed range.
///
/// Every port returned by `allocate` stays in `reserved` until `release`d,
/// so two pipelines in this process never receive the same port. If the
/// runtime publishes a different port, `rebind` moves the reservation to
/// it so the table tracks what is actually bound. Another process can still
/// grab a port between our test bind and the container's bind; nothing here
/// guards against that.
#[derive(Debug)]
pub struct PortAllocator {
    pub(super) range: PortRange,
    pub(super) max_attempts: u32,
    pub(super) reserved: Mutex<HashSet<u16>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortError {
    #[error("invalid port range: {0}")]
    InvalidRange(String),

    #[error("no free port in {range} after {attempts} attempts")]
    NoFreePorts { range: PortRange, attempts: u32 },
}
