use std::{
    collections::HashSet,
    sync::{Mutex, MutexGuard, PoisonError},
};

use rand::Rng;
use tokio::net::TcpListener;
use tracing::{debug, trace, warn};

use super::{
    range::PortRange,
    types::{PortAllocator, PortError},
};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 100;

impl PortAllocator {
    pub fn new(range: PortRange, max_attempts: u32) -> Self {
        PortAllocator {
            range,
            max_attempts,
            reserved: Mutex::new(HashSet::new()),
        }
    }

    pub fn range(&self) -> &PortRange {
        &self.range
    }

    /// Picks random candidates from the range until one is both unreserved
    /// and bindable on the host, then reserves it.
    pub async fn allocate(&self) -> Result<u16, PortError> {
        for attempt in 1..=self.max_attempts {
            let candidate = rand::rng().random_range(self.range.start..=self.range.end);

            // Reserved before probing so a concurrent allocate skips it.
            if !self.reserved().insert(candidate) {
                continue;
            }

            match TcpListener::bind(("0.0.0.0", candidate)).await {
                Ok(listener) => {
                    drop(listener);
                    debug!(port = candidate, attempt, "allocated host port");
                    return Ok(candidate);
                }
                Err(err) => {
                    trace!(port = candidate, error = %err, "port busy on host");
                    self.reserved().remove(&candidate);
                }
            }
        }

        warn!(range = %self.range, attempts = self.max_attempts, "port range exhausted");
        Err(PortError::NoFreePorts {
            range: self.range.clone(),
            attempts: self.max_attempts,
        })
    }

    /// Returns `port` to the pool. Returns false if it was not reserved.
    pub fn release(&self, port: u16) -> bool {
        self.reserved().remove(&port)
    }

    /// Moves the reservation for `allocated` onto `bound`, the port the
    /// runtime actually published. Returns false if `bound` was already held.
    pub fn rebind(&self, allocated: u16, bound: u16) -> bool {
        let mut reserved = self.reserved();
        reserved.remove(&allocated);
        reserved.insert(bound)
    }

    pub fn is_reserved(&self, port: u16) -> bool {
        self.reserved().contains(&port)
    }

    pub fn reserved_count(&self) -> usize {
        self.reserved().len()
    }

    fn reserved(&self) -> MutexGuard<'_, HashSet<u16>> {
        self.reserved.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::HashSet, sync::Arc};

    use super::*;

    fn allocator(start: u16, end: u16, attempts: u32) -> PortAllocator {
        PortAllocator::new(PortRange::new(start, end).unwrap(), attempts)
    }

    #[tokio::test]
    async fn test_allocations_stay_in_range() {
        let ports = allocator(42100, 42199, DEFAULT_MAX_ATTEMPTS);
        for _ in 0..20 {
            let port = ports.allocate().await.unwrap();
            assert!(ports.range().contains(port), "{} outside range", port);
            assert!(ports.is_reserved(port));
        }
    }

    #[tokio::test]
    async fn test_exhausted_range_reports_no_free_ports() {
        let ports = allocator(42200, 42203, 500);
        let mut seen = HashSet::new();
        while let Ok(port) = ports.allocate().await {
            assert!(seen.insert(port), "port {} handed out twice", port);
        }
        assert!(seen.len() <= 4);

        let err = ports.allocate().await.unwrap_err();
        assert_eq!(
            err,
            PortError::NoFreePorts {
                range: PortRange::new(42200, 42203).unwrap(),
                attempts: 500,
            }
        );
    }

    #[tokio::test]
    async fn test_release_returns_port_to_pool() {
        let ports = allocator(42300, 42301, 500);
        let first = ports.allocate().await.unwrap();
        let second = ports.allocate().await.unwrap();
        assert_ne!(first, second);
        assert!(ports.allocate().await.is_err());

        assert!(ports.release(first));
        assert!(!ports.release(first));
        assert_eq!(ports.allocate().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_rebind_moves_reservation() {
        let ports = allocator(42500, 42599, DEFAULT_MAX_ATTEMPTS);
        let allocated = ports.allocate().await.unwrap();
        let bound = if allocated == 42500 { 42501 } else { 42500 };

        assert!(ports.rebind(allocated, bound));
        assert!(ports.is_reserved(bound));
        assert!(!ports.is_reserved(allocated));
        assert_eq!(ports.reserved_count(), 1);

        // Already held: the reservation stays, but the caller is told.
        let other = ports.allocate().await.unwrap();
        assert!(!ports.rebind(other, bound));
        assert!(!ports.is_reserved(other));
    }

    #[tokio::test]
    async fn test_skips_port_bound_by_another_listener() {
        let listener = TcpListener::bind(("0.0.0.0", 0)).await.unwrap();
        let busy = listener.local_addr().unwrap().port();

        let ports = allocator(busy - 1, busy, 200);
        for _ in 0..2 {
            match ports.allocate().await {
                Ok(port) => assert_ne!(port, busy),
                Err(err) => assert!(matches!(err, PortError::NoFreePorts { .. })),
            }
        }
        assert!(!ports.is_reserved(busy));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocations_are_distinct() {
        let ports = Arc::new(allocator(42400, 42499, DEFAULT_MAX_ATTEMPTS));
        let mut handles = Vec::new();
        for _ in 0..16 {
            let ports = ports.clone();
            handles.push(tokio::spawn(async move { ports.allocate().await }));
        }

        let mut seen = HashSet::new();
        for handle in handles {
            let port = handle.await.unwrap().unwrap();
            assert!(seen.insert(port));
        }
        assert_eq!(ports.reserved_count(), 16);
    }
}
