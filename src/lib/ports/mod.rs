pub mod allocator;
pub mod range;
pub mod types;

pub use range::PortRange;
pub use types::{PortAllocator, PortError};
