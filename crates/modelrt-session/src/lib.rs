//! Per-environment state: the identity map, the compute-recompute tracker,
//! and the protection scope guarding against reentrant pipeline writes.

pub mod compute;
pub mod identity_map;
pub mod protection;

pub use compute::{ComputeTracker, recompute_pending};
pub use identity_map::IdentityMap;
pub use protection::{ProtectionMap, ProtectionScope};
