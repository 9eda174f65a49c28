//! Concurrency control.
//!
//! Page-level strict two-phase locking:
//! - [`Permission`] - Requested access level (shared or exclusive)
//! - [`LockManager`] - Grants, queues, and releases page locks
//! - [`WaitForGraph`] - Detects deadlocks among blocked transactions

mod lock_manager;
mod permission;
mod wait_for_graph;

pub use lock_manager::{LockHolders, LockManager};
pub use permission::Permission;
pub use wait_for_graph::WaitForGraph;
