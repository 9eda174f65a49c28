//! Buffer pool management.
//!
//! The buffer pool is the in-memory cache between heap files and the
//! transactions that read and write them. It manages a fixed pool of
//! frames, each holding one page, and gates every access through the
//! page-level lock manager.
//!
//! # Components
//! - [`BufferPool`] - The transactional page cache
//! - [`Frame`] - A slot in the buffer pool holding a page + metadata
//! - [`PageReadGuard`] / [`PageWriteGuard`] / [`PageGuard`] - RAII guards for page access
//! - [`BufferPoolStats`] - Performance statistics
//! - [`replacer`] - CLOCK eviction

mod buffer_pool;
mod frame;
mod page_guard;
pub mod replacer;
mod stats;

pub use buffer_pool::BufferPool;
pub use frame::Frame;
pub use page_guard::{PageGuard, PageReadGuard, PageWriteGuard};
pub use stats::{BufferPoolStats, StatsSnapshot};
