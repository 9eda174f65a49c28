//! heapstore - a page-cached heap storage engine with page-level two-phase
//! locking.
//!
//! # Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                           heapstore                             │
//! ├─────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │        Transactions (TransactionId + commit/abort)       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │                 Buffer Pool (buffer/)                    │   │
//! │  │   BufferPool + Frame + CLOCK replacer + Statistics       │   │
//! │  │        ↕ LockManager (concurrency/)  ↕ WAL (recovery/)   │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! │                              ↓                                  │
//! │  ┌─────────────────────────────────────────────────────────┐   │
//! │  │      Catalog (catalog/) → HeapFile (storage/)            │   │
//! │  │     DiskManager + Page + HeapPage + Tuple (tuple/)       │   │
//! │  └─────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//! - [`common`] - Shared primitives (ids, Error, Config)
//! - [`buffer`] - The transactional page cache
//! - [`concurrency`] - Page locks and deadlock detection
//! - [`recovery`] - Write-ahead log interface and implementations
//! - [`catalog`] - Table registry
//! - [`storage`] - Disk I/O, page formats and heap files
//! - [`tuple`] - Schemas, fields and tuples
//!
//! # Quick Start
//! ```no_run
//! use std::sync::Arc;
//! use heapstore::{
//!     BufferPool, Catalog, Config, Field, HeapFile, LogFile, TransactionId, Tuple, TupleDesc, Type,
//! };
//!
//! # fn main() -> heapstore::Result<()> {
//! let desc = Arc::new(TupleDesc::new(vec![Type::Int]));
//! let file = Arc::new(HeapFile::create("users.dat", Arc::clone(&desc), 4096)?);
//!
//! let catalog = Arc::new(Catalog::new());
//! catalog.add_table(Arc::clone(&file), "users");
//! let pool = BufferPool::new(Config::default(), catalog, Arc::new(LogFile::open("users.log")?))?;
//!
//! let tid = TransactionId::next();
//! let mut tuple = Tuple::new(desc, vec![Field::Int(42)])?;
//! pool.insert_tuple(tid, file.id(), &mut tuple)?;
//! pool.transaction_complete(tid, true)?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod concurrency;
pub mod recovery;
pub mod storage;
pub mod tuple;

// Re-export commonly used items at crate root for convenience
pub use common::{Config, Error, FrameId, PageId, Result, TableId, TransactionId};

pub use buffer::{
    BufferPool, BufferPoolStats, PageGuard, PageReadGuard, PageWriteGuard, StatsSnapshot,
};
pub use catalog::Catalog;
pub use concurrency::{LockManager, Permission};
pub use recovery::{LogFile, LogRecord, MemoryLog, WriteAheadLog};
pub use storage::page::Page;
pub use storage::{DbFileIterator, HeapFile, HeapFileIterator};
pub use tuple::{Field, RecordId, Tuple, TupleDesc, Type};
