//! Write-ahead logging.
//!
//! The buffer pool talks to the log only through [`WriteAheadLog`]. Before a
//! page that carries uncommitted changes reaches disk, the pool logs the
//! page's before and after images and forces the log; commit and abort
//! records are forced before a transaction's locks are released.
//!
//! Two implementations are provided:
//! - [`LogFile`] - Append-only, checksummed records in a file
//! - [`MemoryLog`] - Records kept in memory, for tests and embedding

mod log_file;
mod log_record;
mod memory_log;

pub use log_file::LogFile;
pub use log_record::LogRecord;
pub use memory_log::MemoryLog;

use crate::common::{PageId, Result, TransactionId};
use crate::storage::page::Page;

/// Sink for the buffer pool's undo/redo records.
pub trait WriteAheadLog: Send + Sync {
    /// Record that `tid` changed `page_id` from `before` to `after`.
    fn log_write(
        &self,
        tid: TransactionId,
        page_id: PageId,
        before: &Page,
        after: &Page,
    ) -> Result<()>;

    fn log_commit(&self, tid: TransactionId) -> Result<()>;

    fn log_abort(&self, tid: TransactionId) -> Result<()>;

    /// Return only once every record appended so far is durable.
    fn force(&self) -> Result<()>;
}
