//! Error types for heapstore.

use thiserror::Error;

use crate::common::{PageId, TableId, TransactionId};

/// Convenient Result type alias.
///
/// Instead of writing `Result<T, Error>` everywhere, we can write `Result<T>`.
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in heapstore.
///
/// The variants fall into three groups:
/// - transaction-fatal: [`Error::Deadlock`]. The caller must drop its page
///   guards, abort the transaction, and retry it after a backoff.
/// - operation-fatal: everything else. The transaction may continue or abort
///   at the caller's discretion.
/// - benign conditions (releasing a lock not held, discarding a page not
///   cached) are not errors at all.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error from disk or log operations. Never retried internally.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Granting the lock would have closed a cycle in the wait-for graph.
    #[error("transaction {0} must abort: deadlock detected")]
    Deadlock(TransactionId),

    /// Requested page lies outside the file's current extent.
    #[error("{0} not found")]
    PageNotFound(PageId),

    /// No table is registered under this id.
    #[error("no table with id {0}")]
    NoSuchTable(TableId),

    /// Tuple does not conform to the table's schema.
    #[error("tuple schema does not match table schema")]
    SchemaMismatch,

    /// Tuple has no record id, or one that points outside the table.
    #[error("invalid record id: {0}")]
    InvalidRecordId(String),

    /// Slot referenced by a delete is not occupied.
    #[error("slot {slot} on {page_id} is empty")]
    SlotEmpty { page_id: PageId, slot: usize },

    /// Insert into a page with no free slot.
    #[error("{0} has no free slot")]
    PageFull(PageId),

    /// Every frame is pinned; nothing can be evicted.
    #[error("no evictable page in buffer pool")]
    NoEvictablePage,

    /// A heap file's page size differs from the buffer pool's.
    #[error("page size mismatch: pool uses {expected}, file uses {actual}")]
    PageSizeMismatch { expected: usize, actual: usize },

    /// Configuration rejected by [`Config::validate`](crate::Config::validate).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// `next`/`has_next` on a file iterator that is not open.
    #[error("iterator is not open")]
    IteratorNotOpen,

    /// A log record failed its checksum or could not be decoded.
    #[error("corrupt log record at offset {0}")]
    CorruptLog(u64),
}

impl Error {
    /// Whether the transaction that triggered the error can only abort.
    pub fn is_transaction_fatal(&self) -> bool {
        matches!(self, Error::Deadlock(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PageNotFound(PageId::new(TableId(7), 42));
        assert_eq!(format!("{}", err), "Page(7:42) not found");

        let err = Error::NoEvictablePage;
        assert_eq!(format!("{}", err), "no evictable page in buffer pool");

        let err = Error::Deadlock(TransactionId::new(3));
        assert_eq!(format!("{}", err), "transaction Txn(3) must abort: deadlock detected");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();

        match err {
            Error::Io(_) => {} // Success
            _ => panic!("Expected Io error"),
        }
    }

    #[test]
    fn test_only_deadlock_is_transaction_fatal() {
        assert!(Error::Deadlock(TransactionId::new(1)).is_transaction_fatal());
        assert!(!Error::NoEvictablePage.is_transaction_fatal());
        assert!(!Error::SchemaMismatch.is_transaction_fatal());
    }
}
