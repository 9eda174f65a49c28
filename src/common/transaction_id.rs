//! Transaction identifier type.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TRANSACTION_ID: AtomicU64 = AtomicU64::new(1);

/// Identifies a transaction.
///
/// Ids handed out by [`TransactionId::next`] are unique within a process and
/// strictly increasing. Tests may build ids directly with [`TransactionId::new`].
///
/// # Example
/// ```
/// use heapstore::TransactionId;
///
/// let a = TransactionId::next();
/// let b = TransactionId::next();
/// assert!(a < b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(pub u64);

impl TransactionId {
    /// Create a TransactionId from a raw value.
    #[inline]
    pub fn new(id: u64) -> Self {
        TransactionId(id)
    }

    /// Allocate a fresh id.
    pub fn next() -> Self {
        TransactionId(NEXT_TRANSACTION_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Txn({})", self.0)
    }
}
