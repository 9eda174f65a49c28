//! Table and page identifier types.

use std::fmt;
use std::path::Path;

/// Identifies a table (one heap file).
///
/// Derived from the CRC32 of the file's canonical path, so reopening the
/// same file in a later process yields the same id.
///
/// # Example
/// ```
/// use heapstore::TableId;
///
/// let a = TableId::from_path("/data/users.dat");
/// let b = TableId::from_path("/data/users.dat");
/// assert_eq!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableId(pub u32);

impl TableId {
    /// Hash a path into a table id.
    ///
    /// Callers should pass a canonicalized path; [`HeapFile`](crate::storage::HeapFile)
    /// does so before calling this.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        let mut hasher = crc32fast::Hasher::new();
        hasher.update(path.as_ref().to_string_lossy().as_bytes());
        TableId(hasher.finalize())
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies a page: the table it belongs to plus its page number.
///
/// Page `n` of a table lives at byte offset `n × page_size` of the table's
/// file. `PageId` is the key of both the page cache and the lock table.
///
/// # Example
/// ```
/// use heapstore::{PageId, TableId};
///
/// let page_id = PageId::new(TableId(1), 42);
/// assert_eq!(page_id.page_no, 42);
/// assert_eq!(page_id.to_string(), "Page(1:42)");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub table_id: TableId,
    pub page_no: u32,
}

impl PageId {
    /// Create a new PageId.
    #[inline]
    pub fn new(table_id: TableId, page_no: u32) -> Self {
        PageId { table_id, page_no }
    }

    /// Byte offset of this page in its file.
    #[inline]
    pub fn offset(&self, page_size: usize) -> u64 {
        (self.page_no as u64) * (page_size as u64)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Page({}:{})", self.table_id, self.page_no)
    }
}
