//! Heap File - an unordered table stored as a sequence of heap pages.
//!
//! A [`HeapFile`] owns the on-disk file of one table. Raw page I/O goes
//! straight to its [`DiskManager`]; tuple-level operations go through the
//! [`BufferPool`] so that every page they touch is locked by the calling
//! transaction.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::buffer::BufferPool;
use crate::common::{Error, PageId, Result, TableId, TransactionId};
use crate::storage::page::{HeapPage, HeapPageLayout, Page};
use crate::storage::DiskManager;
use crate::tuple::{Tuple, TupleDesc};

/// One table's backing file.
///
/// The table id is derived from the canonical path, so opening the same file
/// twice yields the same id.
pub struct HeapFile {
    id: TableId,
    path: PathBuf,
    desc: Arc<TupleDesc>,
    page_size: usize,
    disk: Mutex<DiskManager>,
}

impl HeapFile {
    /// Create a new, empty table file.
    ///
    /// # Errors
    /// - I/O errors, including the file already existing
    /// - `Error::InvalidConfig` if a single tuple does not fit in a page
    pub fn create<P: AsRef<Path>>(path: P, desc: Arc<TupleDesc>, page_size: usize) -> Result<Self> {
        check_fits(&desc, page_size)?;
        let disk = DiskManager::create(&path, page_size)?;
        Self::with_disk(path.as_ref(), desc, page_size, disk)
    }

    /// Open an existing table file.
    pub fn open<P: AsRef<Path>>(path: P, desc: Arc<TupleDesc>, page_size: usize) -> Result<Self> {
        check_fits(&desc, page_size)?;
        let disk = DiskManager::open(&path, page_size)?;
        Self::with_disk(path.as_ref(), desc, page_size, disk)
    }

    fn with_disk(
        path: &Path,
        desc: Arc<TupleDesc>,
        page_size: usize,
        disk: DiskManager,
    ) -> Result<Self> {
        let path = path.canonicalize()?;
        let id = TableId::from_path(&path);
        debug!("opened {} as table {id} ({} pages)", path.display(), disk.page_count());

        Ok(Self {
            id,
            path,
            desc,
            page_size,
            disk: Mutex::new(disk),
        })
    }

    #[inline]
    pub fn id(&self) -> TableId {
        self.id
    }

    pub fn tuple_desc(&self) -> &Arc<TupleDesc> {
        &self.desc
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn layout(&self) -> HeapPageLayout {
        HeapPageLayout::new(&self.desc, self.page_size)
    }

    // ========================================================================
    // Page I/O (bypasses the buffer pool)
    // ========================================================================

    /// Read one page from disk.
    ///
    /// # Errors
    /// `Error::PageNotFound` if the page belongs to another table or lies
    /// past the end of the file.
    pub fn read_page(&self, page_id: PageId) -> Result<Page> {
        self.check_owned(page_id)?;
        self.disk.lock().read_page(page_id)
    }

    /// Write one page to disk, extending the file if needed.
    pub fn write_page(&self, page_id: PageId, page: &Page) -> Result<()> {
        self.check_owned(page_id)?;
        self.disk.lock().write_page(page_id, page)
    }

    /// Number of pages currently in the file.
    pub fn num_pages(&self) -> u32 {
        self.disk.lock().page_count()
    }

    /// Append an empty page to the file and return its id.
    pub fn allocate_page(&self) -> Result<PageId> {
        let page_no = self.disk.lock().allocate_page()?;
        Ok(PageId::new(self.id, page_no))
    }

    fn check_owned(&self, page_id: PageId) -> Result<()> {
        if page_id.table_id == self.id {
            Ok(())
        } else {
            Err(Error::PageNotFound(page_id))
        }
    }

    // ========================================================================
    // Tuple operations (through the buffer pool)
    // ========================================================================

    /// Insert `tuple` into the first page with a free slot.
    ///
    /// Pages are inspected under a shared lock; only the page that receives
    /// the tuple is locked exclusively. If every page is full an empty page
    /// is appended and the tuple goes there. On success the tuple's record
    /// id is set and the one mutated page is returned.
    ///
    /// # Errors
    /// - `Error::SchemaMismatch` if the tuple's schema is not the table's
    /// - `Error::Deadlock` from the buffer pool (the transaction must abort)
    pub fn insert_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &mut Tuple,
    ) -> Result<Vec<PageId>> {
        if **tuple.tuple_desc() != *self.desc {
            return Err(Error::SchemaMismatch);
        }

        for page_no in 0..self.num_pages() {
            let page_id = PageId::new(self.id, page_no);
            let has_room = {
                let guard = pool.get_page_read(tid, page_id)?;
                let page = HeapPage::new(page_id, Arc::clone(&self.desc), guard.as_slice());
                page.num_empty_slots() > 0
            };
            if has_room && self.insert_into(pool, tid, page_id, tuple)? {
                return Ok(vec![page_id]);
            }
        }

        loop {
            let page_id = self.allocate_page()?;
            debug!("{tid} appended {page_id} to {}", self.path.display());
            if self.insert_into(pool, tid, page_id, tuple)? {
                return Ok(vec![page_id]);
            }
        }
    }

    /// Insert into `page_id` under an exclusive lock if it still has room.
    fn insert_into(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        page_id: PageId,
        tuple: &mut Tuple,
    ) -> Result<bool> {
        let mut guard = pool.get_page_write(tid, page_id)?;

        let full = HeapPage::new(page_id, Arc::clone(&self.desc), guard.as_slice())
            .first_free_slot()
            .is_none();
        if full {
            return Ok(false);
        }

        HeapPage::new(page_id, Arc::clone(&self.desc), guard.as_mut_slice()).insert_tuple(tuple)?;
        Ok(true)
    }

    /// Free the slot named by the tuple's record id.
    ///
    /// # Errors
    /// - `Error::InvalidRecordId` if the tuple has no record id, or one that
    ///   points outside this table
    /// - `Error::SlotEmpty` if the slot holds no tuple
    pub fn delete_tuple(
        &self,
        pool: &BufferPool,
        tid: TransactionId,
        tuple: &Tuple,
    ) -> Result<Vec<PageId>> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| Error::InvalidRecordId("tuple has no record id".into()))?;
        if rid.page_id.table_id != self.id || rid.page_id.page_no >= self.num_pages() {
            return Err(Error::InvalidRecordId(format!(
                "{rid} is not in table {}",
                self.id
            )));
        }

        let page_id = rid.page_id;
        let mut guard = pool.get_page_write(tid, page_id)?;

        let used = HeapPage::new(page_id, Arc::clone(&self.desc), guard.as_slice())
            .is_slot_used(rid.slot);
        if !used {
            return Err(Error::SlotEmpty {
                page_id,
                slot: rid.slot,
            });
        }
        HeapPage::new(page_id, Arc::clone(&self.desc), guard.as_mut_slice()).delete_tuple(tuple)?;

        Ok(vec![page_id])
    }

    /// A lazy scan over every tuple, in page order, on behalf of `tid`.
    pub fn iterator<'a>(
        &'a self,
        pool: &'a BufferPool,
        tid: TransactionId,
    ) -> HeapFileIterator<'a> {
        HeapFileIterator::new(self, pool, tid)
    }
}

fn check_fits(desc: &TupleDesc, page_size: usize) -> Result<()> {
    if HeapPageLayout::new(desc, page_size).num_slots == 0 {
        return Err(Error::InvalidConfig(format!(
            "a {}-byte tuple does not fit in a {page_size}-byte page",
            desc.size()
        )));
    }
    Ok(())
}

// ============================================================================
// Iteration
// ============================================================================

/// Pull-based tuple iterator consumed by the query layer.
///
/// `next` and `has_next` fail with `Error::IteratorNotOpen` before `open`
/// and after `close`.
pub trait DbFileIterator {
    fn open(&mut self) -> Result<()>;

    fn has_next(&mut self) -> Result<bool>;

    /// The next tuple, or `None` once the scan is exhausted.
    fn next(&mut self) -> Result<Option<Tuple>>;

    /// Restart from the first page, re-sampling the page count.
    fn rewind(&mut self) -> Result<()>;

    fn close(&mut self);
}

struct ScanState {
    next_page: u32,
    num_pages: u32,
    buffered: VecDeque<Tuple>,
}

/// Scan over a [`HeapFile`] through the buffer pool.
///
/// Each page is read under a shared lock held by `tid`. Only one page's
/// tuples are buffered at a time, and no page is pinned between calls.
pub struct HeapFileIterator<'a> {
    file: &'a HeapFile,
    pool: &'a BufferPool,
    tid: TransactionId,
    state: Option<ScanState>,
}

impl<'a> HeapFileIterator<'a> {
    fn new(file: &'a HeapFile, pool: &'a BufferPool, tid: TransactionId) -> Self {
        Self {
            file,
            pool,
            tid,
            state: None,
        }
    }

    fn fill(&mut self) -> Result<bool> {
        let state = self.state.as_mut().ok_or(Error::IteratorNotOpen)?;

        while state.buffered.is_empty() && state.next_page < state.num_pages {
            let page_id = PageId::new(self.file.id, state.next_page);
            state.next_page += 1;

            let guard = self.pool.get_page_read(self.tid, page_id)?;
            state.buffered = HeapPage::new(page_id, Arc::clone(&self.file.desc), guard.as_slice())
                .tuples()
                .into();
        }

        Ok(!state.buffered.is_empty())
    }
}

impl DbFileIterator for HeapFileIterator<'_> {
    fn open(&mut self) -> Result<()> {
        self.state = Some(ScanState {
            next_page: 0,
            num_pages: self.file.num_pages(),
            buffered: VecDeque::new(),
        });
        Ok(())
    }

    fn has_next(&mut self) -> Result<bool> {
        self.fill()
    }

    fn next(&mut self) -> Result<Option<Tuple>> {
        if !self.fill()? {
            return Ok(None);
        }
        Ok(self.state.as_mut().and_then(|s| s.buffered.pop_front()))
    }

    fn rewind(&mut self) -> Result<()> {
        self.close();
        self.open()
    }

    fn close(&mut self) {
        self.state = None;
    }
}

impl Iterator for HeapFileIterator<'_> {
    type Item = Result<Tuple>;

    /// Opens the scan on first use.
    fn next(&mut self) -> Option<Self::Item> {
        if self.state.is_none() {
            if let Err(e) = DbFileIterator::open(self) {
                return Some(Err(e));
            }
        }
        DbFileIterator::next(self).transpose()
    }
}
