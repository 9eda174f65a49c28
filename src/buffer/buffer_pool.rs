//! Buffer Pool - the transactional page cache.
//!
//! The [`BufferPool`] provides:
//! - Page caching between heap files and memory, bounded by `pool_pages`
//! - Lock acquisition through the [`LockManager`] on every page access
//! - Pin-based reference counting with CLOCK eviction of unpinned frames
//! - Write-ahead logging of before/after images ahead of any page write
//! - Commit (log, force, flush) and abort (restore before-images)

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, trace, warn};

use crate::buffer::frame::{BeforeImage, Frame};
use crate::buffer::replacer::ClockReplacer;
use crate::buffer::{BufferPoolStats, PageGuard, PageReadGuard, PageWriteGuard};
use crate::catalog::Catalog;
use crate::common::{Config, Error, FrameId, PageId, Result, TableId, TransactionId};
use crate::concurrency::{LockManager, Permission};
use crate::recovery::WriteAheadLog;
use crate::storage::HeapFile;
use crate::tuple::Tuple;

/// Structural state, guarded by one mutex.
struct PoolState {
    /// Maps cached page IDs to frame IDs.
    page_table: HashMap<PageId, FrameId>,

    /// Stack of free frame IDs.
    free_list: Vec<FrameId>,

    /// Discarded frames still pinned by a guard.
    pending_free: Vec<FrameId>,

    replacer: ClockReplacer,

    /// Before-images of evicted or discarded pages whose uncommitted content
    /// is on disk. Reattached on reload, written back on abort.
    stolen: HashMap<PageId, BeforeImage>,
}

/// Caches pages for transactions and enforces page-level two-phase locking.
///
/// # Architecture
/// ```text
/// ┌─────────────────────────────────────────────────────────────┐
/// │                        BufferPool                           │
/// │  ┌──────────────┐  ┌───────────────────────────────────┐   │
/// │  │ page_table   │  │        frames: Vec<Frame>         │   │
/// │  │PageId → Fid  │─▶│  [Frame0] [Frame1] [Frame2] ...   │   │
/// │  └──────────────┘  └───────────────────────────────────┘   │
/// │  ┌──────────────┐  ┌──────────────┐  ┌──────────────┐      │
/// │  │ lock_manager │  │   replacer   │  │   catalog    │      │
/// │  │  2PL + WFG   │  │    CLOCK     │  │ TableId→File │      │
/// │  └──────────────┘  └──────────────┘  └──────────────┘      │
/// │                        ┌──────────────┐                     │
/// │                        │ WriteAheadLog│                     │
/// │                        └──────────────┘                     │
/// └─────────────────────────────────────────────────────────────┘
/// ```
///
/// # Thread Safety
/// - `state`: one `Mutex` for page table, free list, replacer and retained
///   before-images
/// - `frames`: fixed size; each frame has its own latch and metadata mutex
/// - `lock_manager`: its own mutex and condition variable
/// - `stats`: all atomic counters
///
/// Lock order is: transaction lock, then `state`, then a frame latch, then
/// that frame's metadata. A transaction lock is never requested while
/// `state` is held, and page guards never take `state`. `doomed` is a leaf.
///
/// # Policy
/// STEAL (uncommitted pages may be evicted, after logging) and FORCE
/// (committed pages are written before locks are released).
pub struct BufferPool {
    frames: Vec<Frame>,
    state: Mutex<PoolState>,
    lock_manager: LockManager,
    /// Transactions refused for deadlock that have not yet aborted.
    doomed: Mutex<HashSet<TransactionId>>,
    catalog: Arc<Catalog>,
    log: Arc<dyn WriteAheadLog>,
    stats: BufferPoolStats,
    config: Config,
}

impl BufferPool {
    /// Create a buffer pool of `config.pool_pages` frames.
    ///
    /// # Errors
    /// `Error::InvalidConfig` if the configuration fails validation.
    pub fn new(config: Config, catalog: Arc<Catalog>, log: Arc<dyn WriteAheadLog>) -> Result<Self> {
        config.validate()?;
        let pool_pages = config.pool_pages;

        let frames: Vec<Frame> = (0..pool_pages).map(|_| Frame::new(config.page_size)).collect();
        // Popped from the back, so frame 0 is handed out first.
        let free_list: Vec<FrameId> = (0..pool_pages).rev().map(FrameId::new).collect();

        Ok(Self {
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::new(),
                free_list,
                pending_free: Vec::new(),
                replacer: ClockReplacer::new(pool_pages),
                stolen: HashMap::new(),
            }),
            lock_manager: LockManager::new(),
            doomed: Mutex::new(HashSet::new()),
            catalog,
            log,
            stats: BufferPoolStats::new(),
            config,
        })
    }

    // ========================================================================
    // Public API: Page access
    // ========================================================================

    /// Fetch a page on behalf of `tid`, first acquiring a lock for `perm`.
    ///
    /// Blocks while another transaction holds a conflicting lock.
    ///
    /// # Errors
    /// - `Error::Deadlock` if waiting would deadlock. The transaction keeps
    ///   its locks until the caller drops its guards and aborts it; every
    ///   later request by it fails the same way.
    /// - `Error::NoSuchTable` / `Error::PageNotFound` if the page does not
    ///   exist
    /// - `Error::NoEvictablePage` if every frame is pinned
    pub fn get_page(
        &self,
        tid: TransactionId,
        page_id: PageId,
        perm: Permission,
    ) -> Result<PageGuard<'_>> {
        Ok(match perm {
            Permission::Read => PageGuard::Read(self.get_page_read(tid, page_id)?),
            Permission::Write => PageGuard::Write(self.get_page_write(tid, page_id)?),
        })
    }

    /// Fetch a page under a shared lock.
    pub fn get_page_read(&self, tid: TransactionId, page_id: PageId) -> Result<PageReadGuard<'_>> {
        let frame_id = self.admit(tid, page_id, Permission::Read)?;
        let lock = self.frame(frame_id).page();

        Ok(PageReadGuard::new(self, frame_id, page_id, lock))
    }

    /// Fetch a page under an exclusive lock.
    pub fn get_page_write(
        &self,
        tid: TransactionId,
        page_id: PageId,
    ) -> Result<PageWriteGuard<'_>> {
        let frame_id = self.admit(tid, page_id, Permission::Write)?;
        let lock = self.frame(frame_id).page_mut();

        Ok(PageWriteGuard::new(self, frame_id, page_id, tid, lock))
    }

    // ========================================================================
    // Public API: Tuples
    // ========================================================================

    /// Insert `tuple` into table `table_id` on behalf of `tid`.
    ///
    /// On success the tuple's record id names its new location.
    pub fn insert_tuple(
        &self,
        tid: TransactionId,
        table_id: TableId,
        tuple: &mut Tuple,
    ) -> Result<()> {
        let file = self.file(table_id)?;
        for page_id in file.insert_tuple(self, tid, tuple)? {
            self.mark_dirty(page_id, tid);
        }
        Ok(())
    }

    /// Delete `tuple` from the table named by its record id.
    pub fn delete_tuple(&self, tid: TransactionId, tuple: &Tuple) -> Result<()> {
        let rid = tuple
            .record_id()
            .ok_or_else(|| Error::InvalidRecordId("tuple has no record id".into()))?;
        let file = self.file(rid.page_id.table_id)?;
        for page_id in file.delete_tuple(self, tid, tuple)? {
            self.mark_dirty(page_id, tid);
        }
        Ok(())
    }

    // ========================================================================
    // Public API: Transactions
    // ========================================================================

    /// Commit or abort `tid`, then release all of its locks.
    ///
    /// Commit logs the before/after image of every page the transaction
    /// dirtied, logs a commit record, forces the log and writes the pages.
    /// Abort restores those pages from their before-images, on disk as well
    /// as in memory where uncommitted content had already been written.
    ///
    /// All of `tid`'s page guards must be dropped first. A transaction
    /// refused for deadlock is aborted even if `commit` is set, in which case
    /// `Error::Deadlock` is returned once the abort is done.
    ///
    /// Locks are released even if completion fails.
    pub fn transaction_complete(&self, tid: TransactionId, commit: bool) -> Result<()> {
        let pages = self.lock_manager.pages_locked_by(tid);
        let doomed = self.doomed.lock().remove(&tid);
        let refused_commit = commit && doomed;
        let commit = commit && !doomed;

        let result = if commit {
            self.commit(tid, pages)
        } else {
            self.abort(tid, pages)
        };
        self.lock_manager.release_all(tid);

        match &result {
            Ok(()) if commit => {
                BufferPoolStats::incr(&self.stats.commits);
                info!("{tid} committed");
            }
            Ok(()) => {
                BufferPoolStats::incr(&self.stats.aborts);
                info!("{tid} aborted");
            }
            Err(e) => warn!("{tid} failed to complete (commit: {commit}): {e}"),
        }
        if refused_commit && result.is_ok() {
            return Err(Error::Deadlock(tid));
        }
        result
    }

    /// Release one lock before the transaction completes.
    ///
    /// Breaks two-phase locking; only for callers that know the page was
    /// not used.
    pub fn unsafe_release_page(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.lock_manager.release(tid, page_id)
    }

    pub fn holds_lock(&self, tid: TransactionId, page_id: PageId) -> bool {
        self.lock_manager.holds(tid, page_id)
    }

    /// Whether `tid` was refused for deadlock and has yet to abort.
    pub fn is_doomed(&self, tid: TransactionId) -> bool {
        self.doomed.lock().contains(&tid)
    }

    // ========================================================================
    // Public API: Flush and discard
    // ========================================================================

    /// Write a page to disk if it is cached and dirty.
    pub fn flush_page(&self, page_id: PageId) -> Result<()> {
        self.with_pinned([page_id], |pinned| self.write_back_all(pinned))
    }

    /// Write every dirty cached page to disk.
    pub fn flush_all_pages(&self) -> Result<()> {
        self.with_pinned(self.cached_pages(), |pinned| self.write_back_all(pinned))
    }

    /// Write every cached page dirtied by `tid` to disk.
    ///
    /// The pages keep their before-images, so `tid` can still abort.
    pub fn flush_pages(&self, tid: TransactionId) -> Result<()> {
        self.with_pinned(self.cached_pages(), |pinned| {
            for &(page_id, frame_id) in pinned {
                let frame = self.frame(frame_id);
                if frame.dirtied_by() == Some(tid) {
                    self.write_back(frame, page_id)?;
                }
            }
            Ok(())
        })
    }

    /// Drop a page from the pool without writing it.
    ///
    /// No-op if the page is not cached. A frame still pinned by a guard is
    /// reused only once the guard is dropped.
    pub fn discard_page(&self, page_id: PageId) {
        let mut state = self.state.lock();
        let Some(frame_id) = state.page_table.remove(&page_id) else {
            return;
        };
        state.replacer.remove(frame_id);

        let frame = self.frame(frame_id);
        {
            let mut meta = frame.meta();
            if let Some(before) = meta.before_image.take() {
                if before.on_disk {
                    state.stolen.insert(page_id, before);
                }
            }
            meta.reset();
        }

        if frame.is_pinned() {
            state.pending_free.push(frame_id);
        } else {
            state.free_list.push(frame_id);
        }
        debug!("discarded {page_id} from {frame_id}");
    }

    // ========================================================================
    // Public API: Stats and info
    // ========================================================================

    pub fn stats(&self) -> &BufferPoolStats {
        &self.stats
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Maximum number of cached pages.
    pub fn capacity(&self) -> usize {
        self.frames.len()
    }

    /// Number of pages currently cached.
    pub fn page_count(&self) -> usize {
        self.state.lock().page_table.len()
    }

    pub fn free_frame_count(&self) -> usize {
        self.state.lock().free_list.len()
    }

    pub fn contains_page(&self, page_id: PageId) -> bool {
        self.state.lock().page_table.contains_key(&page_id)
    }

    /// Whether the page is cached with changes not yet written to disk.
    pub fn is_dirty(&self, page_id: PageId) -> bool {
        let state = self.state.lock();
        state
            .page_table
            .get(&page_id)
            .is_some_and(|&fid| self.frame(fid).is_dirty())
    }

    pub fn cached_pages(&self) -> Vec<PageId> {
        self.state.lock().page_table.keys().copied().collect()
    }

    // ========================================================================
    // Internal: Called by page guards
    // ========================================================================

    #[inline]
    pub(crate) fn frame(&self, frame_id: FrameId) -> &Frame {
        &self.frames[frame_id.index()]
    }

    #[inline]
    pub(crate) fn unpin_frame(&self, frame_id: FrameId) {
        self.frame(frame_id).unpin();
    }

    // ========================================================================
    // Internal: Core fetch logic
    // ========================================================================

    /// Lock the page for `tid`, then pin it into a frame.
    ///
    /// A deadlock refusal dooms `tid` but leaves its locks in place: the
    /// caller may still hold guards, and rolling back needs their latches.
    fn admit(&self, tid: TransactionId, page_id: PageId, perm: Permission) -> Result<FrameId> {
        if self.is_doomed(tid) {
            return Err(Error::Deadlock(tid));
        }
        if let Err(e) = self.lock_manager.acquire(tid, page_id, perm) {
            if e.is_transaction_fatal() {
                self.doomed.lock().insert(tid);
                warn!("{tid} must abort: {e}");
            }
            return Err(e);
        }
        self.fetch_frame(page_id)
    }

    /// Return the frame holding `page_id`, loading it if needed. The frame
    /// is pinned on return.
    fn fetch_frame(&self, page_id: PageId) -> Result<FrameId> {
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.frame(frame_id).pin();
            state.replacer.record_access(frame_id);
            BufferPoolStats::incr(&self.stats.cache_hits);
            trace!("hit {page_id} in {frame_id}");
            return Ok(frame_id);
        }

        BufferPoolStats::incr(&self.stats.cache_misses);
        let page = self.file(page_id.table_id)?.read_page(page_id)?;
        BufferPoolStats::incr(&self.stats.pages_read);

        let frame_id = self.take_frame(&mut state)?;
        let frame = self.frame(frame_id);
        *frame.page_mut() = page;
        {
            let mut meta = frame.meta();
            meta.reset();
            meta.page_id = Some(page_id);
            meta.before_image = state.stolen.remove(&page_id);
        }
        frame.pin();

        state.page_table.insert(page_id, frame_id);
        state.replacer.record_access(frame_id);
        debug!("loaded {page_id} into {frame_id}");

        Ok(frame_id)
    }

    /// Resolve a table and check that its pages fit this pool's frames.
    fn file(&self, table_id: TableId) -> Result<Arc<HeapFile>> {
        let file = self.catalog.file(table_id)?;
        if file.page_size() != self.config.page_size {
            return Err(Error::PageSizeMismatch {
                expected: self.config.page_size,
                actual: file.page_size(),
            });
        }
        Ok(file)
    }

    fn mark_dirty(&self, page_id: PageId, tid: TransactionId) {
        let state = self.state.lock();
        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.frame(frame_id).meta().dirty = Some(tid);
        }
    }

    // ========================================================================
    // Internal: Frame allocation and eviction
    // ========================================================================

    /// Get a free frame, evicting if necessary.
    fn take_frame(&self, state: &mut PoolState) -> Result<FrameId> {
        self.reclaim_pending(state);
        if let Some(frame_id) = state.free_list.pop() {
            return Ok(frame_id);
        }

        let frame_id = state
            .replacer
            .evict(|fid| self.frame(fid).is_pinned())
            .ok_or(Error::NoEvictablePage)?;

        if let Err(e) = self.evict_frame(state, frame_id) {
            state.replacer.record_access(frame_id);
            return Err(e);
        }
        Ok(frame_id)
    }

    /// Write back and unmap the victim. Its before-image, if any, is kept.
    fn evict_frame(&self, state: &mut PoolState, frame_id: FrameId) -> Result<()> {
        let frame = self.frame(frame_id);
        let Some(page_id) = frame.page_id() else {
            return Ok(());
        };

        self.write_back(frame, page_id)?;
        state.page_table.remove(&page_id);

        let mut meta = frame.meta();
        if let Some(before) = meta.before_image.take() {
            debug!("retaining before-image of {page_id} for {}", before.owner);
            state.stolen.insert(page_id, before);
        }
        meta.reset();

        BufferPoolStats::incr(&self.stats.evictions);
        debug!("evicted {page_id} from {frame_id}");
        Ok(())
    }

    /// Move discarded frames whose guards have since dropped to the free list.
    fn reclaim_pending(&self, state: &mut PoolState) {
        if state.pending_free.is_empty() {
            return;
        }
        let (ready, pinned): (Vec<FrameId>, Vec<FrameId>) = std::mem::take(&mut state.pending_free)
            .into_iter()
            .partition(|&fid| !self.frame(fid).is_pinned());

        for frame_id in ready {
            self.frame(frame_id).meta().reset();
            state.free_list.push(frame_id);
        }
        state.pending_free = pinned;
    }

    /// Write a dirty frame to its file, logging first if it carries a
    /// before-image. Clean frames and frames no longer holding `page_id`
    /// are left alone.
    ///
    /// The caller keeps the frame's identity stable, either by holding
    /// `state` or by pinning it.
    fn write_back(&self, frame: &Frame, page_id: PageId) -> Result<()> {
        let page = frame.page();
        let mut meta = frame.meta();
        if meta.page_id != Some(page_id) || meta.dirty.is_none() {
            return Ok(());
        }

        let file = self.file(page_id.table_id)?;
        if let Some(before) = &meta.before_image {
            self.log.log_write(before.owner, page_id, &before.image, &page)?;
            self.log.force()?;
        }
        file.write_page(page_id, &page)?;

        if let Some(before) = meta.before_image.as_mut() {
            before.on_disk = true;
        }
        meta.dirty = None;

        BufferPoolStats::incr(&self.stats.pages_written);
        debug!("flushed {page_id}");
        Ok(())
    }

    fn write_back_all(&self, pinned: &[(PageId, FrameId)]) -> Result<()> {
        pinned
            .iter()
            .try_for_each(|&(page_id, frame_id)| self.write_back(self.frame(frame_id), page_id))
    }

    /// Pin whichever of `pages` are cached, run `f` over them without
    /// holding `state`, then unpin.
    fn with_pinned<T>(
        &self,
        pages: impl IntoIterator<Item = PageId>,
        f: impl FnOnce(&[(PageId, FrameId)]) -> Result<T>,
    ) -> Result<T> {
        let pinned: Vec<(PageId, FrameId)> = {
            let state = self.state.lock();
            pages
                .into_iter()
                .filter_map(|page_id| {
                    let frame_id = *state.page_table.get(&page_id)?;
                    self.frame(frame_id).pin();
                    Some((page_id, frame_id))
                })
                .collect()
        };

        let result = f(&pinned);
        for &(_, frame_id) in &pinned {
            self.unpin_frame(frame_id);
        }
        result
    }

    // ========================================================================
    // Internal: Commit and abort
    // ========================================================================

    fn commit(&self, tid: TransactionId, pages: Vec<PageId>) -> Result<()> {
        self.with_pinned(pages, |pinned| {
            for &(page_id, frame_id) in pinned {
                let frame = self.frame(frame_id);
                let page = frame.page();
                let mut meta = frame.meta();
                if meta.page_id != Some(page_id) {
                    continue;
                }
                if let Some(before) = meta.take_before_image(tid) {
                    self.log.log_write(tid, page_id, &before.image, &page)?;
                }
            }

            self.log.log_commit(tid)?;
            self.log.force()?;

            self.write_back_all(pinned)
        })?;

        // Evicted pages were logged and written when they were stolen.
        self.state.lock().stolen.retain(|_, before| before.owner != tid);
        Ok(())
    }

    fn abort(&self, tid: TransactionId, pages: Vec<PageId>) -> Result<()> {
        self.with_pinned(pages, |pinned| {
            for &(page_id, frame_id) in pinned {
                let frame = self.frame(frame_id);
                // Pages `tid` only read may be latched by other readers.
                if !frame.has_before_image_of(page_id, tid) {
                    continue;
                }
                let mut page = frame.page_mut();
                let mut meta = frame.meta();
                if meta.page_id != Some(page_id) {
                    continue;
                }
                let Some(before) = meta.take_before_image(tid) else {
                    continue;
                };

                page.copy_from(&before.image);
                meta.dirty = None;
                if before.on_disk {
                    self.file(page_id.table_id)?.write_page(page_id, &page)?;
                    BufferPoolStats::incr(&self.stats.pages_written);
                }
                BufferPoolStats::incr(&self.stats.pages_rolled_back);
                debug!("{tid} rolled back {page_id}");
            }
            Ok(())
        })?;

        let stolen: Vec<(PageId, BeforeImage)> = {
            let mut state = self.state.lock();
            let owned: Vec<PageId> = state
                .stolen
                .iter()
                .filter(|(_, before)| before.owner == tid)
                .map(|(&page_id, _)| page_id)
                .collect();
            owned
                .into_iter()
                .filter_map(|page_id| state.stolen.remove(&page_id).map(|b| (page_id, b)))
                .collect()
        };
        for (page_id, before) in stolen {
            self.file(page_id.table_id)?.write_page(page_id, &before.image)?;
            BufferPoolStats::incr(&self.stats.pages_written);
            BufferPoolStats::incr(&self.stats.pages_rolled_back);
            debug!("{tid} rolled back evicted {page_id}");
        }

        self.log.log_abort(tid)?;
        self.log.force()
    }
}
