//! RAII guards for page access.
//!
//! These guards provide safe access to pages in the buffer pool:
//! - [`PageReadGuard`] - Shared read access (multiple allowed)
//! - [`PageWriteGuard`] - Exclusive write access
//! - [`PageGuard`] - Either of the above, as returned by
//!   [`BufferPool::get_page`]
//!
//! Guards pin their frame and hold its latch. Both are released on drop.
//! The transaction lock that admitted the guard is not: it is held until
//! the transaction completes.
//!
//! A transaction must drop its guards before it commits or aborts.

use std::ops::{Deref, DerefMut};

use parking_lot::{RwLockReadGuard, RwLockWriteGuard};

use crate::buffer::frame::BeforeImage;
use crate::buffer::BufferPool;
use crate::common::{FrameId, PageId, TransactionId};
use crate::concurrency::Permission;
use crate::storage::page::Page;

/// Guard for read-only page access.
///
/// # Example
/// ```ignore
/// let guard = pool.get_page_read(tid, page_id)?;
/// let data = guard.as_slice();  // Deref to &Page
/// // guard drops here, page unpinned
/// ```
pub struct PageReadGuard<'a> {
    pool: &'a BufferPool,
    frame_id: FrameId,
    page_id: PageId,
    lock: RwLockReadGuard<'a, Page>,
}

impl<'a> PageReadGuard<'a> {
    /// Called by `BufferPool::get_page()` with the frame already pinned.
    pub(crate) fn new(
        pool: &'a BufferPool,
        frame_id: FrameId,
        page_id: PageId,
        lock: RwLockReadGuard<'a, Page>,
    ) -> Self {
        Self {
            pool,
            frame_id,
            page_id,
            lock,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }
}

impl Deref for PageReadGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl Drop for PageReadGuard<'_> {
    fn drop(&mut self) {
        self.pool.unpin_frame(self.frame_id);
    }
}

/// Guard for exclusive write access to a page.
///
/// The first mutable access records the page's before-image for the
/// owning transaction (unless it already has one). If the page was
/// mutated, dropping the guard marks it dirty by that transaction.
///
/// # Example
/// ```ignore
/// let mut guard = pool.get_page_write(tid, page_id)?;
/// guard.as_mut_slice()[0] = 0xFF;  // DerefMut to &mut Page
/// // guard drops here, page marked dirty by tid and unpinned
/// ```
pub struct PageWriteGuard<'a> {
    pool: &'a BufferPool,
    frame_id: FrameId,
    page_id: PageId,
    tid: TransactionId,
    lock: RwLockWriteGuard<'a, Page>,
    mutated: bool,
}

impl<'a> PageWriteGuard<'a> {
    /// Called by `BufferPool::get_page()` with the frame already pinned.
    pub(crate) fn new(
        pool: &'a BufferPool,
        frame_id: FrameId,
        page_id: PageId,
        tid: TransactionId,
        lock: RwLockWriteGuard<'a, Page>,
    ) -> Self {
        Self {
            pool,
            frame_id,
            page_id,
            tid,
            lock,
            mutated: false,
        }
    }

    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Whether the page has been mutably accessed through this guard.
    #[inline]
    pub fn is_mutated(&self) -> bool {
        self.mutated
    }
}

impl Deref for PageWriteGuard<'_> {
    type Target = Page;

    #[inline]
    fn deref(&self) -> &Page {
        &self.lock
    }
}

impl DerefMut for PageWriteGuard<'_> {
    fn deref_mut(&mut self) -> &mut Page {
        if !self.mutated {
            let mut meta = self.pool.frame(self.frame_id).meta();
            let owned = matches!(&meta.before_image, Some(b) if b.owner == self.tid);
            if !owned {
                meta.before_image = Some(BeforeImage::capture(self.tid, &self.lock));
            }
            self.mutated = true;
        }
        &mut self.lock
    }
}

impl Drop for PageWriteGuard<'_> {
    fn drop(&mut self) {
        if self.mutated {
            self.pool.frame(self.frame_id).meta().dirty = Some(self.tid);
        }
        self.pool.unpin_frame(self.frame_id);
    }
}

/// A read or write guard, chosen by the requested [`Permission`].
pub enum PageGuard<'a> {
    Read(PageReadGuard<'a>),
    Write(PageWriteGuard<'a>),
}

impl<'a> PageGuard<'a> {
    pub fn page_id(&self) -> PageId {
        match self {
            PageGuard::Read(g) => g.page_id(),
            PageGuard::Write(g) => g.page_id(),
        }
    }

    pub fn permission(&self) -> Permission {
        match self {
            PageGuard::Read(_) => Permission::Read,
            PageGuard::Write(_) => Permission::Write,
        }
    }

    /// Mutable access, available only for write guards.
    pub fn as_write(&mut self) -> Option<&mut PageWriteGuard<'a>> {
        match self {
            PageGuard::Read(_) => None,
            PageGuard::Write(g) => Some(g),
        }
    }
}

impl Deref for PageGuard<'_> {
    type Target = Page;

    fn deref(&self) -> &Page {
        match self {
            PageGuard::Read(g) => &**g,
            PageGuard::Write(g) => &**g,
        }
    }
}
