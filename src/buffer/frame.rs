//! Frame - a slot in the buffer pool.
//!
//! A [`Frame`] holds a [`Page`] plus metadata needed for buffer management:
//! - Which page is loaded (if any)
//! - Pin count for reference counting
//! - Which transaction dirtied it, and the page content before that
//!   transaction's first change

use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::{Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::common::{PageId, TransactionId};
use crate::storage::page::Page;

/// Page content as it was before `owner` first modified it.
#[derive(Debug)]
pub(crate) struct BeforeImage {
    pub owner: TransactionId,
    pub image: Page,
    /// Uncommitted content has reached disk, so abort must write `image`
    /// back rather than only restore the cached copy.
    pub on_disk: bool,
}

impl BeforeImage {
    pub fn capture(owner: TransactionId, page: &Page) -> Self {
        Self {
            owner,
            image: page.snapshot(),
            on_disk: false,
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct FrameMeta {
    pub page_id: Option<PageId>,
    pub dirty: Option<TransactionId>,
    pub before_image: Option<BeforeImage>,
}

impl FrameMeta {
    pub fn reset(&mut self) {
        *self = FrameMeta::default();
    }

    /// Remove and return the before-image if `owner` holds it.
    pub fn take_before_image(&mut self, owner: TransactionId) -> Option<BeforeImage> {
        let owned = self.before_image.as_ref().is_some_and(|b| b.owner == owner);
        if owned {
            self.before_image.take()
        } else {
            None
        }
    }
}

/// A frame in the buffer pool.
///
/// # Thread Safety
/// - `page`: `RwLock` latch over the bytes
/// - `meta`: `Mutex`, always taken after the latch when both are needed
/// - `pin_count`: `AtomicU32` for lock-free reference counting
pub struct Frame {
    page: RwLock<Page>,
    meta: Mutex<FrameMeta>,
    pin_count: AtomicU32,
}

impl Frame {
    /// Create a new empty frame holding a zeroed page.
    pub fn new(page_size: usize) -> Self {
        Self {
            page: RwLock::new(Page::new(page_size)),
            meta: Mutex::new(FrameMeta::default()),
            pin_count: AtomicU32::new(0),
        }
    }

    // ========================================================================
    // Page access (RwLock)
    // ========================================================================

    #[inline]
    pub(crate) fn page(&self) -> RwLockReadGuard<'_, Page> {
        self.page.read()
    }

    #[inline]
    pub(crate) fn page_mut(&self) -> RwLockWriteGuard<'_, Page> {
        self.page.write()
    }

    #[inline]
    pub(crate) fn meta(&self) -> MutexGuard<'_, FrameMeta> {
        self.meta.lock()
    }

    // ========================================================================
    // Pin count operations (Atomic)
    // ========================================================================

    /// Increment the pin count. Returns the new pin count.
    #[inline]
    pub(crate) fn pin(&self) -> u32 {
        self.pin_count.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Decrement the pin count. Returns the new pin count.
    ///
    /// # Panics
    /// Panics if pin count is already 0.
    #[inline]
    pub(crate) fn unpin(&self) -> u32 {
        let old = self.pin_count.fetch_sub(1, Ordering::AcqRel);
        assert!(old > 0, "pin count underflow");
        old - 1
    }

    #[inline]
    pub fn pin_count(&self) -> u32 {
        self.pin_count.load(Ordering::Acquire)
    }

    #[inline]
    pub fn is_pinned(&self) -> bool {
        self.pin_count() > 0
    }

    // ========================================================================
    // Frame state queries
    // ========================================================================

    pub fn page_id(&self) -> Option<PageId> {
        self.meta().page_id
    }

    pub fn is_dirty(&self) -> bool {
        self.meta().dirty.is_some()
    }

    /// The transaction whose changes have not yet been written back.
    pub fn dirtied_by(&self) -> Option<TransactionId> {
        self.meta().dirty
    }

    /// Whether the frame holds `page_id` with a before-image owned by `owner`.
    pub(crate) fn has_before_image_of(&self, page_id: PageId, owner: TransactionId) -> bool {
        let meta = self.meta();
        meta.page_id == Some(page_id)
            && meta.before_image.as_ref().is_some_and(|b| b.owner == owner)
    }
}
