//! Page - the fixed-size unit of storage.
//!
//! A [`Page`] is an opaque byte buffer of `page_size` bytes. It is the unit
//! of I/O between heap files and the buffer pool. The pool never looks inside
//! it; [`HeapPage`](super::HeapPage) interprets the bytes as slotted tuples.

/// A page of data.
///
/// The size is fixed at construction and shared by every file and by the
/// buffer pool (see [`Config::page_size`](crate::Config)).
///
/// # Copying
/// `Page` does not implement `Clone`: copying a page is how before-images are
/// taken, so it is spelled out with [`Page::snapshot`] or [`Page::copy_from`].
///
/// # Example
/// ```
/// use heapstore::storage::page::Page;
///
/// let mut page = Page::new(4096);
/// page.as_mut_slice()[0] = 0xFF;
/// assert_eq!(page.as_slice()[0], 0xFF);
/// assert_eq!(page.size(), 4096);
/// ```
#[derive(Debug, PartialEq, Eq)]
pub struct Page {
    data: Box<[u8]>,
}

impl Page {
    /// Create a new zeroed page.
    pub fn new(page_size: usize) -> Self {
        Self {
            data: vec![0u8; page_size].into_boxed_slice(),
        }
    }

    /// Create a page that takes ownership of `data`.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self {
            data: data.into_boxed_slice(),
        }
    }

    /// Get immutable slice of page data.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get mutable slice of page data.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Size of the page in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// Byte-for-byte copy of this page.
    pub fn snapshot(&self) -> Page {
        Page {
            data: self.data.clone(),
        }
    }

    /// Overwrite this page with the content of `other`.
    ///
    /// # Panics
    /// Panics if the two pages differ in size.
    pub fn copy_from(&mut self, other: &Page) {
        self.data.copy_from_slice(&other.data);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_new_is_zeroed() {
        let page = Page::new(4096);
        assert_eq!(page.size(), 4096);
        assert!(page.as_slice().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_page_read_write() {
        let mut page = Page::new(4096);

        page.as_mut_slice()[0] = 0xFF;
        page.as_mut_slice()[4095] = 0xCD;

        assert_eq!(page.as_slice()[0], 0xFF);
        assert_eq!(page.as_slice()[4095], 0xCD);
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut page = Page::new(64);
        page.as_mut_slice()[0] = 1;

        let before = page.snapshot();
        page.as_mut_slice()[0] = 2;

        assert_eq!(before.as_slice()[0], 1);
        page.copy_from(&before);
        assert_eq!(page.as_slice()[0], 1);
    }

    #[test]
    fn test_from_bytes() {
        let page = Page::from_bytes(vec![7u8; 32]);
        assert_eq!(page.size(), 32);
        assert_eq!(page.as_slice()[31], 7);
    }
}
