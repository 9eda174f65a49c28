//! Disk Manager - page-addressed file I/O for one heap file.
//!
//! The [`DiskManager`] handles all direct file operations:
//! - Reading and writing whole pages at `page_no × page_size`
//! - Growing the file by one zeroed page
//! - Tracking the file's extent in pages

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

use crate::common::{Error, PageId, Result};
use crate::storage::page::Page;

/// Manages disk I/O for a single table file.
///
/// # File Layout
/// The file is a headerless sequence of fixed-size pages:
/// ```text
/// ┌─────────┬─────────┬─────────┬─────────┬─────────┐
/// │ Page 0  │ Page 1  │ Page 2  │  ...    │ Page N  │
/// └─────────┴─────────┴─────────┴─────────┴─────────┘
/// Offset:  0   1×size   2×size    ...    N×size
/// ```
///
/// # Thread Safety
/// `DiskManager` is **single-threaded**. [`HeapFile`](super::HeapFile) wraps
/// it in a mutex.
///
/// # Durability
/// Every write is followed by `sync_data()`. The buffer pool relies on this
/// when it flushes committed pages.
pub struct DiskManager {
    file: File,
    page_size: usize,
    /// Number of pages in the file, rounding a partial trailing page up.
    page_count: u32,
}

impl DiskManager {
    /// Create a new, empty table file.
    ///
    /// # Errors
    /// Returns an error if the file already exists or cannot be created.
    pub fn create<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(path)?;

        Ok(Self {
            file,
            page_size,
            page_count: 0,
        })
    }

    /// Open an existing table file.
    ///
    /// # Errors
    /// Returns an error if the file doesn't exist or cannot be opened.
    pub fn open<P: AsRef<Path>>(path: P, page_size: usize) -> Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(&path)?;

        let file_size = file.metadata()?.len();
        let page_count = file_size.div_ceil(page_size as u64) as u32;

        Ok(Self {
            file,
            page_size,
            page_count,
        })
    }

    /// Read one page.
    ///
    /// A partial trailing page is zero-filled to the full page size.
    ///
    /// # Errors
    /// Returns `Error::PageNotFound` if the page lies past the end of the file.
    pub fn read_page(&mut self, page_id: PageId) -> Result<Page> {
        if page_id.page_no >= self.page_count {
            return Err(Error::PageNotFound(page_id));
        }

        self.file
            .seek(SeekFrom::Start(page_id.offset(self.page_size)))?;

        let mut data = Vec::with_capacity(self.page_size);
        (&mut self.file)
            .take(self.page_size as u64)
            .read_to_end(&mut data)?;
        data.resize(self.page_size, 0);

        Ok(Page::from_bytes(data))
    }

    /// Write one page, extending the file if the page lies past its end.
    ///
    /// # Errors
    /// `Error::PageSizeMismatch` if `page` is not exactly `page_size` bytes.
    pub fn write_page(&mut self, page_id: PageId, page: &Page) -> Result<()> {
        if page.size() != self.page_size {
            return Err(Error::PageSizeMismatch {
                expected: self.page_size,
                actual: page.size(),
            });
        }

        self.file.seek(SeekFrom::Start(page_id.offset(self.page_size)))?;
        self.file.write_all(page.as_slice())?;
        self.file.sync_data()?;

        self.page_count = self.page_count.max(page_id.page_no + 1);
        Ok(())
    }

    /// Append a zeroed page and return its page number.
    pub fn allocate_page(&mut self) -> Result<u32> {
        let page_no = self.page_count;
        let offset = (page_no as u64) * (self.page_size as u64);

        self.file.seek(SeekFrom::Start(offset))?;
        self.file.write_all(&vec![0u8; self.page_size])?;
        self.file.sync_data()?;

        self.page_count += 1;
        Ok(page_no)
    }

    /// Number of pages in the file.
    #[inline]
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    #[inline]
    pub fn page_size(&self) -> usize {
        self.page_size
    }
}
