//! Configuration for heapstore.
//!
//! Page size and pool capacity are runtime values carried by [`Config`],
//! because on-disk addressing (`page_no × page_size`) and buffer pool
//! capacity both depend on them and every heap file must agree with the pool.

use crate::common::{Error, Result};

/// Default size of a page in bytes (4KB).
///
/// Matches the OS page size on most systems, so one page is one disk block.
pub const DEFAULT_PAGE_SIZE: usize = 4096;

/// Default number of pages the buffer pool caches.
pub const DEFAULT_POOL_PAGES: usize = 50;

/// Fixed payload width of a string field, in bytes.
///
/// Strings longer than this are truncated on serialization.
pub const STRING_LEN: usize = 128;

/// Engine configuration shared by the buffer pool and every heap file.
///
/// # Example
/// ```
/// use heapstore::Config;
///
/// let config = Config::default().with_pool_pages(8);
/// assert_eq!(config.page_size, 4096);
/// assert_eq!(config.pool_pages, 8);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Bytes per page.
    pub page_size: usize,
    /// Maximum number of pages held by the buffer pool.
    pub pool_pages: usize,
}

impl Config {
    /// Set the page size.
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the buffer pool capacity in pages.
    pub fn with_pool_pages(mut self, pool_pages: usize) -> Self {
        self.pool_pages = pool_pages;
        self
    }

    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.pool_pages == 0 {
            return Err(Error::InvalidConfig("pool_pages must be > 0".into()));
        }
        if self.page_size < 8 {
            return Err(Error::InvalidConfig(format!(
                "page_size {} is too small",
                self.page_size
            )));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            pool_pages: DEFAULT_POOL_PAGES,
        }
    }
}
