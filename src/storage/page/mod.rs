//! Page types and layout.
//!
//! This module contains:
//! - [`Page`] - The raw fixed-size byte container cached by the buffer pool
//! - [`HeapPage`] - Slotted-tuple view over a page's bytes

mod heap_page;
#[allow(clippy::module_inception)]
mod page;

pub use heap_page::{HeapPage, HeapPageLayout};
pub use page::Page;
