//! Storage layer - disk I/O, page formats and heap files.
//!
//! This module handles persistent storage:
//! - [`DiskManager`] - Low-level page-granular file I/O
//! - [`page`] - Raw pages and the slotted heap page layout
//! - [`HeapFile`] - A table stored as an unordered sequence of heap pages

mod disk_manager;
mod heap_file;
pub mod page;

pub use disk_manager::DiskManager;
pub use heap_file::{DbFileIterator, HeapFile, HeapFileIterator};
