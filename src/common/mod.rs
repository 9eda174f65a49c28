//! Common types and utilities shared across heapstore.
//!
//! This module contains fundamental primitives used throughout the codebase:
//! - Configuration ([`Config`] and default constants)
//! - Error types
//! - Identifiers ([`TableId`], [`PageId`], [`FrameId`], [`TransactionId`])

pub mod config;
pub mod error;
mod frame_id;
mod page_id;
mod transaction_id;

pub use config::Config;
pub use error::{Error, Result};
pub use frame_id::FrameId;
pub use page_id::{PageId, TableId};
pub use transaction_id::TransactionId;
