//! # oxbow-common
//!
//! Common types and utilities for the Oxbow storage engine.
//!
//! This crate provides the foundational types used across all Oxbow
//! components. It includes:
//!
//! - **Types**: Core identifiers (`PageId`, `TxnId`, `Lsn`), fixed-width
//!   key/value codecs, and comparator seams
//! - **Constants**: System-wide constants and limits
//!
//! ## Example
//!
//! ```rust
//! use oxbow_common::types::{PageId, Storable};
//!
//! let page_id = PageId::new(42);
//! assert!(page_id.is_valid());
//!
//! let mut buf = [0u8; 4];
//! 7i32.write_to(&mut buf);
//! assert_eq!(i32::read_from(&buf), 7);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::{GenericKey, KeyComparator, Lsn, OrdComparator, PageId, RecordId, Storable, TxnId};
