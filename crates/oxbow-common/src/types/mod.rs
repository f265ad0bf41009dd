//! Core types for Oxbow.
//!
//! This module exposes the identifier newtypes and the fixed-width
//! key/value machinery used by the storage and index layers.

mod ids;
mod keys;

pub use ids::{Lsn, PageId, TxnId};
pub use keys::{GenericKey, Key16, Key32, Key4, Key64, Key8, KeyComparator, OrdComparator, RecordId, Storable};
