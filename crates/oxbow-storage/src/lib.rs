//! # oxbow-storage
//!
//! The storage core of Oxbow: a paged buffer pool over a disk manager,
//! CLOCK page replacement, and a linear-probing on-disk hash index.
//!
//! The layering, leaves first:
//!
//! - [`disk`]: the disk manager seam, fixed-size page I/O against a
//!   single data file with monotonically increasing page allocation.
//! - [`buffer`]: the buffer pool manager, a bounded set of in-memory
//!   frames mapped to on-disk pages, with pin counting, dirty tracking,
//!   and CLOCK eviction.
//! - [`page`]: typed byte layouts for the pages the hash index persists.
//! - [`index`]: the linear-probing hash table, which acquires all of its
//!   pages through the buffer pool.
//! - [`log`]: a minimal append-only log sink the pool can hold as a
//!   collaborator.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod disk;
pub mod index;
pub mod log;
pub mod page;
