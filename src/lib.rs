//! opbucket: Order-Preserving Bucketing for signed 64-bit integers
//!
//! This crate maps arbitrary integer values into randomly assigned, opaque
//! bucket identifiers while keeping range queries answerable purely from the
//! identifiers. The identifiers themselves reveal nothing about the ordering
//! of the underlying values; an internal ordered index recovers it on demand.
//! An encrypted-data proxy can use this to let a backing store execute range
//! predicates (≥, ≤, between) over tokenized values.
//!
//! # Example
//!
//! ```
//! use opbucket::IntegerBucketer;
//!
//! let bucketer = IntegerBucketer::new(100)?;
//! let a = bucketer.get_bucket_id(-123)?;
//! let b = bucketer.get_bucket_id(321)?;
//! let c = bucketer.get_bucket_id(890)?;
//!
//! let geq = bucketer.buckets_geq(50, true);
//! assert!(geq.contains(&b) && geq.contains(&c) && !geq.contains(&a));
//! # Ok::<(), opbucket::Error>(())
//! ```
//!
//! All state is in-memory and per instance; nothing is persisted.

#![warn(missing_docs)]

/// Error types shared across the crate
pub mod error;

/// Ordered index of bucket numbers
pub mod index;

/// Bucketing algorithm and range queries
pub mod bucketer;

/// Stress tests for concurrent access
#[cfg(test)]
mod stress_tests;

// Re-exports
pub use bucketer::{BucketRange, IntegerBucketer, MIN_BUCKET_WIDTH};
pub use error::{Error, Result};
pub use index::SortedNumberIndex;
