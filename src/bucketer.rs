//! Integer bucketing with opaque identifiers
//!
//! This module maps signed 64-bit values onto fixed-width buckets and hands
//! out a randomly drawn identifier per bucket. Identifiers carry no trace of
//! the value ordering; range queries (GEQ/LEQ/BETWEEN) recover it through the
//! internal ordered index instead. This is what lets a backing store evaluate
//! range predicates over tokenized values without learning their order from
//! the stored tokens.

use ahash::{AHashMap, AHashSet};
use parking_lot::Mutex;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::index::SortedNumberIndex;

/// Minimum supported bucket width. Narrower widths make bucket boundaries
/// degenerate relative to the sign-remapping arithmetic.
pub const MIN_BUCKET_WIDTH: u64 = 3;

/// Collision re-roll budget for identifier generation.
const MAX_ID_ATTEMPTS: u32 = 10_000;

/// Offset that remaps `i64::MIN..=i64::MAX` onto `0..=u64::MAX` in order.
const SIGN_OFFSET: u64 = 1 << 63;

/// Value range covered by a single bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketRange {
    /// Smallest value that maps to the bucket.
    pub min: i64,
    /// Largest value that maps to the bucket.
    pub max: i64,
    /// Whether the bucket touches `i64::MIN`.
    pub is_first: bool,
    /// Whether the bucket touches `i64::MAX`.
    pub is_last: bool,
}

/// Identifier state guarded by the bucketer's critical section.
///
/// Invariant: a bucket number has an entry in `by_bucket` iff its identifier
/// is in `issued` iff the bucket number is in the ordered index. All three are
/// updated inside one critical section.
#[derive(Debug, Default)]
struct IdTable {
    /// bucket number -> identifier
    by_bucket: AHashMap<u64, i64>,
    /// every identifier issued so far, for collision detection
    issued: AHashSet<i64>,
}

/// Order-preserving bucketer for signed 64-bit values.
///
/// Safe to share across threads behind an `Arc`; all interior state is
/// lock-protected. Lock order is always the identifier table first, then the
/// index's internal lock.
#[derive(Debug)]
pub struct IntegerBucketer {
    width: u64,
    ids: Mutex<IdTable>,
    index: SortedNumberIndex,
}

impl IntegerBucketer {
    /// Create a bucketer with the given bucket width.
    ///
    /// Fails with [`Error::InvalidBucketWidth`] when `width` is below
    /// [`MIN_BUCKET_WIDTH`].
    pub fn new(width: u64) -> Result<Self> {
        if width < MIN_BUCKET_WIDTH {
            return Err(Error::InvalidBucketWidth(width));
        }
        Ok(Self {
            width,
            ids: Mutex::new(IdTable::default()),
            index: SortedNumberIndex::new(),
        })
    }

    /// The configured bucket width.
    pub fn width(&self) -> u64 {
        self.width
    }

    /// Number of distinct buckets that have been assigned an identifier.
    pub fn bucket_count(&self) -> usize {
        self.index.len()
    }

    /// The bucket number for `value`.
    ///
    /// Pure and deterministic; monotonically non-decreasing in `value`.
    pub fn bucket_number_of(&self, value: i64) -> u64 {
        Self::to_unsigned(value) / self.width
    }

    /// The identifier for the bucket containing `value`, assigning one on
    /// first contact with that bucket.
    ///
    /// The check-then-create path runs under one critical section, so two
    /// concurrent calls for the same never-seen bucket cannot issue two
    /// identifiers. Fails with [`Error::IdSpaceExhausted`] if the collision
    /// re-roll budget runs out, leaving no partial state behind.
    pub fn get_bucket_id(&self, value: i64) -> Result<i64> {
        let bucket_no = self.bucket_number_of(value);

        let mut ids = self.ids.lock();
        if let Some(&id) = ids.by_bucket.get(&bucket_no) {
            return Ok(id);
        }

        let id = Self::generate_id(&ids)?;
        ids.issued.insert(id);
        ids.by_bucket.insert(bucket_no, id);
        self.index.add(bucket_no);
        debug!(bucket_no, "assigned new bucket identifier");

        Ok(id)
    }

    /// Identifiers of every known bucket at or after the bucket of `value`.
    ///
    /// With `inclusive` set, the bucket of `value` itself (if known) is part
    /// of the result. Values past the greatest known bucket yield an empty
    /// result. Result order is unspecified.
    pub fn buckets_geq(&self, value: i64, inclusive: bool) -> Vec<i64> {
        let bucket_no = self.bucket_number_of(value);

        let ids = self.ids.lock();
        let (_, insertion) = self.index.rank(bucket_no);
        let start = if inclusive { insertion } else { insertion + 1 };
        self.collect_ids(&ids, start, self.index.len().saturating_sub(1))
    }

    /// Identifiers of every known bucket at or before the bucket of `value`.
    ///
    /// With `inclusive` set, the bucket of `value` itself (if known) is part
    /// of the result. Values before the smallest known bucket yield an empty
    /// result. Result order is unspecified.
    pub fn buckets_leq(&self, value: i64, inclusive: bool) -> Vec<i64> {
        let bucket_no = self.bucket_number_of(value);

        let ids = self.ids.lock();
        let (exact, _) = self.index.rank(bucket_no);
        let end = if inclusive { exact } else { exact - 1 };
        if end < 0 {
            return Vec::new();
        }
        self.collect_ids(&ids, 0, end as usize)
    }

    /// Identifiers of every known bucket between the buckets of `value1` and
    /// `value2`, in either argument order.
    ///
    /// Equivalent to intersecting [`Self::buckets_geq`] of the smaller value
    /// with [`Self::buckets_leq`] of the larger, with the same `inclusive`
    /// flag on both ends.
    pub fn buckets_between(&self, value1: i64, value2: i64, inclusive: bool) -> Vec<i64> {
        let (lo, hi) = if value1 <= value2 {
            (value1, value2)
        } else {
            (value2, value1)
        };
        let lo_no = self.bucket_number_of(lo);
        let hi_no = self.bucket_number_of(hi);

        let ids = self.ids.lock();
        let (_, insertion) = self.index.rank(lo_no);
        let (exact, _) = self.index.rank(hi_no);
        let start = if inclusive { insertion } else { insertion + 1 };
        let end = if inclusive { exact } else { exact - 1 };
        if end < 0 {
            return Vec::new();
        }
        self.collect_ids(&ids, start, end as usize)
    }

    /// The value range that shares a bucket with `value`, plus whether that
    /// bucket sits at either extreme of the representable domain.
    pub fn bucket_range(&self, value: i64) -> BucketRange {
        let bucket_no = self.bucket_number_of(value);
        let low = bucket_no * self.width;
        // the last bucket may be cut short at the top of the domain
        let high = low.saturating_add(self.width - 1);

        let min = Self::to_signed(low);
        let max = Self::to_signed(high);
        BucketRange {
            min,
            max,
            is_first: min == i64::MIN,
            is_last: max == i64::MAX,
        }
    }

    // Maps i64::MIN to 0 and i64::MAX to u64::MAX, preserving order.
    fn to_unsigned(value: i64) -> u64 {
        (value as u64).wrapping_add(SIGN_OFFSET)
    }

    fn to_signed(value: u64) -> i64 {
        value.wrapping_sub(SIGN_OFFSET) as i64
    }

    // Draws from the OS RNG until the candidate is unseen. Caller records the
    // result while still holding the identifier-table lock.
    fn generate_id(ids: &IdTable) -> Result<i64> {
        let mut buf = [0u8; 8];
        for attempt in 0..MAX_ID_ATTEMPTS {
            OsRng.fill_bytes(&mut buf);
            let candidate = i64::from_le_bytes(buf);
            if !ids.issued.contains(&candidate) {
                if attempt > 0 {
                    trace!(attempt, "identifier collision re-rolled");
                }
                return Ok(candidate);
            }
        }
        Err(Error::IdSpaceExhausted(MAX_ID_ATTEMPTS))
    }

    // Identifiers for the index entries at positions start..=end. Index
    // membership implies a mapping entry while the table lock is held.
    fn collect_ids(&self, ids: &IdTable, start: usize, end: usize) -> Vec<i64> {
        self.index
            .span(start, end)
            .into_iter()
            .filter_map(|bucket_no| ids.by_bucket.get(&bucket_no).copied())
            .collect()
    }
}
