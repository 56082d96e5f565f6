//! Ordered index of bucket numbers
//!
//! This module provides a thread-safe, always-sorted, duplicate-free sequence
//! of bucket numbers. The bucketer uses it to answer rank queries: for a given
//! bucket number, where does it sit (or where would it be inserted) among the
//! bucket numbers seen so far.

use parking_lot::Mutex;

use crate::error::{Error, Result};

/// Thread-safe ordered set of bucket numbers.
///
/// Every operation takes the internal lock exactly once, so no caller can
/// observe a partially applied insert or removal. Insertion is a binary search
/// followed by a positional `Vec::insert`; the linear shift is acceptable
/// because the number of distinct buckets is expected to stay orders of
/// magnitude below the query volume.
#[derive(Debug, Default)]
pub struct SortedNumberIndex {
    inner: Mutex<Vec<u64>>,
}

impl SortedNumberIndex {
    /// Create an empty index.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Vec::new()),
        }
    }

    /// Number of distinct entries.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the index holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Insert `n` at its sorted position. No-op if already present.
    pub fn add(&self, n: u64) {
        let mut inner = self.inner.lock();
        let (exact, insertion) = Self::search(&inner, n);
        if exact != insertion as isize {
            inner.insert(insertion, n);
        }
    }

    /// Whether `n` is present.
    pub fn contains(&self, n: u64) -> bool {
        let inner = self.inner.lock();
        let (exact, insertion) = Self::search(&inner, n);
        exact == insertion as isize
    }

    /// The entry at sorted position `i`.
    pub fn get(&self, i: usize) -> Result<u64> {
        let inner = self.inner.lock();
        inner.get(i).copied().ok_or(Error::IndexOutOfBounds {
            index: i,
            len: inner.len(),
        })
    }

    /// Remove and return the entry at sorted position `i`.
    pub fn remove_at(&self, i: usize) -> Result<u64> {
        let mut inner = self.inner.lock();
        if i >= inner.len() {
            return Err(Error::IndexOutOfBounds {
                index: i,
                len: inner.len(),
            });
        }
        Ok(inner.remove(i))
    }

    /// Rank `n` against the current entries, returning `(exact, insertion)`.
    ///
    /// - `n` present at position `p`: both values are `p`.
    /// - `n` smaller than every entry (or the index is empty): `(-1, 0)`.
    /// - `n` larger than every entry: `(len() - 1, len())`.
    /// - `n` strictly between two adjacent entries: `exact` is the position of
    ///   the greatest entry below `n`, `insertion` is `exact + 1`.
    pub fn rank(&self, n: u64) -> (isize, usize) {
        Self::search(&self.inner.lock(), n)
    }

    /// Copy of the entries at positions `start..=end`, clamped to the current
    /// length. Empty when the window is empty or starts past the end. Taken
    /// under one lock acquisition, so the window is positionally consistent.
    pub fn span(&self, start: usize, end: usize) -> Vec<u64> {
        let inner = self.inner.lock();
        if start >= inner.len() || end < start {
            return Vec::new();
        }
        let end = end.min(inner.len() - 1);
        inner[start..=end].to_vec()
    }

    // Binary search narrowing [begin, end] by midpoint comparison, then one
    // final equality check to tell exact match from between-entries.
    fn search(items: &[u64], n: u64) -> (isize, usize) {
        if items.is_empty() || n < items[0] {
            return (-1, 0);
        }
        let last = items.len() - 1;
        if n > items[last] {
            return (last as isize, items.len());
        }

        let mut begin = 0usize;
        let mut end = last;
        while end > begin {
            let mid = (begin + end) / 2;
            let el = items[mid];
            if el > n {
                end = mid;
            } else if el < n {
                begin = mid + 1;
            } else {
                return (mid as isize, mid);
            }
        }

        if items[end] == n {
            (begin as isize, end)
        } else {
            (begin as isize - 1, end)
        }
    }
}
