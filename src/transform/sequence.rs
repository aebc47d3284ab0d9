//! Surrogate key generation for fact rows

use std::sync::atomic::{AtomicI64, Ordering};

/// Source of surrogate keys.
///
/// Each call returns an id no other call on the same generator returns.
/// Nothing else is promised: ids are neither dense nor ordered across
/// generators, and they are not stable from one run to the next.
pub trait SequenceGenerator: Send + Sync {
    /// Produce the next id
    fn next_id(&self) -> i64;
}

/// Atomic counter seeded per partition.
///
/// The partition index occupies the bits above bit 33, so generators built
/// for different partitions never hand out the same id.
#[derive(Debug)]
pub struct MonotonicIds {
    next: AtomicI64,
}

impl MonotonicIds {
    /// Generator for partition 0
    pub fn new() -> Self {
        Self::for_partition(0)
    }

    /// Generator for the given partition index
    pub fn for_partition(partition: u32) -> Self {
        Self {
            next: AtomicI64::new(i64::from(partition) << 33),
        }
    }
}

impl Default for MonotonicIds {
    fn default() -> Self {
        Self::new()
    }
}

impl SequenceGenerator for MonotonicIds {
    fn next_id(&self) -> i64 {
        self.next.fetch_add(1, Ordering::Relaxed)
    }
}
