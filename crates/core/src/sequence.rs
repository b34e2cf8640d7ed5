//! Product id sequence.
//!
//! Product ids start at 1 and grow by exactly one per insertion. They come from
//! a counter rather than from `max(existing) + 1`, so concurrent inserts never
//! collide and ids of deleted products are never handed out again.

use std::sync::atomic::{AtomicI32, Ordering};

use crate::types::ProductId;

/// Lock-free product id counter for in-process stores.
///
/// ```
/// use wardrobe_core::{ProductId, ProductIdSequence};
///
/// let seq = ProductIdSequence::new();
/// assert_eq!(seq.next_id(), Some(ProductId::new(1)));
/// assert_eq!(seq.next_id(), Some(ProductId::new(2)));
/// ```
#[derive(Debug, Default)]
pub struct ProductIdSequence {
    last: AtomicI32,
}

impl ProductIdSequence {
    /// A sequence whose first id is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_after(0)
    }

    /// A sequence that resumes after `last` (e.g. the highest id already stored).
    #[must_use]
    pub const fn starting_after(last: i32) -> Self {
        Self {
            last: AtomicI32::new(last),
        }
    }

    /// Reserve the next id. Returns `None` once the `i32` space is exhausted.
    pub fn next_id(&self) -> Option<ProductId> {
        self.last
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                last.checked_add(1)
            })
            .ok()
            .map(|previous| ProductId::new(previous + 1))
    }

    /// The most recently issued id (0 before the first call).
    #[must_use]
    pub fn last_issued(&self) -> i32 {
        self.last.load(Ordering::Acquire)
    }
}
