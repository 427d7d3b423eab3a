use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Counts how many times the fixtures that share it have been dropped.
///
/// Clones share the same count, so a fixture and all of its copies report into one counter.
/// A default counter is fresh and unshared.
#[derive(Clone, Debug, Default)]
pub struct DropCounter {
    drops: Arc<AtomicUsize>,
}

impl DropCounter {
    /// Creates a counter that has seen no drops.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// How many drops have been recorded so far.
    #[must_use]
    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::Relaxed)
    }

    pub(crate) fn record(&self) {
        self.drops.fetch_add(1, Ordering::Relaxed);
    }
}
