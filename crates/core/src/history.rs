//! Bounded, volatile buffer of recent points.
//!
//! Nothing here is persisted; the buffer lives as long as the process.

use std::collections::VecDeque;
use std::sync::{Arc, PoisonError, RwLock};

use crate::point::CanonicalPoint;

/// Default number of points retained.
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Fixed-capacity FIFO of the most recent points.
///
/// Writers and readers are serialised by an `RwLock`, so a reader never
/// observes a half-applied append or eviction. Readers get their own
/// `Vec`; the points themselves are immutable and shared.
#[derive(Debug)]
pub struct HistoryBuffer {
    points: RwLock<VecDeque<Arc<CanonicalPoint>>>,
    capacity: usize,
}

impl HistoryBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            points: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Append `point`, evicting the oldest entry first when full.
    pub fn add(&self, point: Arc<CanonicalPoint>) {
        if self.capacity == 0 {
            return;
        }
        let mut points = self.points.write().unwrap_or_else(PoisonError::into_inner);
        while points.len() >= self.capacity {
            points.pop_front();
        }
        points.push_back(point);
    }

    /// Snapshot of every retained point, oldest first.
    pub fn get_all(&self) -> Vec<Arc<CanonicalPoint>> {
        let points = self.points.read().unwrap_or_else(PoisonError::into_inner);
        points.iter().cloned().collect()
    }

    /// Snapshot of the last `min(count, len)` points, oldest first.
    pub fn get_recent(&self, count: usize) -> Vec<Arc<CanonicalPoint>> {
        let points = self.points.read().unwrap_or_else(PoisonError::into_inner);
        let skip = points.len().saturating_sub(count);
        points.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.points
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for HistoryBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
