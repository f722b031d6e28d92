//! Running median over a fixed window.

use super::SignalFilter;

/// Median-of-window filter
///
/// Keeps the window twice: in arrival order (a ring buffer deciding which
/// sample is evicted) and in ascending order. Each update removes the evicted
/// sample from the sorted copy and inserts the new sample at its sorted
/// position, so the sorted invariant holds after every insert/evict pair.
///
/// Ordering is IEEE total order, so a NaN sample occupies one slot like any
/// other value and leaves the window when it is evicted.
///
/// The reported value is the element at index `size / 2` of the sorted
/// window. For an even window this is the upper of the two middle elements,
/// not their mean.
#[derive(Debug, Clone)]
pub struct MedianOfWindow {
    unsorted: Vec<f32>,
    sorted: Vec<f32>,
    head: usize,
}

impl MedianOfWindow {
    /// Creates a window of `size` samples (at least one), initially all zero
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            unsorted: vec![0.0; size],
            sorted: vec![0.0; size],
            head: 0,
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.unsorted.len()
    }

    /// Window contents in ascending order
    #[must_use]
    pub fn sorted(&self) -> &[f32] {
        &self.sorted
    }
}

impl SignalFilter for MedianOfWindow {
    fn update(&mut self, sample: f32) -> f32 {
        let oldest = self.unsorted[self.head];
        if let Some(index) = self.sorted.iter().position(|v| v.total_cmp(&oldest).is_eq()) {
            self.sorted.remove(index);
        }

        let index = self.sorted.partition_point(|v| v.total_cmp(&sample).is_lt());
        self.sorted.insert(index, sample);

        self.unsorted[self.head] = sample;
        self.head = (self.head + 1) % self.unsorted.len();

        self.value()
    }

    fn value(&self) -> f32 {
        self.sorted[self.sorted.len() / 2]
    }
}
