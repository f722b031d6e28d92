//! Moving-average filters.

use super::SignalFilter;

/// Simple moving average over a ring buffer of the last N samples
///
/// The window starts filled with zeros. Each update is O(1): the evicted
/// sample is subtracted and the new one added, both scaled by 1/N.
#[derive(Debug, Clone)]
pub struct SimpleMovingAverage {
    buffer: Vec<f32>,
    next: usize,
    value: f32,
    factor: f32,
}

impl SimpleMovingAverage {
    /// Creates a filter averaging `size` samples (at least one)
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            buffer: vec![0.0; size],
            next: 0,
            value: 0.0,
            factor: 1.0 / size as f32,
        }
    }

    /// Window length
    #[must_use]
    pub fn size(&self) -> usize {
        self.buffer.len()
    }
}

impl SignalFilter for SimpleMovingAverage {
    fn update(&mut self, sample: f32) -> f32 {
        self.value += self.factor * (sample - self.buffer[self.next]);
        self.buffer[self.next] = sample;
        self.next = (self.next + 1) % self.buffer.len();
        self.value
    }

    fn value(&self) -> f32 {
        self.value
    }
}

/// Exponential moving average: `value += alpha * (sample - value)`
#[derive(Debug, Clone, Copy)]
pub struct ExponentialMovingAverage {
    alpha: f32,
    value: f32,
}

impl ExponentialMovingAverage {
    /// Creates a filter with coefficient `alpha`, clamped to 0..=1, starting at zero
    #[must_use]
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            value: 0.0,
        }
    }

    /// Changes the filter coefficient
    pub fn set_alpha(&mut self, alpha: f32) {
        self.alpha = alpha.clamp(0.0, 1.0);
    }

    #[must_use]
    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    /// Restarts the filter at `value`
    pub fn reset(&mut self, value: f32) {
        self.value = value;
    }
}

impl SignalFilter for ExponentialMovingAverage {
    fn update(&mut self, sample: f32) -> f32 {
        self.value += self.alpha * (sample - self.value);
        self.value
    }

    fn value(&self) -> f32 {
        self.value
    }
}
