//! # Signal Filter Module
//!
//! Smoothing primitives for potentiometer and gain inputs.
//!
//! Every filter consumes one sample at a time through [`SignalFilter::update`]
//! and returns the new filtered value, so filters can be swapped per channel:
//!
//! - [`SimpleMovingAverage`]: mean of the last N samples
//! - [`ExponentialMovingAverage`]: fixed-coefficient low pass
//! - [`AdaptiveExponentialMovingAverage`]: coefficient follows the signal's deviation
//! - [`MedianOfWindow`]: (N/2)-th element of the sorted window

pub mod adaptive;
pub mod average;
pub mod median;

pub use adaptive::AdaptiveExponentialMovingAverage;
pub use average::{ExponentialMovingAverage, SimpleMovingAverage};
pub use median::MedianOfWindow;

/// Single-input, single-output smoothing filter
pub trait SignalFilter {
    /// Feed a new sample and return the filtered value
    fn update(&mut self, sample: f32) -> f32;

    /// Current filtered value
    fn value(&self) -> f32;
}
