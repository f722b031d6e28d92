//! # Fusion Module
//!
//! Complementary-filter orientation estimation.
//!
//! See [`estimator::OrientationEstimator`] for the per-cycle algorithm.

pub mod estimator;

pub use estimator::{OrientationEstimator, OrientationSnapshot, OrientationState, References};
