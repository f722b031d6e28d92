//! Adaptive exponential moving average.

use super::SignalFilter;

const DEFAULT_STRENGTH: f32 = 0.03;
const DEFAULT_DEVIATION_STRENGTH: f32 = 0.02;

/// Exponential moving average whose coefficient adapts every sample
///
/// The filter keeps a smoothed absolute deviation of the input from its
/// output. The instantaneous coefficient is
/// `alpha = min(1, strength * |delta| / deviation)`: a step that is large
/// compared with recent noise is followed quickly, while jitter of typical
/// size is strongly suppressed.
#[derive(Debug, Clone, Copy)]
pub struct AdaptiveExponentialMovingAverage {
    strength: f32,
    deviation_strength: f32,
    value: f32,
    deviation: f32,
}

impl Default for AdaptiveExponentialMovingAverage {
    fn default() -> Self {
        Self::new(DEFAULT_STRENGTH, DEFAULT_DEVIATION_STRENGTH)
    }
}

impl AdaptiveExponentialMovingAverage {
    #[must_use]
    pub fn new(strength: f32, deviation_strength: f32) -> Self {
        Self {
            strength: strength.max(0.0),
            deviation_strength: deviation_strength.clamp(0.0, 1.0),
            value: 0.0,
            deviation: 0.0,
        }
    }

    /// Smoothed absolute deviation
    #[must_use]
    pub fn deviation(&self) -> f32 {
        self.deviation
    }
}

impl SignalFilter for AdaptiveExponentialMovingAverage {
    fn update(&mut self, sample: f32) -> f32 {
        let delta = sample - self.value;
        self.deviation =
            self.deviation * (1.0 - self.deviation_strength) + delta.abs() * self.deviation_strength;

        let alpha = if self.deviation > 0.0 {
            (self.strength * delta.abs() / self.deviation).min(1.0)
        } else {
            // No deviation means delta is zero as well
            0.0
        };

        self.value += delta * alpha;
        self.value
    }

    fn value(&self) -> f32 {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_sample_is_followed_fully() {
        // deviation = 0.02 * |d|, alpha = 0.03 / 0.02 > 1, clamped to 1
        let mut filter = AdaptiveExponentialMovingAverage::default();
        assert_eq!(filter.update(0.6), 0.6);
    }

    #[test]
    fn test_constant_input_is_stable() {
        let mut filter = AdaptiveExponentialMovingAverage::default();
        for _ in 0..100 {
            filter.update(0.4);
        }
        assert!((filter.value() - 0.4).abs() < 1e-6);
        assert!(!filter.value().is_nan());
    }

    #[test]
    fn test_zero_input_never_produces_nan() {
        let mut filter = AdaptiveExponentialMovingAverage::default();
        for _ in 0..10 {
            assert_eq!(filter.update(0.0), 0.0);
        }
    }

    #[test]
    fn test_small_noise_is_suppressed_more_than_large_step() {
        let mut filter = AdaptiveExponentialMovingAverage::default();
        filter.update(0.5);
        for i in 0..200 {
            let noise = if i % 2 == 0 { 0.01 } else { -0.01 };
            filter.update(0.5 + noise);
        }
        let settled = filter.value();
        assert!((settled - 0.5).abs() < 0.01);

        // A jump far above the noise level moves the output by a large share
        let after_step = filter.update(0.9);
        assert!(after_step - settled > 0.2, "step followed too slowly: {}", after_step);
    }
}
