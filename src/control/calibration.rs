//! # Calibration Module
//!
//! Calibrated input ranges of analog levers and the session that records them.
//!
//! ## Range scaling
//!
//! A lever's [`CalibrationRange`] holds the raw values measured at its two
//! end stops. Scaling maps the range to 0.0..=1.0 with a small dead zone at
//! each end, so the lever reliably reaches 0 and 1 even when the end stops
//! drift slightly between sessions:
//!
//! `output = (input - (min + dz * span)) / (span * (1 - 2 * dz))`, clamped.
//!
//! ## Sessions
//!
//! [`CalibrationSession::start`] collapses a candidate range to the current
//! lever value; every observed value widens it. [`CalibrationSession::stop`]
//! returns the candidate only if it covers at least [`MIN_CALIBRATED_SPAN`],
//! so an accidental start/stop without moving the lever keeps the old range.
//!
//! ## Usage
//!
//! ```
//! use yoke_imu::control::calibration::CalibrationRange;
//!
//! let range = CalibrationRange::new(0.1, 0.9);
//! assert_eq!(range.scale(0.1, 0.0), 0.0);
//! assert!((range.scale(0.5, 0.0) - 0.5).abs() < 1e-6);
//! assert_eq!(range.scale(0.95, 0.02), 1.0);
//! ```

use tracing::{info, warn};

use crate::error::Result;
use crate::storage::Storage;

/// Smallest span accepted at the end of a calibration session
pub const MIN_CALIBRATED_SPAN: f32 = 0.05;

/// Raw end-stop values of one analog lever
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CalibrationRange {
    min: f32,
    max: f32,
}

impl Default for CalibrationRange {
    fn default() -> Self {
        Self { min: 0.0, max: 1.0 }
    }
}

impl CalibrationRange {
    /// Creates a range; the bounds are swapped if given in reverse order
    #[must_use]
    pub fn new(min: f32, max: f32) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    /// Range collapsed to a single value
    #[must_use]
    pub fn collapsed(value: f32) -> Self {
        Self { min: value, max: value }
    }

    #[must_use]
    pub fn min(&self) -> f32 {
        self.min
    }

    #[must_use]
    pub fn max(&self) -> f32 {
        self.max
    }

    #[must_use]
    pub fn span(&self) -> f32 {
        self.max - self.min
    }

    /// Widens the range to include `value`
    pub fn extend(&mut self, value: f32) {
        if value < self.min {
            self.min = value;
        }
        if value > self.max {
            self.max = value;
        }
    }

    /// Maps `value` to 0.0..=1.0
    ///
    /// # Arguments
    ///
    /// * `value` - Raw lever value
    /// * `deadzone` - Fraction of the span ignored at each end (0.0 to 0.25)
    #[must_use]
    pub fn scale(&self, value: f32, deadzone: f32) -> f32 {
        let deadzone = deadzone.clamp(0.0, 0.25);
        let span = self.span();
        let low = self.min + deadzone * span;
        let usable = span * (1.0 - 2.0 * deadzone);

        if usable <= f32::EPSILON {
            return if value > low { 1.0 } else { 0.0 };
        }
        ((value - low) / usable).clamp(0.0, 1.0)
    }

    /// Restores a range from storage, clamping both ends to 0.0..=1.0
    pub fn restore<S: Storage + ?Sized>(storage: &mut S, min_key: &str, max_key: &str) -> Self {
        let min = storage.restore(min_key, 0.0, 0.0, 1.0);
        let max = storage.restore(max_key, 1.0, 0.0, 1.0);
        Self::new(min, max)
    }

    /// Writes both ends to storage
    ///
    /// # Errors
    ///
    /// Returns the first storage error
    pub fn persist<S: Storage + ?Sized>(&self, storage: &mut S, min_key: &str, max_key: &str) -> Result<()> {
        storage.store(min_key, self.min)?;
        storage.store(max_key, self.max)
    }
}

/// Result of ending a calibration session
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationOutcome {
    /// The recorded range replaces the active one
    Applied(CalibrationRange),
    /// The recorded span was too small; the active range is kept
    Rejected { span: f32 },
}

/// Recording state of a calibration session
#[derive(Debug, Clone, Default)]
pub struct CalibrationSession {
    candidate: Option<CalibrationRange>,
}

impl CalibrationSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.candidate.is_some()
    }

    /// Starts recording at the lever's current value; restarts a running session
    pub fn start(&mut self, current: f32) {
        info!("Calibration started at {:.3}", current);
        self.candidate = Some(CalibrationRange::collapsed(current));
    }

    /// Widens the recorded range while a session is active
    pub fn observe(&mut self, value: f32) {
        if let Some(range) = self.candidate.as_mut() {
            range.extend(value);
        }
    }

    /// Range recorded so far
    #[must_use]
    pub fn candidate(&self) -> Option<CalibrationRange> {
        self.candidate
    }

    /// Ends the session; `None` if no session was active
    pub fn stop(&mut self) -> Option<CalibrationOutcome> {
        let range = self.candidate.take()?;
        if range.span() >= MIN_CALIBRATED_SPAN {
            info!("Calibration finished: {:.3}..{:.3}", range.min(), range.max());
            Some(CalibrationOutcome::Applied(range))
        } else {
            warn!(
                "Calibration span {:.3} below {:.3}, keeping previous range",
                range.span(),
                MIN_CALIBRATED_SPAN
            );
            Some(CalibrationOutcome::Rejected { span: range.span() })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MemoryStore, MockStorage, KEY_THROTTLE_MAX, KEY_THROTTLE_MIN};

    #[test]
    fn test_new_orders_bounds() {
        let range = CalibrationRange::new(0.8, 0.2);
        assert_eq!(range.min(), 0.2);
        assert_eq!(range.max(), 0.8);
    }

    #[test]
    fn test_scale_without_deadzone() {
        let range = CalibrationRange::new(0.2, 0.6);
        assert_eq!(range.scale(0.2, 0.0), 0.0);
        assert!((range.scale(0.4, 0.0) - 0.5).abs() < 1e-6);
        assert_eq!(range.scale(0.6, 0.0), 1.0);
        assert_eq!(range.scale(0.0, 0.0), 0.0);
        assert_eq!(range.scale(1.0, 0.0), 1.0);
    }

    #[test]
    fn test_scale_deadzone_saturates_ends() {
        let range = CalibrationRange::new(0.0, 1.0);
        assert_eq!(range.scale(0.01, 0.02), 0.0);
        assert_eq!(range.scale(0.99, 0.02), 1.0);
        assert!((range.scale(0.5, 0.02) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_scale_collapsed_range_is_step() {
        let range = CalibrationRange::collapsed(0.5);
        assert_eq!(range.scale(0.4, 0.02), 0.0);
        assert_eq!(range.scale(0.6, 0.02), 1.0);
    }

    #[test]
    fn test_session_records_extent() {
        let mut session = CalibrationSession::new();
        assert!(!session.is_active());
        session.observe(0.9);
        assert_eq!(session.candidate(), None);

        session.start(0.5);
        for value in [0.4, 0.12, 0.7, 0.93, 0.6] {
            session.observe(value);
        }

        assert_eq!(
            session.stop(),
            Some(CalibrationOutcome::Applied(CalibrationRange::new(0.12, 0.93)))
        );
        assert!(!session.is_active());
        assert_eq!(session.stop(), None);
    }

    #[test]
    fn test_session_rejects_small_span() {
        let mut session = CalibrationSession::new();
        session.start(0.5);
        session.observe(0.52);

        match session.stop() {
            Some(CalibrationOutcome::Rejected { span }) => assert!((span - 0.02).abs() < 1e-6),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_restore_and_persist() {
        let mut store = MemoryStore::new();
        store.store(KEY_THROTTLE_MIN, -0.5).unwrap();

        let range = CalibrationRange::restore(&mut store, KEY_THROTTLE_MIN, KEY_THROTTLE_MAX);
        assert_eq!(range, CalibrationRange::new(0.0, 1.0));

        CalibrationRange::new(0.1, 0.8)
            .persist(&mut store, KEY_THROTTLE_MIN, KEY_THROTTLE_MAX)
            .unwrap();
        assert_eq!(store.get(KEY_THROTTLE_MIN), Some(0.1));
        assert_eq!(store.get(KEY_THROTTLE_MAX), Some(0.8));
    }

    #[test]
    fn test_persist_stops_at_first_error() {
        let mut storage = MockStorage::new();
        storage
            .expect_store()
            .times(1)
            .returning(|_, _| Err(crate::error::YokeError::Storage("disk full".to_string())));

        let result = CalibrationRange::default().persist(&mut storage, KEY_THROTTLE_MIN, KEY_THROTTLE_MAX);
        assert!(result.is_err());
    }
}
