//! # Control Mapper Module
//!
//! Turns orientation, switches and levers into a [`ControlReport`].
//!
//! ## Yaw rotation
//!
//! The yoke can be turned about its vertical axis. Calibrated pitch and roll
//! are blended into joystick pitch and roll with squared-trigonometric
//! weights of the yaw angle:
//!
//! ```text
//! joystick_pitch = pitch * cos²(yaw) + roll * sin²(yaw)
//! joystick_roll  = roll * cos²(yaw) + pitch * sin²(yaw)
//! ```
//!
//! Unlike a rotation matrix the weights always sum to one, so full
//! deflection along either physical axis reaches full output at any yaw.
//!
//! ## Ground mode
//!
//! With the brake switch on, the pitch axis is withheld and the deflection
//! drives the wheel brakes instead: pushing forward brakes both wheels,
//! rolling shifts braking towards one side.
//!
//! ## HAT modes
//!
//! | Mode | Hat field | Extra buttons |
//! |------|-----------|---------------|
//! | FreeView | position | none |
//! | QuickView | 0 | one of 8 quick-view bits |
//! | Trim | 0 | N/E/S/W map to 4 trim bits |

use tracing::debug;

use super::calibration::{CalibrationOutcome, CalibrationRange, CalibrationSession};
use super::report::{ControlReport, AXIS_MAX, QUICK_VIEW_BUTTON_BASE, TRIM_BUTTON_BASE};
use crate::config::ControlsConfig;
use crate::filter::{AdaptiveExponentialMovingAverage, ExponentialMovingAverage, SignalFilter};
use crate::fusion::OrientationSnapshot;
use crate::input::hat::{decode_hat, HatPosition};
use crate::input::switch::{SwitchBank, SwitchId};
use crate::input::PanelState;

/// Button/hat encoding policy of the current cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HatMode {
    FreeView,
    QuickView,
    Trim,
}

impl HatMode {
    /// Selects the mode from the two toggles; trim takes precedence
    #[must_use]
    pub fn select(trim_toggle: bool, view_toggle: bool) -> Self {
        if trim_toggle {
            HatMode::Trim
        } else if view_toggle {
            HatMode::QuickView
        } else {
            HatMode::FreeView
        }
    }

    /// Report hat value and extra button bits for `position`
    #[must_use]
    pub fn encode(self, position: HatPosition) -> (u8, u32) {
        match self {
            HatMode::FreeView => (position.as_u8(), 0),
            HatMode::QuickView => match position {
                HatPosition::Neutral => (0, 0),
                direction => (0, 1 << (QUICK_VIEW_BUTTON_BASE + direction.as_u8() - 1)),
            },
            HatMode::Trim => {
                let trim = match position {
                    HatPosition::North => Some(0),
                    HatPosition::East => Some(1),
                    HatPosition::South => Some(2),
                    HatPosition::West => Some(3),
                    _ => None,
                };
                (0, trim.map_or(0, |offset| 1 << (TRIM_BUTTON_BASE + offset)))
            }
        }
    }
}

/// Blends calibrated pitch/roll by yaw; returns joystick (pitch, roll)
///
/// # Examples
///
/// ```
/// use yoke_imu::control::mapper::rotate_by_yaw;
///
/// assert_eq!(rotate_by_yaw(0.3, -0.1, 0.0), (0.3, -0.1));
/// ```
#[must_use]
pub fn rotate_by_yaw(pitch: f32, roll: f32, yaw: f32) -> (f32, f32) {
    let sin2 = yaw.sin().powi(2);
    let cos2 = yaw.cos().powi(2);
    (pitch * cos2 + roll * sin2, roll * cos2 + pitch * sin2)
}

/// Brake channels from normalised pitch and roll; returns (left, right) in 0.0..=1.0
#[must_use]
pub fn brakes(pitch: f32, roll: f32) -> (f32, f32) {
    let forward = -pitch;
    let left = (forward - roll).clamp(0.0, 1.0);
    let right = (forward + roll).clamp(0.0, 1.0);
    (left, right)
}

fn signed_axis(normalised: f32) -> i16 {
    (normalised.clamp(-1.0, 1.0) * f32::from(AXIS_MAX)) as i16
}

fn unsigned_axis(normalised: f32) -> i16 {
    (normalised.clamp(0.0, 1.0) * f32::from(AXIS_MAX)) as i16
}

/// Stateful mapping from inputs to reports
#[derive(Debug, Clone)]
pub struct ControlMapper {
    full_scale: f32,
    gain_min: f32,
    gain_max: f32,
    deadzone: f32,
    gain_filter: ExponentialMovingAverage,
    gain_primed: bool,
    throttle_filter: AdaptiveExponentialMovingAverage,
    propeller_filter: AdaptiveExponentialMovingAverage,
    mixture_filter: AdaptiveExponentialMovingAverage,
    throttle_range: CalibrationRange,
    session: CalibrationSession,
}

impl ControlMapper {
    #[must_use]
    pub fn new(config: &ControlsConfig, throttle_range: CalibrationRange) -> Self {
        Self {
            full_scale: config.full_scale_rad,
            gain_min: config.gain_min,
            gain_max: config.gain_max,
            deadzone: config.throttle_deadzone,
            gain_filter: ExponentialMovingAverage::new(config.gain_smoothing),
            gain_primed: false,
            throttle_filter: AdaptiveExponentialMovingAverage::default(),
            propeller_filter: AdaptiveExponentialMovingAverage::default(),
            mixture_filter: AdaptiveExponentialMovingAverage::default(),
            throttle_range,
            session: CalibrationSession::new(),
        }
    }

    #[must_use]
    pub fn throttle_range(&self) -> CalibrationRange {
        self.throttle_range
    }

    #[must_use]
    pub fn is_calibrating(&self) -> bool {
        self.session.is_active()
    }

    /// Starts a throttle calibration session at the current filtered value
    pub fn start_calibration(&mut self) {
        self.session.start(self.throttle_filter.value());
    }

    /// Ends the session, applying the recorded range if it is wide enough
    pub fn stop_calibration(&mut self) -> Option<CalibrationOutcome> {
        let outcome = self.session.stop()?;
        if let CalibrationOutcome::Applied(range) = outcome {
            self.throttle_range = range;
        }
        Some(outcome)
    }

    /// Current gain factor applied to the rotational axes
    #[must_use]
    pub fn gain(&self) -> f32 {
        self.gain_min + self.gain_filter.value().clamp(0.0, 1.0) * (self.gain_max - self.gain_min)
    }

    fn update_gain(&mut self, knob: f32) -> f32 {
        if self.gain_primed {
            self.gain_filter.update(knob);
        } else {
            self.gain_filter.reset(knob);
            self.gain_primed = true;
        }
        self.gain()
    }

    /// Builds the report of one cycle
    pub fn map(&mut self, orientation: &OrientationSnapshot, panel: &PanelState, switches: &SwitchBank) -> ControlReport {
        let gain = self.update_gain(panel.gain);
        let scale = gain / self.full_scale;

        let (pitch, roll) = rotate_by_yaw(orientation.pitch, orientation.roll, orientation.yaw);
        let pitch = (pitch * scale).clamp(-1.0, 1.0);
        let roll = (roll * scale).clamp(-1.0, 1.0);
        let yaw = (orientation.yaw * scale).clamp(-1.0, 1.0);

        let throttle = self.throttle_filter.update(panel.throttle);
        self.session.observe(throttle);
        let propeller = self.propeller_filter.update(panel.propeller);
        let mixture = self.mixture_filter.update(panel.mixture);

        let ground = switches.is_closed(SwitchId::Brake);
        let (y, left_brake, right_brake) = if ground {
            let (left, right) = brakes(pitch, roll);
            (0, left, right)
        } else {
            (signed_axis(pitch), 0.0, 0.0)
        };

        let mode = HatMode::select(
            switches.is_closed(SwitchId::HatModeToggle),
            switches.is_closed(SwitchId::ViewModeToggle),
        );
        let (hat, hat_buttons) = mode.encode(decode_hat(panel.hat_lines));

        let report = ControlReport {
            x: signed_axis(roll),
            y,
            z: unsigned_axis(self.throttle_range.scale(throttle, self.deadzone)),
            rz: signed_axis(yaw),
            rx: unsigned_axis(left_brake),
            ry: unsigned_axis(right_brake),
            slider: unsigned_axis(propeller),
            dial: unsigned_axis(mixture),
            hat,
            buttons: switches.button_bits() | hat_buttons,
        };
        if ground && (left_brake > 0.0 || right_brake > 0.0) {
            debug!("Brakes: left={:.2} right={:.2}", left_brake, right_brake);
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;
    use std::time::Duration;

    const WINDOW: Duration = Duration::from_millis(10);
    const ALL_SWITCH_BITS: u32 = 0x07FF;

    fn mapper() -> ControlMapper {
        ControlMapper::new(&ControlsConfig::default(), CalibrationRange::default())
    }

    fn orientation(pitch: f32, roll: f32, yaw: f32) -> OrientationSnapshot {
        OrientationSnapshot {
            pitch,
            roll,
            yaw,
            ..Default::default()
        }
    }

    /// Switch bank with the given switches debounced closed
    fn switches(closed: &[SwitchId]) -> SwitchBank {
        let mut bank = SwitchBank::new(WINDOW);
        let mut panel = PanelState::default();
        for &id in closed {
            panel.set_switch(id, true);
        }
        for t in 0..20 {
            bank.update(&panel, Duration::from_millis(t));
        }
        bank
    }

    #[test]
    fn test_rotation_identity_at_zero_yaw() {
        assert_eq!(rotate_by_yaw(0.25, -0.4, 0.0), (0.25, -0.4));
    }

    #[test]
    fn test_rotation_swaps_axes_at_quarter_turn() {
        let (pitch, roll) = rotate_by_yaw(0.25, -0.4, FRAC_PI_2);
        assert!((pitch + 0.4).abs() < 1e-6);
        assert!((roll - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_rotation_keeps_full_deflection() {
        for yaw in [0.3f32, 0.7, 1.1, -0.9] {
            let (pitch, roll) = rotate_by_yaw(1.0, 1.0, yaw);
            assert!((pitch - 1.0).abs() < 1e-6);
            assert!((roll - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn test_brakes() {
        assert_eq!(brakes(0.0, 0.0), (0.0, 0.0));
        // Pulling back never brakes
        assert_eq!(brakes(0.5, 0.0), (0.0, 0.0));
        assert_eq!(brakes(-0.5, 0.0), (0.5, 0.5));
        let (left, right) = brakes(-0.5, 0.25);
        assert!((left - 0.25).abs() < 1e-6);
        assert!((right - 0.75).abs() < 1e-6);
        assert_eq!(brakes(-1.0, 1.0), (0.0, 1.0));
    }

    #[test]
    fn test_hat_mode_selection() {
        assert_eq!(HatMode::select(false, false), HatMode::FreeView);
        assert_eq!(HatMode::select(false, true), HatMode::QuickView);
        assert_eq!(HatMode::select(true, false), HatMode::Trim);
        assert_eq!(HatMode::select(true, true), HatMode::Trim);
    }

    #[test]
    fn test_hat_mode_encoding() {
        assert_eq!(HatMode::FreeView.encode(HatPosition::SouthWest), (6, 0));
        assert_eq!(HatMode::QuickView.encode(HatPosition::North), (0, 1 << 16));
        assert_eq!(HatMode::QuickView.encode(HatPosition::NorthWest), (0, 1 << 23));
        assert_eq!(HatMode::QuickView.encode(HatPosition::Neutral), (0, 0));
        assert_eq!(HatMode::Trim.encode(HatPosition::North), (0, 1 << 12));
        assert_eq!(HatMode::Trim.encode(HatPosition::West), (0, 1 << 15));
        assert_eq!(HatMode::Trim.encode(HatPosition::NorthEast), (0, 0));
    }

    #[test]
    fn test_axes_scale_with_gain_and_full_scale() {
        let mut mapper = mapper();
        let panel = PanelState::default();
        let report = mapper.map(&orientation(0.45, -0.9, 0.0), &panel, &switches(&[]));

        // Gain knob centred: gain 1.0
        assert!((mapper.gain() - 1.0).abs() < 1e-6);
        assert_eq!(report.y, 16383);
        assert_eq!(report.x, -32767);
        assert_eq!(report.rz, 0);
        assert_eq!(report.hat, 0);
        assert_eq!(report.buttons, ALL_SWITCH_BITS);
    }

    #[test]
    fn test_pitch_saturates_at_zero_yaw() {
        let mut mapper = mapper();
        let report = mapper.map(&orientation(2.0, -2.0, 0.0), &PanelState::default(), &switches(&[]));
        assert_eq!(report.y, 32767);
        assert_eq!(report.x, -32767);
        assert_eq!(report.rz, 0);
    }

    #[test]
    fn test_yaw_saturates_and_blends_pitch() {
        let mut mapper = mapper();
        let report = mapper.map(&orientation(2.0, 0.0, -2.0), &PanelState::default(), &switches(&[]));
        assert_eq!(report.rz, -32767);

        // Large yaw moves most of the pitch deflection onto the roll axis
        let cos2 = (-2.0f32).cos().powi(2);
        let expected_y = (2.0 * cos2 / 0.9).min(1.0) * 32767.0;
        assert!((f32::from(report.y) - expected_y).abs() <= 1.0, "y = {}", report.y);
        assert!(report.y < 32767);
        assert_eq!(report.x, 32767);
    }

    #[test]
    fn test_gain_knob_is_smoothed() {
        let mut mapper = mapper();
        let mut panel = PanelState::default();
        let bank = switches(&[]);
        mapper.map(&orientation(0.0, 0.0, 0.0), &panel, &bank);

        panel.gain = 1.0;
        mapper.map(&orientation(0.0, 0.0, 0.0), &panel, &bank);
        let gain = mapper.gain();
        assert!(gain > 1.0 && gain < 1.5);

        for _ in 0..200 {
            mapper.map(&orientation(0.0, 0.0, 0.0), &panel, &bank);
        }
        assert!((mapper.gain() - 1.5).abs() < 1e-3);
    }

    #[test]
    fn test_ground_mode_withholds_pitch_and_brakes() {
        let mut mapper = mapper();
        let report = mapper.map(&orientation(-0.45, 0.0, 0.0), &PanelState::default(), &switches(&[SwitchId::Brake]));

        assert_eq!(report.y, 0);
        assert_eq!(report.rx, 16383);
        assert_eq!(report.ry, 16383);
        // Brake toggle is not a report button
        assert_eq!(report.buttons, ALL_SWITCH_BITS);
    }

    #[test]
    fn test_pressed_button_clears_bit() {
        let mut mapper = mapper();
        let report = mapper.map(&orientation(0.0, 0.0, 0.0), &PanelState::default(), &switches(&[SwitchId::RedButton]));
        assert!(!report.button(4));
        assert!(report.button(0));
    }

    #[test]
    fn test_trim_mode_report() {
        let mut mapper = mapper();
        let panel = PanelState {
            hat_lines: 0b1011,
            ..Default::default()
        };
        let report = mapper.map(&orientation(0.0, 0.0, 0.0), &panel, &switches(&[SwitchId::HatModeToggle]));

        assert_eq!(report.hat, 0);
        assert!(report.button(14));
        assert_eq!(report.buttons, ALL_SWITCH_BITS | (1 << 14));
    }

    #[test]
    fn test_free_view_passes_hat() {
        let mut mapper = mapper();
        let panel = PanelState {
            hat_lines: 0b1100,
            ..Default::default()
        };
        let report = mapper.map(&orientation(0.0, 0.0, 0.0), &panel, &switches(&[]));
        assert_eq!(report.hat, 2);
    }

    #[test]
    fn test_throttle_uses_calibrated_range() {
        let mut mapper = ControlMapper::new(&ControlsConfig::default(), CalibrationRange::new(0.2, 0.8));
        let bank = switches(&[]);
        let mut panel = PanelState::default();

        panel.throttle = 0.8;
        let report = mapper.map(&orientation(0.0, 0.0, 0.0), &panel, &bank);
        assert_eq!(report.z, 32767);

        panel.throttle = 0.1;
        let mut report = ControlReport::default();
        for _ in 0..500 {
            report = mapper.map(&orientation(0.0, 0.0, 0.0), &panel, &bank);
        }
        assert_eq!(report.z, 0);
    }

    #[test]
    fn test_levers_pass_through_filters() {
        let mut mapper = mapper();
        let panel = PanelState {
            propeller: 1.0,
            mixture: 0.5,
            ..Default::default()
        };
        let report = mapper.map(&orientation(0.0, 0.0, 0.0), &panel, &switches(&[]));

        // First sample is followed completely
        assert_eq!(report.slider, 32767);
        assert_eq!(report.dial, 16383);
    }

    #[test]
    fn test_calibration_session_updates_range() {
        let mut mapper = mapper();
        let bank = switches(&[]);
        let mut panel = PanelState {
            throttle: 0.5,
            ..Default::default()
        };
        mapper.map(&orientation(0.0, 0.0, 0.0), &panel, &bank);

        mapper.start_calibration();
        assert!(mapper.is_calibrating());
        for target in [0.3, 0.7] {
            panel.throttle = target;
            for _ in 0..300 {
                mapper.map(&orientation(0.0, 0.0, 0.0), &panel, &bank);
            }
        }

        let outcome = mapper.stop_calibration();
        assert!(matches!(outcome, Some(CalibrationOutcome::Applied(_))));
        let range = mapper.throttle_range();
        assert!((range.min() - 0.3).abs() < 0.01);
        assert!((range.max() - 0.7).abs() < 0.01);
        assert!(!mapper.is_calibrating());
    }

    #[test]
    fn test_calibration_without_motion_keeps_range() {
        let mut mapper = mapper();
        mapper.start_calibration();
        mapper.map(&orientation(0.0, 0.0, 0.0), &PanelState::default(), &switches(&[]));

        assert!(matches!(
            mapper.stop_calibration(),
            Some(CalibrationOutcome::Rejected { .. })
        ));
        assert_eq!(mapper.throttle_range(), CalibrationRange::default());
        assert_eq!(mapper.stop_calibration(), None);
    }
}
